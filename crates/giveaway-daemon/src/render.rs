//! User-facing texts and message layout.

use giveaway_core::{Contest, DebugSnapshot, JoinOutcome};

use crate::commands::CallbackAction;

/// Greeting for `/start`.
pub const GREETING: &str = "Hi! I run giveaways.\n\
    If you are an administrator, use /create to start a new contest.\n\
    Use /list to see the contests that are open right now.";
/// `/create` by a non-admin.
pub const ADMIN_ONLY: &str = "This command is only available to the administrator.";
/// First dialogue prompt.
pub const ASK_TITLE: &str = "Let's create a new contest. Send the contest title:";
/// Second dialogue prompt.
pub const ASK_DESCRIPTION: &str = "Great! Now send the contest description:";
/// Third dialogue prompt.
pub const ASK_DURATION: &str = "Now send the contest duration in minutes (a whole number):";
/// Retry prompt for a bad duration.
pub const INVALID_DURATION: &str = "Please send a valid positive number of minutes.";
/// `/cancel` with a dialogue in progress.
pub const CANCELLED: &str = "Contest creation cancelled.";
/// `/cancel` without a dialogue.
pub const NOTHING_TO_CANCEL: &str = "There is nothing to cancel.";
/// `/list` with no visible contests.
pub const NO_ACTIVE_CONTESTS: &str = "There are no active contests right now.";
/// Contest creation failed inside the registry.
pub const CREATE_FAILED: &str = "Something went wrong while creating the contest. Please try again.";

/// Button label on the announcement.
const JOIN_LABEL: &str = "Join";

/// Budget for one message body, in characters. The Bot API rejects bodies
/// over 4096 UTF-16 units; emoji take two, hence the margin.
pub const MAX_MESSAGE_CHARS: usize = 3500;

/// Per-field caps, in characters of the rendered text.
const MAX_TITLE_CHARS: usize = 256;
const MAX_DESCRIPTION_CHARS: usize = 2500;
const MAX_LIST_DESCRIPTION_CHARS: usize = 400;

/// Display format for contest end times.
const ENDS_AT_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Label.
    pub text: String,
    /// Payload delivered back on press.
    pub callback_data: String,
}

/// A message ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingMessage {
    /// Message body.
    pub text: String,
    /// Body uses HTML markup.
    pub html: bool,
    /// Inline keyboard rows.
    pub keyboard: Vec<Vec<Button>>,
}

impl OutgoingMessage {
    /// Plain text without buttons.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Private acknowledgement for a join press.
#[must_use]
pub const fn join_ack(outcome: JoinOutcome) -> &'static str {
    match outcome {
        JoinOutcome::Joined => "You are registered for the contest!",
        JoinOutcome::AlreadyJoined => "You are already taking part in this contest!",
        JoinOutcome::Closed => "This contest has already ended or does not exist.",
    }
}

/// Escapes text for Bot API HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes `text` and cuts it so the escaped form fits in `max_chars`,
/// marking a cut with `…`. Entities are never split.
#[must_use]
pub fn escape_html_clipped(text: &str, max_chars: usize) -> String {
    let full = escape_html(text);
    if full.chars().count() <= max_chars {
        return full;
    }

    let budget = max_chars.saturating_sub(1);
    let mut clipped = String::new();
    let mut used = 0;
    for c in text.chars() {
        let piece = escape_html(c.encode_utf8(&mut [0; 4]));
        let len = piece.chars().count();
        if used + len > budget {
            break;
        }
        used += len;
        clipped.push_str(&piece);
    }
    clipped.push('…');
    clipped
}

/// Cuts plain `text` to `max_chars`, marking a cut with `…`.
fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut clipped: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

/// Greedily packs `blocks` into pages of at most [`MAX_MESSAGE_CHARS`],
/// keeping each block whole. `header` opens the first page.
fn paginate<T>(header: &str, blocks: Vec<(String, T)>) -> Vec<(String, Vec<T>)> {
    let mut pages = Vec::new();
    let mut text = header.to_owned();
    let mut items = Vec::new();

    for (block, item) in blocks {
        let fits = text.chars().count() + block.chars().count() <= MAX_MESSAGE_CHARS;
        if !fits && !items.is_empty() {
            pages.push((std::mem::take(&mut text), std::mem::take(&mut items)));
        }
        text.push_str(&block);
        items.push(item);
    }
    if !items.is_empty() {
        pages.push((text, items));
    }
    pages
}

fn join_button(contest: &Contest, text: String) -> Button {
    Button {
        text,
        callback_data: CallbackAction::Join {
            contest_id: contest.id().to_owned(),
        }
        .encode(),
    }
}

/// Announcement posted when a contest is created.
#[must_use]
pub fn announcement(contest: &Contest, duration_minutes: u32) -> OutgoingMessage {
    OutgoingMessage {
        text: format!(
            "🎉 A new contest has started!\n\n\
             📌 <b>{title}</b>\n\n\
             {description}\n\n\
             ⏱ The contest ends in {duration_minutes} minutes ({ends_at}).",
            title = escape_html_clipped(contest.title(), MAX_TITLE_CHARS),
            description = escape_html_clipped(contest.description(), MAX_DESCRIPTION_CHARS),
            ends_at = contest.ends_at().format(ENDS_AT_FORMAT),
        ),
        html: true,
        keyboard: vec![vec![join_button(contest, JOIN_LABEL.to_string())]],
    }
}

/// `/list` output: one block and one join button per contest, split over
/// as many messages as the length budget requires.
#[must_use]
pub fn active_list(contests: &[Contest]) -> Vec<OutgoingMessage> {
    if contests.is_empty() {
        return vec![OutgoingMessage::plain(NO_ACTIVE_CONTESTS)];
    }

    let blocks = contests
        .iter()
        .map(|contest| {
            let block = format!(
                "📌 <b>{title}</b>\n\
                 {description}\n\
                 ⏱ Time left: {minutes} min. (until {ends_at})\n\
                 👥 Participants: {count}\n\n",
                title = escape_html_clipped(contest.title(), MAX_TITLE_CHARS),
                description =
                    escape_html_clipped(contest.description(), MAX_LIST_DESCRIPTION_CHARS),
                minutes = contest.remaining_minutes(),
                ends_at = contest.ends_at().format(ENDS_AT_FORMAT),
                count = contest.participant_count(),
            );
            let button = join_button(
                contest,
                format!("{JOIN_LABEL} '{}'", clip(contest.title(), 48)),
            );
            (block, button)
        })
        .collect();

    paginate("📋 Active contests:\n\n", blocks)
        .into_iter()
        .map(|(text, buttons)| OutgoingMessage {
            text,
            html: true,
            keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        })
        .collect()
}

/// `/debug` output, split over as many messages as the length budget
/// requires.
#[must_use]
pub fn debug_report(snapshot: &DebugSnapshot, uptime_secs: u64) -> Vec<OutgoingMessage> {
    let header = format!(
        "Total contests: {}\n\
         Active contests: {}\n\
         Pending timers: {}\n\
         Uptime: {uptime_secs}s\n\n",
        snapshot.total, snapshot.active, snapshot.pending_timers,
    );
    let blocks = snapshot
        .contests
        .iter()
        .map(|row| {
            let status = if row.accepting_entries {
                "active"
            } else {
                "inactive"
            };
            let block = format!(
                "Contest {}:\n\
                 - Title: {}\n\
                 - Status: {status}\n\
                 - Participants: {}\n\
                 - Remaining: {} min.\n\n",
                row.id,
                clip(&row.title, MAX_TITLE_CHARS),
                row.participants,
                row.remaining_minutes,
            );
            (block, ())
        })
        .collect();

    let pages = paginate(&header, blocks);
    if pages.is_empty() {
        return vec![OutgoingMessage::plain(header.trim_end())];
    }
    pages
        .into_iter()
        .map(|(text, _)| OutgoingMessage::plain(text.trim_end()))
        .collect()
}
