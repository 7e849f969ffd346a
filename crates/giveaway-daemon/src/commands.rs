//! Bot commands and inline-button payloads.

/// Prefix shared by every button payload this bot emits.
const CALLBACK_PREFIX: &str = "contest";

/// A slash command addressed to this bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/start`: greeting.
    Start,
    /// `/create`: begin the creation dialogue (admins only).
    Create,
    /// `/cancel`: abort the creation dialogue.
    Cancel,
    /// `/list`: active contests visible in this chat.
    List,
    /// `/debug`: registry overview (admins only).
    Debug,
}

impl Command {
    /// Parses the leading `/command[@bot]` token of a message.
    ///
    /// Commands mentioning a different bot return `None`. Without a known
    /// `bot_username` any mention is accepted.
    #[must_use]
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let token = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = match token.split_once('@') {
            Some((name, mention)) => {
                if bot_username.is_some_and(|me| !me.eq_ignore_ascii_case(mention)) {
                    return None;
                }
                name
            },
            None => token,
        };

        match name {
            "start" => Some(Self::Start),
            "create" => Some(Self::Create),
            "cancel" => Some(Self::Cancel),
            "list" => Some(Self::List),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

/// Action carried by an inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Join the named contest.
    Join {
        /// Contest id.
        contest_id: String,
    },
}

impl CallbackAction {
    /// Parses `contest:<action>:<contest_id>`.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, ':');
        if parts.next()? != CALLBACK_PREFIX {
            return None;
        }
        let action = parts.next()?;
        let contest_id = parts.next().filter(|id| !id.is_empty())?;
        match action {
            "join" => Some(Self::Join {
                contest_id: contest_id.to_owned(),
            }),
            _ => None,
        }
    }

    /// Button payload for this action.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Join { contest_id } => format!("{CALLBACK_PREFIX}:join:{contest_id}"),
        }
    }
}
