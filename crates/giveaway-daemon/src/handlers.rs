//! Update handlers.
//!
//! Turns inbound updates into contest operations and replies. Replies go
//! through [`ChatSurface`] so the handlers run unchanged against a fake in
//! tests.

use async_trait::async_trait;
use giveaway_core::{ChatId, NotifyError, UserId};
use tracing::{debug, error, info, warn};

use crate::commands::{CallbackAction, Command};
use crate::dialogue::{DialogueError, DialogueKey, DialogueState, Transition};
use crate::render::{self, OutgoingMessage};
use crate::state::SharedState;
use crate::telegram::types::{CallbackQuery, ChatKind, Message, Update};

/// Outbound side used by the handlers.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Sends `message` to `chat`.
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> Result<(), NotifyError>;

    /// Answers a button press, optionally with an alert text.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), NotifyError>;
}

/// Dispatch one update to the appropriate handler.
pub async fn dispatch(update: Update, state: &SharedState, surface: &dyn ChatSurface) {
    if let Some(message) = update.message {
        handle_message(message, state, surface).await;
    } else if let Some(query) = update.callback_query {
        handle_callback(query, state, surface).await;
    } else {
        debug!(update_id = update.update_id, "ignoring update without payload");
    }
}

/// Contest scope for a chat: groups scope their contests, private chats
/// see and create unscoped ones.
const fn chat_scope(kind: ChatKind, chat: ChatId) -> Option<ChatId> {
    match kind {
        ChatKind::Private => None,
        _ => Some(chat),
    }
}

async fn handle_message(message: Message, state: &SharedState, surface: &dyn ChatSurface) {
    let (Some(from), Some(text)) = (message.from, message.text) else {
        return;
    };
    if from.is_bot {
        return;
    }

    let chat = ChatId(message.chat.id);
    let key = DialogueKey {
        chat,
        user: UserId(from.id),
    };
    let scope = chat_scope(message.chat.kind, chat);

    if let Some(command) = Command::parse(&text, state.bot_username()) {
        handle_command(command, key, scope, state, surface).await;
        return;
    }

    handle_dialogue_input(key, scope, &text, state, surface).await;
}

async fn handle_command(
    command: Command,
    key: DialogueKey,
    scope: Option<ChatId>,
    state: &SharedState,
    surface: &dyn ChatSurface,
) {
    let is_admin = state.config().bot.is_admin(key.user);
    let replies = match command {
        Command::Start => vec![OutgoingMessage::plain(render::GREETING)],
        Command::Create if !is_admin => {
            info!(user_id = %key.user, "rejected /create from non-admin");
            vec![OutgoingMessage::plain(render::ADMIN_ONLY)]
        },
        Command::Create => {
            state.dialogues().begin(key).await;
            vec![OutgoingMessage::plain(render::ASK_TITLE)]
        },
        Command::Cancel => {
            let text = if state.dialogues().cancel(key).await {
                render::CANCELLED
            } else {
                render::NOTHING_TO_CANCEL
            };
            vec![OutgoingMessage::plain(text)]
        },
        Command::List => render::active_list(&state.service().list_active_contests(scope).await),
        Command::Debug if !is_admin => {
            debug!(user_id = %key.user, "ignoring /debug from non-admin");
            return;
        },
        Command::Debug => {
            let snapshot = state.service().debug_snapshot().await;
            render::debug_report(&snapshot, state.uptime_secs())
        },
    };
    // Pages go out in order; a failed page does not stop the rest.
    for reply in replies {
        reply_to(surface, key.chat, reply).await;
    }
}

async fn handle_dialogue_input(
    key: DialogueKey,
    scope: Option<ChatId>,
    text: &str,
    state: &SharedState,
    surface: &dyn ChatSurface,
) {
    let Some(result) = state.dialogues().submit(key, text).await else {
        return;
    };

    let reply = match result {
        Ok(Transition::Next(DialogueState::AwaitingTitle)) => {
            OutgoingMessage::plain(render::ASK_TITLE)
        },
        Ok(Transition::Next(DialogueState::AwaitingDescription { .. })) => {
            OutgoingMessage::plain(render::ASK_DESCRIPTION)
        },
        Ok(Transition::Next(DialogueState::AwaitingDuration { .. })) => {
            OutgoingMessage::plain(render::ASK_DURATION)
        },
        Ok(Transition::Complete(draft)) => {
            match state
                .service()
                .create_contest(
                    draft.title,
                    draft.description,
                    draft.duration_minutes,
                    scope,
                )
                .await
            {
                // The finalize task runs detached.
                Ok(created) => render::announcement(&created.contest, draft.duration_minutes),
                Err(e) => {
                    error!(error = %e, "failed to create contest");
                    OutgoingMessage::plain(render::CREATE_FAILED)
                },
            }
        },
        Err(DialogueError::InvalidDuration { input }) => {
            debug!(user_id = %key.user, input = %input, "rejected contest duration");
            OutgoingMessage::plain(render::INVALID_DURATION)
        },
    };
    reply_to(surface, key.chat, reply).await;
}

async fn handle_callback(query: CallbackQuery, state: &SharedState, surface: &dyn ChatSurface) {
    let action = query.data.as_deref().and_then(CallbackAction::parse);
    let text = match action {
        Some(CallbackAction::Join { contest_id }) => {
            let outcome = state
                .service()
                .join_contest(&contest_id, UserId(query.from.id), query.from.full_name())
                .await;
            Some(render::join_ack(outcome))
        },
        None => {
            debug!(data = ?query.data, "ignoring unknown callback payload");
            None
        },
    };

    if let Err(e) = surface.answer_callback(&query.id, text).await {
        warn!(error = %e, "failed to answer callback query");
    }
}

async fn reply_to(surface: &dyn ChatSurface, chat: ChatId, message: OutgoingMessage) {
    if let Err(e) = surface.send(chat, message).await {
        warn!(chat_id = %chat, error = %e, "failed to send reply");
    }
}
