//! Bot API wire types.
//!
//! Only the fields the bot reads or writes are modelled; everything else in
//! the payloads is ignored on deserialization.

use serde::{Deserialize, Serialize};

/// Envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Payload on success.
    pub result: Option<T>,
    /// Human-readable error on failure.
    pub description: Option<String>,
    /// Error code on failure.
    pub error_code: Option<i64>,
    /// Extra hints on failure.
    pub parameters: Option<ResponseParameters>,
}

/// Failure hints.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before retrying after flood control.
    pub retry_after: Option<u64>,
}

/// One inbound update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id.
    pub update_id: i64,
    /// New message.
    pub message: Option<Message>,
    /// Inline button press.
    pub callback_query: Option<CallbackQuery>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Message id within the chat.
    pub message_id: i64,
    /// Sender; absent for channel posts.
    pub from: Option<User>,
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Text body.
    pub text: Option<String>,
}

/// A user or bot.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// User id.
    pub id: i64,
    /// Whether this is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: Option<String>,
    /// Username without `@`.
    pub username: Option<String>,
}

impl User {
    /// First and last name joined by a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name),
            _ => self.first_name.clone(),
        }
    }
}

/// Chat kind as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// One-to-one chat with the bot.
    Private,
    /// Basic group.
    Group,
    /// Supergroup.
    Supergroup,
    /// Channel.
    Channel,
    /// Anything newer.
    #[serde(other)]
    Other,
}

/// A chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat id.
    pub id: i64,
    /// Chat kind.
    #[serde(rename = "type")]
    pub kind: ChatKind,
}

/// Inline button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Query id to answer.
    pub id: String,
    /// Who pressed.
    pub from: User,
    /// Message carrying the button.
    pub message: Option<Message>,
    /// Button payload.
    pub data: Option<String>,
}

/// `getUpdates` parameters.
#[derive(Debug, Clone, Serialize)]
pub struct GetUpdates {
    /// First update to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Long-poll timeout in seconds.
    pub timeout: u64,
    /// Update kinds to receive.
    pub allowed_updates: &'static [&'static str],
}

/// `sendMessage` parameters.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessage<'a> {
    /// Target chat.
    pub chat_id: i64,
    /// Body.
    pub text: &'a str,
    /// `HTML` when the body carries markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    /// Inline keyboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Inline keyboard attached to a message.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    /// Button rows.
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// One inline button.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    /// Label.
    pub text: String,
    /// Payload.
    pub callback_data: String,
}

/// `answerCallbackQuery` parameters.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerCallbackQuery<'a> {
    /// Query being answered.
    pub callback_query_id: &'a str,
    /// Notification text; omitted for a silent answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    /// Show as a modal alert rather than a toast.
    pub show_alert: bool,
}
