//! Outbound notification seam and the announcement texts sent through it.

use async_trait::async_trait;
use thiserror::Error;

use crate::contest::{ChatId, Participant};

/// Errors reported by a [`Notifier`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotifyError {
    /// The platform refused delivery to this recipient (blocked bot, unknown
    /// chat, never started a conversation).
    #[error("recipient {recipient} is unreachable: {reason}")]
    Unreachable {
        /// The recipient that could not be reached.
        recipient: ChatId,
        /// Platform-provided description.
        reason: String,
    },

    /// Network or protocol failure unrelated to the recipient.
    #[error("notification transport failed: {0}")]
    Transport(String),
}

/// Fire-and-forget message delivery to a chat.
///
/// Implementations report failures; callers in the lifecycle engine log and
/// drop them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `text` as a plain message to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the message could not be delivered.
    async fn notify(&self, recipient: ChatId, text: &str) -> Result<(), NotifyError>;
}

/// Announcement texts.
pub mod text {
    use super::Participant;

    /// Outcome summary sent to the contest's chat and the operator.
    #[must_use]
    pub fn winner_summary(title: &str, winner: &Participant, total: usize) -> String {
        format!(
            "🎉 Contest '{title}' has ended!\n\n\
             Winner: {name} (ID: {id})\n\
             Total participants: {total}",
            name = winner.display_name,
            id = winner.user_id,
        )
    }

    /// Direct message to the winner.
    #[must_use]
    pub fn winner_congratulation(title: &str) -> String {
        format!("🎉 Congratulations! You won the contest '{title}'!")
    }

    /// Sent instead of [`winner_summary`] when nobody joined.
    #[must_use]
    pub fn no_participants(title: &str) -> String {
        format!("⚠️ Contest '{title}' has ended, but nobody took part.")
    }
}
