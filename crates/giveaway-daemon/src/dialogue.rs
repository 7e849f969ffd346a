//! Contest creation dialogue.
//!
//! A small state machine per (chat, user) pair:
//!
//! ```text
//! /create ──> AwaitingTitle ──text──> AwaitingDescription ──text──> AwaitingDuration
//!                                                                      │
//!                                       invalid duration: stay  <──────┤
//!                                                                      └─ positive int ──> ContestDraft
//! ```
//!
//! The dialogue only gathers input; creating the contest is the caller's job.

use std::collections::HashMap;

use giveaway_core::{ChatId, UserId};
use thiserror::Error;
use tokio::sync::Mutex;

/// Identifies one dialogue: a user in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialogueKey {
    /// Chat the dialogue runs in.
    pub chat: ChatId,
    /// User answering the prompts.
    pub user: UserId,
}

/// Input rejected by the dialogue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DialogueError {
    /// Duration is not a positive whole number of minutes.
    #[error("duration must be a positive whole number of minutes, got {input:?}")]
    InvalidDuration {
        /// The rejected text.
        input: String,
    },
}

/// Where a dialogue currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    /// Waiting for the title.
    AwaitingTitle,
    /// Title captured; waiting for the description.
    AwaitingDescription {
        /// Captured title.
        title: String,
    },
    /// Title and description captured; waiting for the duration.
    AwaitingDuration {
        /// Captured title.
        title: String,
        /// Captured description.
        description: String,
    },
}

/// Everything needed to create a contest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestDraft {
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Positive duration in minutes.
    pub duration_minutes: u32,
}

/// Result of feeding one message into a dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Dialogue continues in the given state.
    Next(DialogueState),
    /// All fields collected.
    Complete(ContestDraft),
}

impl DialogueState {
    /// Consumes one message of user input.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::InvalidDuration`] in `AwaitingDuration` when
    /// the text is not a positive integer.
    pub fn advance(&self, input: &str) -> Result<Transition, DialogueError> {
        match self {
            Self::AwaitingTitle => Ok(Transition::Next(Self::AwaitingDescription {
                title: input.to_owned(),
            })),
            Self::AwaitingDescription { title } => Ok(Transition::Next(Self::AwaitingDuration {
                title: title.clone(),
                description: input.to_owned(),
            })),
            Self::AwaitingDuration { title, description } => {
                let duration_minutes = parse_duration(input)?;
                Ok(Transition::Complete(ContestDraft {
                    title: title.clone(),
                    description: description.clone(),
                    duration_minutes,
                }))
            },
        }
    }
}

/// Parses a positive whole number of minutes.
///
/// # Errors
///
/// Returns [`DialogueError::InvalidDuration`] for zero, negative, non-numeric
/// or out-of-range input.
pub fn parse_duration(input: &str) -> Result<u32, DialogueError> {
    match input.trim().parse::<u32>() {
        Ok(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(DialogueError::InvalidDuration {
            input: input.to_owned(),
        }),
    }
}

/// Dialogues in progress, keyed by chat and user.
#[derive(Debug, Default)]
pub struct DialogueStore {
    sessions: Mutex<HashMap<DialogueKey, DialogueState>>,
}

impl DialogueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a dialogue at `AwaitingTitle`.
    pub async fn begin(&self, key: DialogueKey) {
        self.sessions
            .lock()
            .await
            .insert(key, DialogueState::AwaitingTitle);
    }

    /// Drops a dialogue. Returns whether one was in progress.
    pub async fn cancel(&self, key: DialogueKey) -> bool {
        self.sessions.lock().await.remove(&key).is_some()
    }

    /// Current state, if a dialogue is in progress.
    pub async fn state(&self, key: DialogueKey) -> Option<DialogueState> {
        self.sessions.lock().await.get(&key).cloned()
    }

    /// Feeds `input` into the dialogue for `key`.
    ///
    /// Returns `None` if no dialogue is in progress. A completed dialogue is
    /// removed; a rejected input leaves the state unchanged so the user can
    /// retry.
    pub async fn submit(
        &self,
        key: DialogueKey,
        input: &str,
    ) -> Option<Result<Transition, DialogueError>> {
        let mut sessions = self.sessions.lock().await;
        let state = sessions.get(&key)?;
        let result = state.advance(input);
        match &result {
            Ok(Transition::Next(next)) => {
                sessions.insert(key, next.clone());
            },
            Ok(Transition::Complete(_)) => {
                sessions.remove(&key);
            },
            Err(_) => {},
        }
        Some(result)
    }
}
