//! # giveaway-core
//!
//! Contest lifecycle engine for the giveaway bot.
//!
//! - [`registry`]: in-memory [`ContestRegistry`] with per-contest locking
//! - [`scheduler`]: one deferred finalize task per contest, winner draw
//! - [`service`]: [`ContestService`], the inbound triggers over both
//! - [`notify`]: the outbound [`Notifier`] seam and announcement texts
//! - [`config`]: TOML configuration
//! - [`log`]: secret redaction for log lines
//!
//! Nothing here talks to the messaging platform directly; the daemon crate
//! supplies a [`Notifier`] and drives the service from chat updates.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use giveaway_core::{ChatId, ContestService, JoinOutcome, Notifier, NotifyError, UserId};
//!
//! struct Stdout;
//!
//! #[async_trait]
//! impl Notifier for Stdout {
//!     async fn notify(&self, recipient: ChatId, text: &str) -> Result<(), NotifyError> {
//!         println!("{recipient}: {text}");
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let service = ContestService::new(Arc::new(Stdout), ChatId(1));
//! let created = service
//!     .create_contest("Demo", "Win a mug", 1, None)
//!     .await
//!     .unwrap();
//! let outcome = service
//!     .join_contest(created.contest.id(), UserId(7), "Alice")
//!     .await;
//! assert_eq!(outcome, JoinOutcome::Joined);
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod contest;
pub mod log;
pub mod notify;
pub mod registry;
pub mod scheduler;
pub mod service;

pub use config::{BotConfig, ConfigError, GiveawayConfig, PollingConfig};
pub use contest::{ChatId, Contest, Participant, UserId};
pub use notify::{Notifier, NotifyError};
pub use registry::{ClosedContest, ContestRegistry, JoinOutcome, RegistryError, SharedRegistry};
pub use scheduler::{FinalizeOutcome, LifecycleScheduler};
pub use service::{ContestService, ContestStatus, CreatedContest, DebugSnapshot};
