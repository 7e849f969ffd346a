//! Shared daemon state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use giveaway_core::{ContestService, GiveawayConfig};

use crate::dialogue::DialogueStore;

/// Shared daemon state.
pub type SharedState = Arc<DaemonStateHandle>;

/// Everything the update handlers need.
pub struct DaemonStateHandle {
    service: ContestService,
    dialogues: DialogueStore,
    config: GiveawayConfig,
    /// Bot username from `getMe`, used to filter `/cmd@bot` mentions.
    bot_username: Option<String>,
    /// Shutdown flag (atomic for lock-free checking).
    shutdown: AtomicBool,
    /// Time when the daemon started.
    started_at: DateTime<Utc>,
}

impl DaemonStateHandle {
    /// Create a new daemon state handle.
    #[must_use]
    pub fn new(
        service: ContestService,
        config: GiveawayConfig,
        bot_username: Option<String>,
    ) -> Self {
        Self {
            service,
            dialogues: DialogueStore::new(),
            config,
            bot_username,
            shutdown: AtomicBool::new(false),
            started_at: Utc::now(),
        }
    }

    /// Contest operations.
    #[must_use]
    pub const fn service(&self) -> &ContestService {
        &self.service
    }

    /// Creation dialogues in progress.
    #[must_use]
    pub const fn dialogues(&self) -> &DialogueStore {
        &self.dialogues
    }

    /// Loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &GiveawayConfig {
        &self.config
    }

    /// The bot's own username, if known.
    #[must_use]
    pub fn bot_username(&self) -> Option<&str> {
        self.bot_username.as_deref()
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Request shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Get daemon uptime in seconds.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // max(0) ensures non-negative
    pub fn uptime_secs(&self) -> u64 {
        let now = Utc::now();
        (now - self.started_at).num_seconds().max(0) as u64
    }
}
