//! Long-polling update loop.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::client::{TelegramClient, TelegramError};
use super::types::Update;
use crate::handlers::{self, ChatSurface};
use crate::state::SharedState;

/// Where updates come from.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Fetches updates with id `>= offset`, waiting up to `poll_timeout`.
    async fn fetch(
        &self,
        offset: Option<i64>,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError>;
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn fetch(
        &self,
        offset: Option<i64>,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        self.get_updates(offset, poll_timeout).await
    }
}

/// Polls `source` and dispatches every update until shutdown is requested.
///
/// Updates are handled one at a time so each user's messages are processed
/// in order. A failed fetch is logged and retried after the server's
/// flood-control hint or the configured backoff.
pub async fn run_polling(
    source: &dyn UpdateSource,
    surface: &dyn ChatSurface,
    state: SharedState,
) {
    let poll_timeout = state.config().polling.timeout;
    let backoff = state.config().polling.error_backoff;
    let mut offset: Option<i64> = None;

    info!(timeout = ?poll_timeout, "update polling started");

    while !state.is_shutdown_requested() {
        let updates = match source.fetch(offset, poll_timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                let delay = e.retry_after().unwrap_or(backoff);
                warn!(error = %e, retry_in = ?delay, "failed to fetch updates");
                tokio::time::sleep(delay).await;
                continue;
            },
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            debug!(update_id = update.update_id, "dispatching update");
            handlers::dispatch(update, &state, surface).await;
        }
    }

    info!("update polling stopped");
}
