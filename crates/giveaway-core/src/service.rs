//! Inbound entry points of the lifecycle engine.
//!
//! [`ContestService`] ties the registry and the scheduler together so that
//! every created contest is armed immediately.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::contest::{ChatId, Contest, UserId};
use crate::notify::Notifier;
use crate::registry::{ContestRegistry, JoinOutcome, RegistryError, SharedRegistry};
use crate::scheduler::{FinalizeOutcome, LifecycleScheduler};

/// A freshly created contest and its armed finalize task.
#[derive(Debug)]
pub struct CreatedContest {
    /// Snapshot taken at creation.
    pub contest: Contest,
    /// Finalize task; may be dropped to detach it.
    pub timer: JoinHandle<FinalizeOutcome>,
}

/// One row of [`DebugSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestStatus {
    /// Contest id.
    pub id: String,
    /// Contest title.
    pub title: String,
    /// Active and not expired.
    pub accepting_entries: bool,
    /// Participant count.
    pub participants: usize,
    /// Whole minutes left.
    pub remaining_minutes: u64,
}

/// Operator view over the whole registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSnapshot {
    /// Contests ever created.
    pub total: usize,
    /// Contests currently accepting entries.
    pub active: usize,
    /// Finalize timers not yet fired.
    pub pending_timers: usize,
    /// Per-contest rows in creation order.
    pub contests: Vec<ContestStatus>,
}

/// Registry plus scheduler.
#[derive(Clone)]
pub struct ContestService {
    registry: SharedRegistry,
    scheduler: LifecycleScheduler,
}

impl ContestService {
    /// Creates a service over a fresh registry.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, operator: ChatId) -> Self {
        Self::with_registry(Arc::new(ContestRegistry::new()), notifier, operator)
    }

    /// Creates a service over an existing registry.
    #[must_use]
    pub fn with_registry(
        registry: SharedRegistry,
        notifier: Arc<dyn Notifier>,
        operator: ChatId,
    ) -> Self {
        let scheduler = LifecycleScheduler::new(Arc::clone(&registry), notifier, operator);
        Self {
            registry,
            scheduler,
        }
    }

    /// The underlying registry.
    #[must_use]
    pub const fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// The underlying scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &LifecycleScheduler {
        &self.scheduler
    }

    /// Creates a contest and arms its finalize timer.
    ///
    /// `duration_minutes` must already be validated as positive.
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`] from the registry.
    pub async fn create_contest(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        duration_minutes: u32,
        scope: Option<ChatId>,
    ) -> Result<CreatedContest, RegistryError> {
        let contest = self
            .registry
            .create(title, description, duration_minutes, scope)
            .await?;
        let timer = self
            .scheduler
            .arm(contest.id().to_owned(), contest.deadline());
        Ok(CreatedContest { contest, timer })
    }

    /// Registers `user_id` for `contest_id`.
    pub async fn join_contest(
        &self,
        contest_id: &str,
        user_id: UserId,
        display_name: impl Into<String>,
    ) -> JoinOutcome {
        self.registry.join(contest_id, user_id, display_name).await
    }

    /// Contests accepting entries that are visible in `scope`.
    pub async fn list_active_contests(&self, scope: Option<ChatId>) -> Vec<Contest> {
        self.registry.list_active(scope).await
    }

    /// Counts and per-contest status for operators.
    pub async fn debug_snapshot(&self) -> DebugSnapshot {
        let contests: Vec<ContestStatus> = self
            .registry
            .all()
            .await
            .iter()
            .map(|c| ContestStatus {
                id: c.id().to_owned(),
                title: c.title().to_owned(),
                accepting_entries: c.accepts_entries(),
                participants: c.participant_count(),
                remaining_minutes: c.remaining_minutes(),
            })
            .collect();

        DebugSnapshot {
            total: contests.len(),
            active: contests.iter().filter(|c| c.accepting_entries).count(),
            pending_timers: self.scheduler.pending_timers(),
            contests,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::notify::NotifyError;

    struct NullNotifier;

    #[async_trait]
    impl Notifier for NullNotifier {
        async fn notify(&self, _recipient: ChatId, _text: &str) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn debug_snapshot_reports_counts_and_rows() {
        let service = ContestService::new(Arc::new(NullNotifier), ChatId(1));
        let short = service.create_contest("Short", "s", 1, None).await.unwrap();
        service.create_contest("Long", "l", 90, None).await.unwrap();
        service
            .join_contest(short.contest.id(), UserId(5), "E")
            .await;

        let snapshot = service.debug_snapshot().await;
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.active, 2);
        assert_eq!(snapshot.pending_timers, 2);
        assert_eq!(snapshot.contests[0].participants, 1);
        assert_eq!(snapshot.contests[1].remaining_minutes, 90);

        let outcome = short.timer.await.unwrap();
        assert!(matches!(
            outcome,
            FinalizeOutcome::Winner { ref winner, total: 1 } if winner.user_id == UserId(5)
        ));

        let snapshot = service.debug_snapshot().await;
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.active, 1);
        assert_eq!(snapshot.pending_timers, 1);
        assert!(!snapshot.contests[0].accepting_entries);
    }
}
