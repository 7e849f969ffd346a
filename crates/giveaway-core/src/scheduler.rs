//! Deadline-driven contest finalization.
//!
//! Every created contest gets one lightweight task that sleeps until the
//! contest's deadline and then finalizes it:
//!
//! ```text
//! arm ──> PENDING ──(deadline)──> finalize ──> FINALIZED
//!                                    │
//!                                    ├─ participants: pick winner, announce, DM winner
//!                                    └─ nobody:       announce "no participants"
//! ```
//!
//! Finalization is guarded by the contest's activity flag: a contest that is
//! already inactive is skipped. Delivery failures are logged and dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::contest::{ChatId, Participant};
use crate::notify::{Notifier, text};
use crate::registry::SharedRegistry;

/// What a finalize pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// A winner was drawn.
    Winner {
        /// The drawn participant.
        winner: Participant,
        /// Participants in the snapshot.
        total: usize,
    },
    /// Nobody joined.
    NoParticipants,
    /// The contest was unknown or already finalized.
    Skipped,
}

/// Arms and runs per-contest finalize tasks.
#[derive(Clone)]
pub struct LifecycleScheduler {
    registry: SharedRegistry,
    notifier: Arc<dyn Notifier>,
    operator: ChatId,
    pending: Arc<AtomicUsize>,
}

impl LifecycleScheduler {
    /// Creates a scheduler that reports every outcome to `operator`.
    #[must_use]
    pub fn new(registry: SharedRegistry, notifier: Arc<dyn Notifier>, operator: ChatId) -> Self {
        Self {
            registry,
            notifier,
            operator,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of armed timers that have not fired yet.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Spawns the finalize task for `contest_id`, firing at `deadline`.
    ///
    /// The returned handle may be dropped; the task keeps running detached.
    pub fn arm(&self, contest_id: String, deadline: Instant) -> JoinHandle<FinalizeOutcome> {
        let scheduler = self.clone();
        self.pending.fetch_add(1, Ordering::SeqCst);
        debug!(contest_id = %contest_id, "finalize timer armed");

        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            scheduler.pending.fetch_sub(1, Ordering::SeqCst);
            info!(contest_id = %contest_id, "finalize timer fired");
            scheduler.finalize(&contest_id).await
        })
    }

    /// Closes the contest, draws a winner and sends the announcements.
    ///
    /// No-op for unknown or already inactive contests.
    pub async fn finalize(&self, contest_id: &str) -> FinalizeOutcome {
        let Some(closed) = self.registry.close_for_finalize(contest_id).await else {
            debug!(contest_id = %contest_id, "finalize skipped: contest not active");
            return FinalizeOutcome::Skipped;
        };

        let recipients = self.recipients(closed.scope);
        let total = closed.participants.len();
        let winner = pick_winner(&closed.participants, &mut rand::thread_rng()).cloned();

        let Some(winner) = winner else {
            self.broadcast(&recipients, &text::no_participants(&closed.title))
                .await;
            info!(contest_id = %contest_id, "contest finalized without participants");
            return FinalizeOutcome::NoParticipants;
        };

        self.broadcast(
            &recipients,
            &text::winner_summary(&closed.title, &winner, total),
        )
        .await;

        let dm = text::winner_congratulation(&closed.title);
        if let Err(e) = self
            .notifier
            .notify(ChatId::from(winner.user_id), &dm)
            .await
        {
            warn!(
                contest_id = %contest_id,
                winner_id = %winner.user_id,
                error = %e,
                "failed to notify winner"
            );
        }

        info!(
            contest_id = %contest_id,
            winner_id = %winner.user_id,
            total,
            "contest finalized with winner"
        );
        FinalizeOutcome::Winner { winner, total }
    }

    /// Scope first, then the operator unless it is the same chat.
    fn recipients(&self, scope: Option<ChatId>) -> Vec<ChatId> {
        let mut recipients = Vec::with_capacity(2);
        recipients.extend(scope);
        if !recipients.contains(&self.operator) {
            recipients.push(self.operator);
        }
        recipients
    }

    async fn broadcast(&self, recipients: &[ChatId], text: &str) {
        for &recipient in recipients {
            if let Err(e) = self.notifier.notify(recipient, text).await {
                warn!(recipient = %recipient, error = %e, "failed to deliver announcement");
            }
        }
    }
}

/// Uniform choice over the snapshot; `None` when it is empty.
pub fn pick_winner<'a, R>(participants: &'a [Participant], rng: &mut R) -> Option<&'a Participant>
where
    R: Rng + ?Sized,
{
    participants.choose(rng)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::contest::UserId;
    use crate::notify::NotifyError;
    use crate::registry::ContestRegistry;

    const OPERATOR: ChatId = ChatId(475);

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(ChatId, String)>>,
        unreachable: HashSet<ChatId>,
    }

    impl RecordingNotifier {
        fn unreachable(ids: &[ChatId]) -> Self {
            Self {
                sent: Mutex::default(),
                unreachable: ids.iter().copied().collect(),
            }
        }

        fn sent(&self) -> Vec<(ChatId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, recipient: ChatId, text: &str) -> Result<(), NotifyError> {
            if self.unreachable.contains(&recipient) {
                return Err(NotifyError::Unreachable {
                    recipient,
                    reason: "chat not found".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient, text.to_string()));
            Ok(())
        }
    }

    fn scheduler(notifier: Arc<RecordingNotifier>) -> (SharedRegistry, LifecycleScheduler) {
        let registry = Arc::new(ContestRegistry::new());
        let scheduler = LifecycleScheduler::new(Arc::clone(&registry), notifier, OPERATOR);
        (registry, scheduler)
    }

    #[tokio::test]
    async fn finalize_picks_one_of_the_participants() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (registry, scheduler) = scheduler(Arc::clone(&notifier));
        let contest = registry.create("Demo", "d", 1, None).await.unwrap();
        for (id, name) in [(1, "A"), (2, "B"), (3, "C")] {
            registry.join(contest.id(), UserId(id), name).await;
        }

        let FinalizeOutcome::Winner { winner, total } = scheduler.finalize(contest.id()).await
        else {
            panic!("expected a winner");
        };
        assert_eq!(total, 3);
        assert!([1, 2, 3].contains(&winner.user_id.0));
        assert!(!registry.get(contest.id()).await.unwrap().is_active());

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, OPERATOR);
        assert!(sent[0].1.contains("Total participants: 3"));
        assert_eq!(sent[1].0, ChatId::from(winner.user_id));
        assert!(sent[1].1.contains("Congratulations"));
    }

    #[tokio::test]
    async fn finalize_without_participants_still_deactivates() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (registry, scheduler) = scheduler(Arc::clone(&notifier));
        let contest = registry.create("Empty", "e", 1, Some(ChatId(-100))).await.unwrap();

        assert_eq!(
            scheduler.finalize(contest.id()).await,
            FinalizeOutcome::NoParticipants
        );
        assert!(!registry.get(contest.id()).await.unwrap().is_active());

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, ChatId(-100));
        assert_eq!(sent[1].0, OPERATOR);
        assert!(sent.iter().all(|(_, t)| t.contains("nobody took part")));
    }

    #[tokio::test]
    async fn operator_chat_scope_is_not_notified_twice() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (registry, scheduler) = scheduler(Arc::clone(&notifier));
        let contest = registry.create("Own", "o", 1, Some(OPERATOR)).await.unwrap();

        scheduler.finalize(contest.id()).await;
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn finalize_is_a_no_op_once_inactive() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (registry, scheduler) = scheduler(Arc::clone(&notifier));
        let contest = registry.create("Demo", "d", 1, None).await.unwrap();
        registry.end(contest.id()).await;

        assert_eq!(scheduler.finalize(contest.id()).await, FinalizeOutcome::Skipped);
        assert_eq!(scheduler.finalize("contest_404").await, FinalizeOutcome::Skipped);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn unreachable_winner_does_not_block_finalization() {
        let notifier = Arc::new(RecordingNotifier::unreachable(&[ChatId(9)]));
        let (registry, scheduler) = scheduler(Arc::clone(&notifier));
        let contest = registry.create("Demo", "d", 1, None).await.unwrap();
        registry.join(contest.id(), UserId(9), "Ghost").await;

        let outcome = scheduler.finalize(contest.id()).await;
        assert!(matches!(outcome, FinalizeOutcome::Winner { total: 1, .. }));
        assert!(!registry.get(contest.id()).await.unwrap().is_active());
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn armed_timer_fires_at_the_deadline() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (registry, scheduler) = scheduler(Arc::clone(&notifier));
        let contest = registry.create("Timed", "t", 1, None).await.unwrap();

        let handle = scheduler.arm(contest.id().to_owned(), contest.deadline());
        assert_eq!(scheduler.pending_timers(), 1);

        tokio::time::sleep(std::time::Duration::from_secs(59)).await;
        assert!(registry.get(contest.id()).await.unwrap().is_active());
        assert!(notifier.sent().is_empty());

        assert_eq!(handle.await.unwrap(), FinalizeOutcome::NoParticipants);
        assert!(Instant::now() >= contest.deadline());
        assert_eq!(scheduler.pending_timers(), 0);
        assert!(!registry.get(contest.id()).await.unwrap().is_active());
    }

    #[test]
    fn pick_winner_covers_every_participant() {
        let participants: Vec<Participant> = (1..=3)
            .map(|i| Participant {
                user_id: UserId(i),
                display_name: format!("user-{i}"),
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let winner = pick_winner(&participants, &mut rng).unwrap();
            seen.insert(winner.user_id);
        }
        assert_eq!(seen.len(), 3);
        assert!(pick_winner(&[], &mut rng).is_none());
    }
}
