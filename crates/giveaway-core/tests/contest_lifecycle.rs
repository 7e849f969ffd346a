//! End-to-end contest lifecycle tests.
//!
//! These drive [`ContestService`] on tokio's paused clock: contests are
//! created, joined, and left to expire, and the notifications produced by
//! the finalize task are inspected.
//!
//! # Verification
//!
//! ```text
//! cargo test -p giveaway-core --test contest_lifecycle
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use giveaway_core::{
    ChatId, ContestService, FinalizeOutcome, JoinOutcome, Notifier, NotifyError, UserId,
};

const OPERATOR: ChatId = ChatId(475_354_897);

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(ChatId, String)>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: ChatId, text: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient, text.to_string()));
        Ok(())
    }
}

fn service() -> (Arc<RecordingNotifier>, ContestService) {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = ContestService::new(Arc::clone(&notifier) as Arc<dyn Notifier>, OPERATOR);
    (notifier, service)
}

#[tokio::test(start_paused = true)]
async fn demo_contest_with_three_entrants_and_a_duplicate() {
    let (notifier, service) = service();
    let created = service
        .create_contest("Demo", "Three people join", 1, None)
        .await
        .unwrap();
    let id = created.contest.id().to_owned();

    for (user, name) in [(1, "A"), (2, "B"), (3, "C")] {
        assert_eq!(
            service.join_contest(&id, UserId(user), name).await,
            JoinOutcome::Joined
        );
    }
    assert_eq!(
        service.join_contest(&id, UserId(2), "B").await,
        JoinOutcome::AlreadyJoined
    );
    assert_eq!(service.list_active_contests(None).await.len(), 1);

    let FinalizeOutcome::Winner { winner, total } = created.timer.await.unwrap() else {
        panic!("expected a winner");
    };
    assert_eq!(total, 3);

    let sent = notifier.sent();
    let summaries: Vec<_> = sent
        .iter()
        .filter(|(to, text)| *to == OPERATOR && text.contains("Total participants: 3"))
        .collect();
    assert_eq!(summaries.len(), 1);
    let congratulations: Vec<_> = sent
        .iter()
        .filter(|(_, text)| text.contains("Congratulations"))
        .collect();
    assert_eq!(congratulations.len(), 1);
    assert_eq!(congratulations[0].0, ChatId::from(winner.user_id));

    assert!(service.list_active_contests(None).await.is_empty());
    assert!(service.list_active_contests(Some(ChatId(-1))).await.is_empty());
    assert!(!service.registry().get(&id).await.unwrap().is_active());
}

#[tokio::test(start_paused = true)]
async fn contest_without_entrants_reports_no_participants() {
    let (notifier, service) = service();
    let created = service
        .create_contest("Quiet", "Nobody comes", 1, None)
        .await
        .unwrap();
    let id = created.contest.id().to_owned();

    assert_eq!(
        created.timer.await.unwrap(),
        FinalizeOutcome::NoParticipants
    );

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, OPERATOR);
    assert!(sent[0].1.contains("nobody took part"));
    assert!(!service.registry().get(&id).await.unwrap().is_active());
    assert!(service.list_active_contests(None).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn expired_contest_rejects_joins_before_finalize_runs() {
    let (_notifier, service) = service();
    let created = service
        .create_contest("Edge", "Deadline edge", 1, Some(ChatId(-100)))
        .await
        .unwrap();
    let id = created.contest.id().to_owned();
    drop(created.timer);

    tokio::time::advance(Duration::from_secs(60) + Duration::from_millis(1)).await;

    assert_eq!(
        service.join_contest(&id, UserId(1), "Late").await,
        JoinOutcome::Closed
    );
    assert!(
        service
            .list_active_contests(Some(ChatId(-100)))
            .await
            .is_empty()
    );
}

#[tokio::test(start_paused = true)]
async fn timers_are_independent_per_contest() {
    let (notifier, service) = service();
    let short = service
        .create_contest("Short", "one minute", 1, Some(ChatId(-1)))
        .await
        .unwrap();
    let long = service
        .create_contest("Long", "five minutes", 5, Some(ChatId(-2)))
        .await
        .unwrap();
    service
        .join_contest(long.contest.id(), UserId(10), "J")
        .await;

    short.timer.await.unwrap();
    let active = service.list_active_contests(None).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].title(), "Long");
    assert_eq!(
        service
            .join_contest(long.contest.id(), UserId(11), "K")
            .await,
        JoinOutcome::Joined
    );

    let outcome = long.timer.await.unwrap();
    assert!(matches!(outcome, FinalizeOutcome::Winner { total: 2, .. }));
    assert_eq!(service.scheduler().pending_timers(), 0);

    let to_long_scope = notifier
        .sent()
        .iter()
        .filter(|(to, _)| *to == ChatId(-2))
        .count();
    assert_eq!(to_long_scope, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn joins_racing_finalize_are_either_counted_or_rejected() {
    let (_notifier, service) = service();
    let created = service
        .create_contest("Race", "joins vs finalize", 60, None)
        .await
        .unwrap();
    let id = created.contest.id().to_owned();

    let mut joins = Vec::new();
    for user in 0..64 {
        let service = service.clone();
        let id = id.clone();
        joins.push(tokio::spawn(async move {
            (user, service.join_contest(&id, UserId(user), "racer").await)
        }));
    }
    let finalize = {
        let service = service.clone();
        let id = id.clone();
        tokio::spawn(async move { service.scheduler().finalize(&id).await })
    };

    let mut accepted = Vec::new();
    for join in joins {
        let (user, outcome) = join.await.unwrap();
        assert_ne!(outcome, JoinOutcome::AlreadyJoined);
        if outcome == JoinOutcome::Joined {
            accepted.push(user);
        }
    }

    let total = match finalize.await.unwrap() {
        FinalizeOutcome::Winner { total, .. } => total,
        FinalizeOutcome::NoParticipants => 0,
        FinalizeOutcome::Skipped => panic!("finalize must run exactly once"),
    };
    assert_eq!(total, accepted.len());
    assert_eq!(
        service.join_contest(&id, UserId(1000), "after").await,
        JoinOutcome::Closed
    );
}
