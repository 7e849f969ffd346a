//! In-memory contest registry.
//!
//! The registry owns every contest created during the process lifetime. The
//! index is behind an async `RwLock`; each contest sits behind its own
//! `Mutex`, so the join check-and-append and the finalize
//! snapshot-and-deactivate for one contest are serialized while other
//! contests proceed independently.
//!
//! # Lock Ordering
//!
//! The index lock is never held while waiting on a contest lock. Lookups
//! clone the contest's `Arc` and release the index before locking it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::contest::{ChatId, Contest, Participant, UserId};

/// Registry shared between handlers and finalize tasks.
pub type SharedRegistry = Arc<ContestRegistry>;

type ContestCell = Arc<Mutex<Contest>>;

/// Fatal registry conditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// The id counter produced an id that is already taken.
    #[error("contest id {id} was minted twice")]
    DuplicateId {
        /// The colliding id.
        id: String,
    },
}

/// Result of a join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user was added.
    Joined,
    /// The user was already a participant; nothing changed.
    AlreadyJoined,
    /// Unknown contest, finalized, or past its deadline.
    Closed,
}

/// Participants snapshot taken at the moment a contest was deactivated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedContest {
    /// Contest id.
    pub id: String,
    /// Contest title.
    pub title: String,
    /// Originating chat, if any.
    pub scope: Option<ChatId>,
    /// Participants in join order.
    pub participants: Vec<Participant>,
}

struct RegistryInner {
    contests: HashMap<String, ContestCell>,
    /// Ids in creation order.
    order: Vec<String>,
    next_id: u64,
}

/// Owner of all contests.
pub struct ContestRegistry {
    inner: RwLock<RegistryInner>,
}

impl Default for ContestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContestRegistry {
    /// Creates an empty registry. The first contest gets id `contest_1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                contests: HashMap::new(),
                order: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Creates and stores a contest ending `duration_minutes` from now.
    ///
    /// Callers are expected to pass a positive duration; the registry does no
    /// range checking.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if the minted id is already in
    /// use, which indicates a broken invariant.
    pub async fn create(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        duration_minutes: u32,
        scope: Option<ChatId>,
    ) -> Result<Contest, RegistryError> {
        let mut inner = self.inner.write().await;

        let id = format!("contest_{}", inner.next_id);
        inner.next_id += 1;
        if inner.contests.contains_key(&id) {
            return Err(RegistryError::DuplicateId { id });
        }

        let duration = Duration::from_secs(u64::from(duration_minutes) * 60);
        let contest = Contest::new(id.clone(), title.into(), description.into(), duration, scope);
        let snapshot = contest.clone();

        inner
            .contests
            .insert(id.clone(), Arc::new(Mutex::new(contest)));
        inner.order.push(id);

        info!(
            contest_id = %snapshot.id(),
            title = %snapshot.title(),
            duration_minutes,
            scope = ?snapshot.scope(),
            "contest created"
        );
        Ok(snapshot)
    }

    /// Returns a snapshot of the contest, if it exists.
    pub async fn get(&self, id: &str) -> Option<Contest> {
        let cell = self.cell(id).await?;
        let contest = cell.lock().await.clone();
        Some(contest)
    }

    /// Active, unexpired contests visible in `scope`, in creation order.
    ///
    /// With `Some(scope)`, contests from that chat and unscoped contests are
    /// returned. Contests past their deadline are excluded even if
    /// finalization has not run yet.
    pub async fn list_active(&self, scope: Option<ChatId>) -> Vec<Contest> {
        let mut active = Vec::new();
        for cell in self.cells().await {
            let contest = cell.lock().await;
            if contest.accepts_entries() && contest.is_visible_in(scope) {
                active.push(contest.clone());
            }
        }
        active
    }

    /// Snapshots of every contest, in creation order.
    pub async fn all(&self) -> Vec<Contest> {
        let mut all = Vec::new();
        for cell in self.cells().await {
            all.push(cell.lock().await.clone());
        }
        all
    }

    /// Number of contests ever created.
    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    /// Whether no contest was created yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Marks a contest inactive. Returns whether it exists.
    ///
    /// Ending an already inactive contest changes nothing.
    pub async fn end(&self, id: &str) -> bool {
        let Some(cell) = self.cell(id).await else {
            return false;
        };
        if cell.lock().await.deactivate() {
            info!(contest_id = %id, "contest ended");
        }
        true
    }

    /// Registers a user for a contest.
    ///
    /// Existence, activity and expiry are checked under the contest's lock
    /// together with the append, so a join either lands before the finalize
    /// snapshot or observes the contest as closed.
    pub async fn join(
        &self,
        id: &str,
        user_id: UserId,
        display_name: impl Into<String>,
    ) -> JoinOutcome {
        let Some(cell) = self.cell(id).await else {
            debug!(contest_id = %id, user_id = %user_id, "join for unknown contest");
            return JoinOutcome::Closed;
        };
        let mut contest = cell.lock().await;
        if !contest.accepts_entries() {
            return JoinOutcome::Closed;
        }

        let display_name = display_name.into();
        if contest.add_participant(user_id, display_name.clone()) {
            info!(
                contest_id = %id,
                user_id = %user_id,
                display_name = %display_name,
                "participant joined"
            );
            JoinOutcome::Joined
        } else {
            JoinOutcome::AlreadyJoined
        }
    }

    /// Deactivates an active contest and returns its participants.
    ///
    /// Returns `None` if the contest is unknown or already inactive. The
    /// snapshot and the flag flip happen in one critical section.
    pub async fn close_for_finalize(&self, id: &str) -> Option<ClosedContest> {
        let cell = self.cell(id).await?;
        let mut contest = cell.lock().await;
        if !contest.deactivate() {
            return None;
        }
        info!(
            contest_id = %id,
            participants = contest.participant_count(),
            "contest ended"
        );
        Some(ClosedContest {
            id: contest.id().to_owned(),
            title: contest.title().to_owned(),
            scope: contest.scope(),
            participants: contest.participants().to_vec(),
        })
    }

    async fn cell(&self, id: &str) -> Option<ContestCell> {
        self.inner.read().await.contests.get(id).cloned()
    }

    async fn cells(&self) -> Vec<ContestCell> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.contests.get(id).cloned())
            .collect()
    }
}


#[cfg(test)]
mod listing_property_tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    const SCOPES: [Option<ChatId>; 3] = [None, Some(ChatId(-100)), Some(ChatId(-200))];

    #[derive(Debug, Clone)]
    enum Op {
        Create { minutes: u32, scope: usize },
        Advance { secs: u64 },
        End { pick: usize },
        Join { pick: usize, user: i64 },
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (1u32..5, 0usize..SCOPES.len())
                .prop_map(|(minutes, scope)| Op::Create { minutes, scope }),
            3 => (0u64..200).prop_map(|secs| Op::Advance { secs }),
            1 => any::<usize>().prop_map(|pick| Op::End { pick }),
            2 => (any::<usize>(), 0i64..5).prop_map(|(pick, user)| Op::Join { pick, user }),
        ]
    }

    fn paused_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Property: `list_active` returns exactly the contests that are
        /// still flagged active and not past their deadline, filtered by
        /// the scope rule, after any interleaving of operations.
        #[test]
        fn prop_list_active_never_shows_expired_or_ended(
            ops in prop::collection::vec(arb_op(), 1..40),
        ) {
            paused_runtime().block_on(async {
                let registry = ContestRegistry::new();
                let mut ids: Vec<String> = Vec::new();
                let mut ended: HashSet<String> = HashSet::new();

                for op in ops {
                    match op {
                        Op::Create { minutes, scope } => {
                            let c = registry.create("T", "d", minutes, SCOPES[scope]).await.unwrap();
                            ids.push(c.id().to_owned());
                        },
                        Op::Advance { secs } => {
                            tokio::time::advance(Duration::from_secs(secs)).await;
                        },
                        Op::End { pick } if !ids.is_empty() => {
                            let id = ids[pick % ids.len()].clone();
                            prop_assert!(registry.end(&id).await);
                            ended.insert(id);
                        },
                        Op::Join { pick, user } if !ids.is_empty() => {
                            let id = &ids[pick % ids.len()];
                            let open = registry
                                .get(id)
                                .await
                                .is_some_and(|c| c.accepts_entries());
                            let outcome = registry.join(id, UserId(user), "u").await;
                            prop_assert_eq!(outcome == JoinOutcome::Closed, !open);
                        },
                        Op::End { .. } | Op::Join { .. } => {},
                    }

                    let now = tokio::time::Instant::now();
                    let all = registry.all().await;
                    for scope in SCOPES {
                        let listed: HashSet<String> = registry
                            .list_active(scope)
                            .await
                            .iter()
                            .map(|c| c.id().to_owned())
                            .collect();
                        for c in &all {
                            let expected = !ended.contains(c.id())
                                && !c.is_expired_at(now)
                                && c.is_visible_in(scope);
                            prop_assert_eq!(listed.contains(c.id()), expected);
                            if ended.contains(c.id()) {
                                prop_assert!(!c.is_active());
                            }
                        }
                    }
                }
                Ok(())
            })?;
        }
    }
}
