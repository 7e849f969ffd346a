//! Contest entity and the opaque identifiers it is keyed by.
//!
//! A [`Contest`] is one giveaway instance: immutable content and deadline,
//! a join-ordered participant list unique by user, and an activity flag that
//! only ever goes from `true` to `false`.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Upper bound used when `now + duration` does not fit the monotonic clock.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Opaque user identifier supplied by the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque conversation identifier: a group, a channel, or a private chat.
///
/// Used both as a contest scope and as a notification recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's private chat is addressed by the same numeric id as the user.
impl From<UserId> for ChatId {
    fn from(user: UserId) -> Self {
        Self(user.0)
    }
}

/// One entrant of a contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Platform user id, unique within a contest.
    pub user_id: UserId,
    /// Name shown in announcements, captured at join time.
    pub display_name: String,
}

/// A single time-bounded giveaway.
#[derive(Debug, Clone)]
pub struct Contest {
    id: String,
    title: String,
    description: String,
    ends_at: DateTime<Utc>,
    deadline: Instant,
    scope: Option<ChatId>,
    participants: Vec<Participant>,
    is_active: bool,
}

impl Contest {
    /// Creates an active contest ending `duration` from now.
    ///
    /// The wall-clock `ends_at` and the monotonic `deadline` are taken at the
    /// same moment. Expiry checks and timer arming use the monotonic value.
    pub(crate) fn new(
        id: String,
        title: String,
        description: String,
        duration: Duration,
        scope: Option<ChatId>,
    ) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(duration)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let ends_at = TimeDelta::from_std(duration)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            id,
            title,
            description,
            ends_at,
            deadline,
            scope,
            participants: Vec::new(),
            is_active: true,
        }
    }

    /// Registry-assigned identifier, e.g. `contest_3`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Contest title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Contest description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Wall-clock end of the entry window.
    #[must_use]
    pub const fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// Monotonic end of the entry window.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Originating chat, or `None` for an unscoped contest.
    #[must_use]
    pub const fn scope(&self) -> Option<ChatId> {
        self.scope
    }

    /// Participants in join order.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Number of participants.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Whether the contest has not been finalized yet.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Whether the deadline has passed as of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.deadline
    }

    /// Active and not yet expired.
    #[must_use]
    pub fn accepts_entries(&self) -> bool {
        self.is_active && !self.is_expired()
    }

    /// Whole minutes left until the deadline, floored, zero once expired.
    #[must_use]
    pub fn remaining_minutes(&self) -> u64 {
        self.deadline
            .saturating_duration_since(Instant::now())
            .as_secs()
            / 60
    }

    /// Whether this contest shows up in listings for `scope`.
    ///
    /// Unscoped contests are visible everywhere; a `None` filter matches
    /// every contest.
    #[must_use]
    pub fn is_visible_in(&self, scope: Option<ChatId>) -> bool {
        match (scope, self.scope) {
            (None, _) | (Some(_), None) => true,
            (Some(filter), Some(own)) => filter == own,
        }
    }

    /// Appends a participant unless `user_id` already joined.
    ///
    /// Returns `false` without mutating anything for a repeat join.
    pub fn add_participant(&mut self, user_id: UserId, display_name: impl Into<String>) -> bool {
        if self.participants.iter().any(|p| p.user_id == user_id) {
            return false;
        }
        self.participants.push(Participant {
            user_id,
            display_name: display_name.into(),
        });
        true
    }

    /// Clears the activity flag. Returns whether it was still set.
    pub(crate) fn deactivate(&mut self) -> bool {
        std::mem::replace(&mut self.is_active, false)
    }
}


#[cfg(test)]
mod join_property_tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    /// Generates join attempts over a small user pool so repeats are common.
    fn arb_joins() -> impl Strategy<Value = Vec<(i64, String)>> {
        prop::collection::vec((0i64..12, "[A-Za-z]{1,8}"), 0..60)
    }

    /// One step against a contest: a join attempt or an explicit end.
    #[derive(Debug, Clone)]
    enum Step {
        Join(i64),
        Deactivate,
    }

    fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
        prop::collection::vec(
            prop_oneof![
                4 => (0i64..12).prop_map(Step::Join),
                1 => Just(Step::Deactivate),
            ],
            0..60,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: only the first join per user succeeds, participants stay
        /// unique by user id and keep first-join order.
        #[test]
        fn prop_first_join_per_user_wins(joins in arb_joins()) {
            let mut c = Contest::new(
                "contest_1".to_string(),
                "Demo".to_string(),
                "d".to_string(),
                Duration::from_secs(300),
                None,
            );
            let mut seen = HashSet::new();
            let mut expected = Vec::new();

            for (user, name) in &joins {
                let first = seen.insert(*user);
                prop_assert_eq!(c.add_participant(UserId(*user), name.clone()), first);
                if first {
                    expected.push((*user, name.clone()));
                }
            }

            let actual: Vec<(i64, String)> = c
                .participants()
                .iter()
                .map(|p| (p.user_id.0, p.display_name.clone()))
                .collect();
            prop_assert_eq!(actual, expected);

            let unique: HashSet<UserId> = c.participants().iter().map(|p| p.user_id).collect();
            prop_assert_eq!(unique.len(), c.participant_count());
        }

        /// Property: once cleared, the activity flag never comes back.
        #[test]
        fn prop_deactivation_is_permanent(steps in arb_steps()) {
            let mut c = Contest::new(
                "contest_1".to_string(),
                "Demo".to_string(),
                "d".to_string(),
                Duration::from_secs(300),
                None,
            );
            let mut ended = false;

            for step in steps {
                match step {
                    Step::Join(user) => {
                        c.add_participant(UserId(user), "x");
                    },
                    Step::Deactivate => {
                        prop_assert_eq!(c.deactivate(), !ended);
                        ended = true;
                    },
                }
                prop_assert_eq!(c.is_active(), !ended);
            }
        }
    }
}
