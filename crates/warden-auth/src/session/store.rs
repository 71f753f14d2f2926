//! Session store trait.

use crate::error::StoreResult;
use crate::types::{TokenId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// One live session: a token id and when it stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    pub token_id: TokenId,
    pub expires_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new(token_id: TokenId, expires_at: DateTime<Utc>) -> Self {
        Self {
            token_id,
            expires_at,
        }
    }

    /// Live iff the expiry is strictly after `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Expiry of a session after a refresh that aims for `target` (`now + ttl`).
///
/// Never earlier than `current`, at least one second past it when that stays
/// within one second of `target`, and never more than one second past
/// `target`. Refreshing an older token text therefore cannot shorten the
/// session, and refreshing in a tight loop cannot grow it without bound.
pub fn next_expiry(current: DateTime<Utc>, target: DateTime<Utc>) -> DateTime<Utc> {
    let one_second = Duration::seconds(1);
    let bumped = current.checked_add_signed(one_second).unwrap_or(current);
    let ceiling = target.checked_add_signed(one_second).unwrap_or(target);
    std::cmp::max(current, std::cmp::min(std::cmp::max(target, bumped), ceiling))
}

/// Backing storage for sessions: `user_id -> {token_id -> expires_at}`.
///
/// Each method must be one atomic operation with respect to the given user.
/// `now` is supplied by the caller so that every backend agrees on time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session. When `cap` is set and the user already holds `cap`
    /// live sessions, the earliest-expiring ones are evicted first.
    /// Returns the evicted token ids.
    async fn add(
        &self,
        user_id: UserId,
        entry: SessionEntry,
        cap: Option<usize>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TokenId>>;

    /// Move the expiry of a live session to [`next_expiry`] of its stored
    /// expiry and `target`. Returns the expiry now stored, or `None` if the
    /// session is absent or expired.
    async fn refresh(
        &self,
        user_id: UserId,
        token_id: TokenId,
        target: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>>;

    /// Remove one session. `false` if it was not there.
    async fn remove(&self, user_id: UserId, token_id: TokenId) -> StoreResult<bool>;

    /// Remove every session of a user. Returns how many were removed.
    async fn clear(&self, user_id: UserId) -> StoreResult<usize>;

    /// Whether the session is present and unexpired.
    async fn contains_live(
        &self,
        user_id: UserId,
        token_id: TokenId,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Live sessions of a user, earliest expiry first.
    async fn list_live(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<Vec<SessionEntry>>;

    /// Drop expired sessions of every user. Returns how many were dropped.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_next_expiry_takes_target_when_later() {
        assert_eq!(next_expiry(at(100), at(500)), at(500));
    }

    #[test]
    fn test_next_expiry_same_second_moves_one_second() {
        assert_eq!(next_expiry(at(500), at(500)), at(501));
        // Another refresh in the same second is capped.
        assert_eq!(next_expiry(at(501), at(500)), at(501));
    }

    #[test]
    fn test_next_expiry_never_goes_back() {
        assert_eq!(next_expiry(at(900), at(500)), at(900));
    }

    proptest! {
        #[test]
        fn prop_next_expiry_bounds(current in 0i64..1_000_000, target in 0i64..1_000_000) {
            let next = next_expiry(at(current), at(target));
            prop_assert!(next >= at(current));
            prop_assert!(next >= at(target));
            prop_assert!(next <= std::cmp::max(at(current), at(target + 1)));
            if current < target + 1 {
                prop_assert!(next > at(current));
            }
        }
    }
}
