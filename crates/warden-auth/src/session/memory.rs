//! In-memory session store.

use super::store::{next_expiry, SessionEntry, SessionStore};
use crate::error::StoreResult;
use crate::types::{TokenId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::debug;

/// Session store backed by a sharded concurrent map.
///
/// Each operation runs under the shard lock of the user's entry, which gives
/// per-user atomicity without a global lock.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<UserId, HashMap<TokenId, DateTime<Utc>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with at least one stored session.
    pub fn user_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn add(
        &self,
        user_id: UserId,
        entry: SessionEntry,
        cap: Option<usize>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TokenId>> {
        let mut set = self.sessions.entry(user_id).or_default();
        set.retain(|_, expires_at| *expires_at > now);

        let mut evicted = Vec::new();
        if let Some(cap) = cap.filter(|cap| *cap > 0) {
            while set.len() >= cap {
                let oldest = set
                    .iter()
                    .min_by_key(|(token_id, expires_at)| (**expires_at, **token_id))
                    .map(|(token_id, _)| *token_id);
                match oldest {
                    Some(token_id) => {
                        set.remove(&token_id);
                        evicted.push(token_id);
                    }
                    None => break,
                }
            }
        }

        set.insert(entry.token_id, entry.expires_at);
        Ok(evicted)
    }

    async fn refresh(
        &self,
        user_id: UserId,
        token_id: TokenId,
        target: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let Some(mut set) = self.sessions.get_mut(&user_id) else {
            return Ok(None);
        };

        match set.get_mut(&token_id) {
            Some(current) if *current > now => {
                *current = next_expiry(*current, target);
                Ok(Some(*current))
            }
            _ => Ok(None),
        }
    }

    async fn remove(&self, user_id: UserId, token_id: TokenId) -> StoreResult<bool> {
        let removed = match self.sessions.get_mut(&user_id) {
            Some(mut set) => set.remove(&token_id).is_some(),
            None => false,
        };
        self.sessions.remove_if(&user_id, |_, set| set.is_empty());
        Ok(removed)
    }

    async fn clear(&self, user_id: UserId) -> StoreResult<usize> {
        Ok(self
            .sessions
            .remove(&user_id)
            .map(|(_, set)| set.len())
            .unwrap_or(0))
    }

    async fn contains_live(
        &self,
        user_id: UserId,
        token_id: TokenId,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self
            .sessions
            .get(&user_id)
            .and_then(|set| set.get(&token_id).copied())
            .is_some_and(|expires_at| expires_at > now))
    }

    async fn list_live(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<Vec<SessionEntry>> {
        let mut entries: Vec<SessionEntry> = self
            .sessions
            .get(&user_id)
            .map(|set| {
                set.iter()
                    .filter(|(_, expires_at)| **expires_at > now)
                    .map(|(token_id, expires_at)| SessionEntry::new(*token_id, *expires_at))
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by_key(|entry| (entry.expires_at, entry.token_id));
        Ok(entries)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut purged = 0;
        self.sessions.retain(|_, set| {
            let before = set.len();
            set.retain(|_, expires_at| *expires_at > now);
            purged += before - set.len();
            !set.is_empty()
        });

        debug!(purged, "Purged expired in-memory sessions");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn entry(expires: i64) -> SessionEntry {
        SessionEntry::new(TokenId::new(), at(expires))
    }

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);

    #[tokio::test]
    async fn test_add_and_contains() {
        let store = MemorySessionStore::new();
        let e = entry(100);
        store.add(ALICE, e, None, at(0)).await.unwrap();

        assert!(store.contains_live(ALICE, e.token_id, at(50)).await.unwrap());
        assert!(!store.contains_live(BOB, e.token_id, at(50)).await.unwrap());
        assert!(!store.contains_live(ALICE, e.token_id, at(100)).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = MemorySessionStore::new();
        let e = entry(100);
        store.add(ALICE, e, None, at(0)).await.unwrap();

        assert!(store.remove(ALICE, e.token_id).await.unwrap());
        assert!(!store.remove(ALICE, e.token_id).await.unwrap());
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_only_touches_one_user() {
        let store = MemorySessionStore::new();
        store.add(ALICE, entry(100), None, at(0)).await.unwrap();
        store.add(ALICE, entry(100), None, at(0)).await.unwrap();
        let bobs = entry(100);
        store.add(BOB, bobs, None, at(0)).await.unwrap();

        assert_eq!(store.clear(ALICE).await.unwrap(), 2);
        assert_eq!(store.clear(ALICE).await.unwrap(), 0);
        assert!(store.contains_live(BOB, bobs.token_id, at(0)).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_requires_live_entry() {
        let store = MemorySessionStore::new();
        let e = entry(100);
        store.add(ALICE, e, None, at(0)).await.unwrap();

        assert_eq!(
            store.refresh(ALICE, e.token_id, at(200), at(50)).await.unwrap(),
            Some(at(200))
        );
        assert!(store.contains_live(ALICE, e.token_id, at(150)).await.unwrap());

        // Expired at 200, so refreshing at 200 fails and changes nothing.
        assert_eq!(store.refresh(ALICE, e.token_id, at(400), at(200)).await.unwrap(), None);
        assert!(!store.contains_live(ALICE, e.token_id, at(250)).await.unwrap());

        assert_eq!(store.refresh(ALICE, TokenId::new(), at(400), at(0)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_refresh_never_shortens() {
        let store = MemorySessionStore::new();
        let e = entry(100);
        store.add(ALICE, e, None, at(0)).await.unwrap();
        store.refresh(ALICE, e.token_id, at(300), at(10)).await.unwrap();

        // An earlier target keeps the stored expiry.
        assert_eq!(
            store.refresh(ALICE, e.token_id, at(150), at(20)).await.unwrap(),
            Some(at(300))
        );
        assert!(store.contains_live(ALICE, e.token_id, at(299)).await.unwrap());
    }

    #[tokio::test]
    async fn test_cap_evicts_earliest_expiry() {
        let store = MemorySessionStore::new();
        let first = entry(100);
        let second = entry(200);
        let third = entry(300);
        store.add(ALICE, second, Some(2), at(0)).await.unwrap();
        store.add(ALICE, first, Some(2), at(0)).await.unwrap();

        let evicted = store.add(ALICE, third, Some(2), at(0)).await.unwrap();
        assert_eq!(evicted, vec![first.token_id]);

        let live: Vec<_> = store
            .list_live(ALICE, at(0))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.token_id)
            .collect();
        assert_eq!(live, vec![second.token_id, third.token_id]);
    }

    #[tokio::test]
    async fn test_expired_entries_do_not_count_against_cap() {
        let store = MemorySessionStore::new();
        let stale = entry(10);
        store.add(ALICE, stale, Some(1), at(0)).await.unwrap();

        let evicted = store.add(ALICE, entry(100), Some(1), at(20)).await.unwrap();
        assert!(evicted.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemorySessionStore::new();
        store.add(ALICE, entry(10), None, at(0)).await.unwrap();
        store.add(ALICE, entry(100), None, at(0)).await.unwrap();
        store.add(BOB, entry(10), None, at(0)).await.unwrap();

        assert_eq!(store.purge_expired(at(50)).await.unwrap(), 2);
        assert_eq!(store.user_count(), 1);
        assert_eq!(store.list_live(ALICE, at(50)).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_for_one_user() {
        let store = std::sync::Arc::new(MemorySessionStore::new());
        let now = at(0);

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .add(ALICE, SessionEntry::new(TokenId::new(), now + Duration::hours(1)), None, now)
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list_live(ALICE, now).await.unwrap().len(), 64);
    }
}
