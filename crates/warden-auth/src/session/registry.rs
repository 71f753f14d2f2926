//! Session registry: the authoritative record of live tokens.

use super::retry::{error_kind, RetryPolicy};
use super::store::{SessionEntry, SessionStore};
use crate::clock::Clock;
use crate::error::{AuthError, AuthResult};
use crate::types::{TokenId, UserId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tracks which token ids are live for each user.
///
/// Wraps a [`SessionStore`] with the session cap, read retries and logging.
/// Cheap to clone.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    max_sessions_per_user: Option<usize>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            retry: RetryPolicy::default(),
            max_sessions_per_user: None,
        }
    }

    /// Retry policy for liveness checks.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Cap concurrent sessions per user.
    pub fn with_max_sessions_per_user(mut self, cap: Option<usize>) -> Self {
        self.max_sessions_per_user = cap;
        self
    }

    /// Record a newly issued token as live.
    pub async fn add(
        &self,
        user_id: UserId,
        token_id: TokenId,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let evicted = self
            .store
            .add(
                user_id,
                SessionEntry::new(token_id, expires_at),
                self.max_sessions_per_user,
                self.clock.now(),
            )
            .await?;

        for evicted_id in &evicted {
            info!(
                event = "session_evicted",
                user_id = %user_id,
                token_id = %evicted_id,
                "Session cap reached, evicted earliest-expiring session"
            );
        }
        debug!(user_id = %user_id, token_id = %token_id, %expires_at, "Session added");
        Ok(())
    }

    /// Extend a live session towards `target`. Returns the expiry now
    /// stored, which never moves backward. Fails with `SessionNotFound` if
    /// the session was revoked or has already expired.
    pub async fn refresh(
        &self,
        user_id: UserId,
        token_id: TokenId,
        target: DateTime<Utc>,
    ) -> AuthResult<DateTime<Utc>> {
        let stored = self
            .store
            .refresh(user_id, token_id, target, self.clock.now())
            .await?;

        let Some(expires_at) = stored else {
            debug!(user_id = %user_id, token_id = %token_id, "Refresh of missing session");
            return Err(AuthError::SessionNotFound);
        };

        debug!(user_id = %user_id, token_id = %token_id, %expires_at, "Session refreshed");
        Ok(expires_at)
    }

    /// Remove one session. Idempotent.
    pub async fn revoke_one(&self, user_id: UserId, token_id: TokenId) -> AuthResult<()> {
        let removed = self.store.remove(user_id, token_id).await?;
        info!(
            event = "session_revoked",
            user_id = %user_id,
            token_id = %token_id,
            removed,
            "Session revoked"
        );
        Ok(())
    }

    /// Remove every session of a user. Idempotent. Returns how many were removed.
    pub async fn revoke_all(&self, user_id: UserId) -> AuthResult<usize> {
        let removed = self.store.clear(user_id).await?;
        info!(
            event = "sessions_revoked",
            user_id = %user_id,
            removed,
            "All sessions revoked"
        );
        Ok(removed)
    }

    /// Whether the session is present and unexpired. Transient store
    /// failures are retried with backoff.
    pub async fn is_live(&self, user_id: UserId, token_id: TokenId) -> AuthResult<bool> {
        let result = self
            .retry
            .run("is_live", || {
                self.store
                    .contains_live(user_id, token_id, self.clock.now())
            })
            .await;

        result.map_err(|err| {
            warn!(
                user_id = %user_id,
                token_id = %token_id,
                kind = error_kind(&err),
                error = %err,
                "Session liveness check failed"
            );
            AuthError::Infrastructure(err)
        })
    }

    /// Live sessions of a user, earliest expiry first.
    pub async fn sessions(&self, user_id: UserId) -> AuthResult<Vec<SessionEntry>> {
        Ok(self.store.list_live(user_id, self.clock.now()).await?)
    }

    /// Drop expired sessions across all users.
    pub async fn purge_expired(&self) -> AuthResult<usize> {
        let purged = self.store.purge_expired(self.clock.now()).await?;
        if purged > 0 {
            info!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }

    /// Purge expired sessions every `interval` until the handle is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = registry.purge_expired().await {
                    warn!(error = %err, "Session sweep failed");
                }
            }
        })
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("clock", &self.clock)
            .field("retry", &self.retry)
            .field("max_sessions_per_user", &self.max_sessions_per_user)
            .finish_non_exhaustive()
    }
}
