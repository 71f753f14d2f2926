//! Redis session store.
//!
//! One sorted set per user at `{prefix}:user:{id}:sessions`: members are
//! token ids, scores are expiry unix seconds. Multi-step mutations run as
//! Lua scripts so each one is atomic on the server.

use super::store::{SessionEntry, SessionStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{TokenId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, Script};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// Drop expired members, evict down to the cap, insert, then keep the key
/// alive until its latest member expires.
///
/// KEYS[1] = session set; ARGV = token, expiry, now, cap (0 = none).
const ADD_SCRIPT: &str = r#"
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', ARGV[3])
local evicted = {}
local cap = tonumber(ARGV[4])
if cap > 0 then
  local excess = redis.call('ZCARD', KEYS[1]) - cap + 1
  if excess > 0 then
    evicted = redis.call('ZRANGE', KEYS[1], 0, excess - 1)
    redis.call('ZREMRANGEBYRANK', KEYS[1], 0, excess - 1)
  end
end
redis.call('ZADD', KEYS[1], ARGV[2], ARGV[1])
local latest = redis.call('ZREVRANGE', KEYS[1], 0, 0, 'WITHSCORES')
redis.call('EXPIREAT', KEYS[1], latest[2])
return evicted
"#;

/// Move the expiry of a member forward only while it is still live, using
/// the same rule as `next_expiry`. Returns the stored expiry, or nil.
///
/// KEYS[1] = session set; ARGV = token, target expiry, now.
const REFRESH_SCRIPT: &str = r#"
local score = redis.call('ZSCORE', KEYS[1], ARGV[1])
if not score then
  return false
end
local current = tonumber(score)
if current <= tonumber(ARGV[3]) then
  return false
end
local target = tonumber(ARGV[2])
local nextexp = math.max(current, math.min(math.max(target, current + 1), target + 1))
redis.call('ZADD', KEYS[1], 'XX', 'GT', nextexp, ARGV[1])
local latest = redis.call('ZREVRANGE', KEYS[1], 0, 0, 'WITHSCORES')
redis.call('EXPIREAT', KEYS[1], latest[2])
return nextexp
"#;

/// Redis store connection settings.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    pub url: String,
    pub key_prefix: String,
    /// Upper bound for any single round trip.
    pub op_timeout: Duration,
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: "warden".to_string(),
            op_timeout: Duration::from_secs(2),
        }
    }
}

/// Session store on a shared Redis instance.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    op_timeout: Duration,
    add_script: Script,
    refresh_script: Script,
}

impl RedisSessionStore {
    /// Connect and verify the server is reachable.
    pub async fn connect(config: &RedisStoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let conn = timeout(config.op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(map_redis_error)?;

        info!(prefix = %config.key_prefix, "Connected to Redis session store");

        Ok(Self {
            conn,
            prefix: config.key_prefix.clone(),
            op_timeout: config.op_timeout,
            add_script: Script::new(ADD_SCRIPT),
            refresh_script: Script::new(REFRESH_SCRIPT),
        })
    }

    /// Key holding a user's sessions.
    fn key(&self, user_id: UserId) -> String {
        format!("{}:user:{}:sessions", self.prefix, user_id)
    }

    fn scan_pattern(&self) -> String {
        format!("{}:user:*:sessions", self.prefix)
    }

    /// Bound one round trip by the configured timeout.
    async fn bounded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        timeout(self.op_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(map_redis_error)
    }
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("prefix", &self.prefix)
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

fn score_to_time(score: f64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp(score as i64, 0)
        .ok_or_else(|| StoreError::Corrupt(format!("expiry out of range: {score}")))
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn add(
        &self,
        user_id: UserId,
        entry: SessionEntry,
        cap: Option<usize>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TokenId>> {
        let mut conn = self.conn.clone();
        let mut invocation = self.add_script.prepare_invoke();
        invocation
            .key(self.key(user_id))
            .arg(entry.token_id.to_string())
            .arg(entry.expires_at.timestamp())
            .arg(now.timestamp())
            .arg(cap.unwrap_or(0));

        let evicted: Vec<String> = self.bounded(invocation.invoke_async(&mut conn)).await?;

        evicted
            .iter()
            .map(|member| {
                TokenId::parse(member)
                    .map_err(|_| StoreError::Corrupt(format!("bad session member: {member}")))
            })
            .collect()
    }

    async fn refresh(
        &self,
        user_id: UserId,
        token_id: TokenId,
        target: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let mut conn = self.conn.clone();
        let mut invocation = self.refresh_script.prepare_invoke();
        invocation
            .key(self.key(user_id))
            .arg(token_id.to_string())
            .arg(target.timestamp())
            .arg(now.timestamp());

        let stored: Option<i64> = self.bounded(invocation.invoke_async(&mut conn)).await?;
        stored.map(|secs| score_to_time(secs as f64)).transpose()
    }

    async fn remove(&self, user_id: UserId, token_id: TokenId) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .bounded(conn.zrem(self.key(user_id), token_id.to_string()))
            .await?;
        Ok(removed > 0)
    }

    async fn clear(&self, user_id: UserId) -> StoreResult<usize> {
        let mut conn = self.conn.clone();
        let key = self.key(user_id);
        let (count, _deleted): (usize, i64) = self
            .bounded(
                redis::pipe()
                    .atomic()
                    .zcard(&key)
                    .del(&key)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(count)
    }

    async fn contains_live(
        &self,
        user_id: UserId,
        token_id: TokenId,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let score: Option<f64> = self
            .bounded(conn.zscore(self.key(user_id), token_id.to_string()))
            .await?;
        Ok(score.is_some_and(|expiry| expiry > now.timestamp() as f64))
    }

    async fn list_live(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<Vec<SessionEntry>> {
        let mut conn = self.conn.clone();
        let members: Vec<(String, f64)> = self
            .bounded(conn.zrangebyscore_withscores(
                self.key(user_id),
                format!("({}", now.timestamp()),
                "+inf",
            ))
            .await?;

        members
            .into_iter()
            .map(|(member, score)| {
                let token_id = TokenId::parse(&member)
                    .map_err(|_| StoreError::Corrupt(format!("bad session member: {member}")))?;
                Ok(SessionEntry::new(token_id, score_to_time(score)?))
            })
            .collect()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut conn = self.conn.clone();
        let pattern = self.scan_pattern();

        let keys: Vec<String> = self
            .bounded(async {
                let mut iter = conn.scan_match::<_, String>(&pattern).await?;
                let mut keys = Vec::new();
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
                Ok::<_, RedisError>(keys)
            })
            .await?;

        let mut purged = 0;
        for key in keys {
            let removed: usize = self
                .bounded(conn.zrembyscore(&key, "-inf", now.timestamp()))
                .await?;
            purged += removed;
        }

        debug!(purged, "Purged expired Redis sessions");
        Ok(purged)
    }
}
