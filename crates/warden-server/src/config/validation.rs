//! Configuration validation.

use super::types::{ServerConfig, SessionBackend};
use std::collections::HashSet;
use thiserror::Error;
use warden_auth::settings::MAX_SESSION_TTL_SECS;
use warden_auth::RoleId;

/// Minimum signing key length in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid signing key: must be at least {MIN_SIGNING_KEY_LEN} bytes")]
    InvalidSigningKey,

    #[error("Invalid session TTL: must be positive")]
    InvalidSessionTtl,

    #[error("Invalid session TTL: {0}s exceeds the {MAX_SESSION_TTL_SECS}s limit")]
    SessionTtlTooLong(u64),

    #[error("Invalid session cap: must be at least 1")]
    InvalidSessionCap,

    #[error("Role hierarchy is empty")]
    EmptyRoles,

    #[error("Duplicate role id: {0}")]
    DuplicateRoleId(RoleId),

    #[error("Redis backend selected but redis_url not provided")]
    MissingRedisUrl,

    #[error("Invalid session store timeout: must be positive")]
    InvalidStoreTimeout,

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

/// Validate server configuration, collecting every problem.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.auth.signing_key.len() < MIN_SIGNING_KEY_LEN {
        errors.push(ConfigError::InvalidSigningKey);
    }

    if config.auth.session_ttl_secs == 0 {
        errors.push(ConfigError::InvalidSessionTtl);
    } else if config.auth.session_ttl_secs > MAX_SESSION_TTL_SECS {
        errors.push(ConfigError::SessionTtlTooLong(config.auth.session_ttl_secs));
    }

    if config.auth.max_sessions_per_user == Some(0) {
        errors.push(ConfigError::InvalidSessionCap);
    }

    if config.auth.roles.is_empty() {
        errors.push(ConfigError::EmptyRoles);
    }
    let mut seen = HashSet::new();
    for role in &config.auth.roles {
        if !seen.insert(role.id) {
            errors.push(ConfigError::DuplicateRoleId(role.id));
        }
    }

    if config.session_store.backend == SessionBackend::Redis
        && config
            .session_store
            .redis_url
            .as_deref()
            .map_or(true, str::is_empty)
    {
        errors.push(ConfigError::MissingRedisUrl);
    }

    if config.session_store.op_timeout_ms == 0 {
        errors.push(ConfigError::InvalidStoreTimeout);
    }

    if config.server.port == 0 {
        errors.push(ConfigError::InvalidPort(0));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigError::InvalidLogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
