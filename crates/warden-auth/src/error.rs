//! Error taxonomy for the authentication core.

use crate::types::RoleId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type for session store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Why an authorization request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Token is malformed or its signature does not verify.
    Unauthenticated,
    /// Token's embedded expiry has passed.
    TokenExpired,
    /// Token id is no longer live in the session registry.
    TokenRevoked,
    /// Token role or required role is not in the registry.
    UnknownRole,
    /// Token role ranks below the required role.
    InsufficientRole,
}

impl DenyReason {
    /// Stable machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::TokenExpired => "token_expired",
            Self::TokenRevoked => "token_revoked",
            Self::UnknownRole => "unknown_role",
            Self::InsufficientRole => "insufficient_role",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the session store backends.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("session store operation timed out")]
    Timeout,

    #[error("session store backend error: {0}")]
    Backend(String),

    #[error("corrupt session data: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether retrying the same read could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// Errors returned by the auth core.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad credentials. Never says which half was wrong.
    #[error("authentication failed")]
    Unauthenticated,

    /// Token failed validation on refresh/logout.
    #[error("invalid token")]
    InvalidToken,

    #[error("username already registered: {0}")]
    DuplicateUsername(String),

    #[error("unknown role: {0}")]
    UnknownRole(RoleId),

    #[error("session not found")]
    SessionNotFound,

    #[error("access denied: {0}")]
    Denied(DenyReason),

    #[error("infrastructure failure: {0}")]
    Infrastructure(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("invalid auth configuration: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether this is an infrastructure problem rather than a business result.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

impl From<DenyReason> for AuthError {
    fn from(reason: DenyReason) -> Self {
        Self::Denied(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_reason_codes_are_stable() {
        assert_eq!(DenyReason::TokenRevoked.to_string(), "token_revoked");
        assert_eq!(
            serde_json::to_string(&DenyReason::InsufficientRole).unwrap(),
            "\"insufficient_role\""
        );
    }

    #[test]
    fn test_transient_store_errors() {
        assert!(StoreError::Timeout.is_transient());
        assert!(StoreError::Unavailable("refused".into()).is_transient());
        assert!(!StoreError::Backend("WRONGTYPE".into()).is_transient());
        assert!(!StoreError::Corrupt("bad member".into()).is_transient());
    }

    #[test]
    fn test_store_error_converts_to_infrastructure() {
        let err: AuthError = StoreError::Timeout.into();
        assert!(err.is_infrastructure());
        assert!(!AuthError::Unauthenticated.is_infrastructure());
    }
}
