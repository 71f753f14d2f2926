//! API error types.

use axum::http::StatusCode;
use std::collections::HashMap;
use thiserror::Error;
use warden_auth::{AuthError, DenyReason, RoleId};

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// API error enum covering all error cases.
#[derive(Debug, Error)]
pub enum ApiError {
    // 400 Bad Request
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    ValidationError(HashMap<String, Vec<String>>),

    #[error("Invalid authorization header. Expected 'Bearer <token>'")]
    InvalidAuthorizationHeader,

    #[error("Role Undefined")]
    UnknownRole(RoleId),

    // 401 Unauthorized
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Invalid token")]
    InvalidToken,

    // 403 Forbidden
    #[error("Access denied")]
    Forbidden,

    #[error("Insufficient role")]
    InsufficientRole,

    // 409 Conflict
    #[error("Username already exists")]
    DuplicateUsername(String),

    // 500 Internal Server Error
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    // 503 Service Unavailable
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl ApiError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_)
            | Self::ValidationError(_)
            | Self::InvalidAuthorizationHeader
            | Self::UnknownRole(_) => StatusCode::BAD_REQUEST,

            Self::Unauthorized
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenRevoked
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,

            Self::Forbidden | Self::InsufficientRole => StatusCode::FORBIDDEN,

            Self::DuplicateUsername(_) => StatusCode::CONFLICT,

            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,

            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::ValidationError(_) => "validation_error",
            Self::InvalidAuthorizationHeader => "invalid_authorization_header",
            Self::UnknownRole(_) => "unknown_role",
            Self::Unauthorized => "unauthorized",
            Self::InvalidCredentials => "invalid_credentials",
            Self::TokenExpired => "token_expired",
            Self::TokenRevoked => "token_revoked",
            Self::InvalidToken => "invalid_token",
            Self::Forbidden => "forbidden",
            Self::InsufficientRole => "insufficient_role",
            Self::DuplicateUsername(_) => "duplicate_username",
            Self::Internal(_) => "internal_error",
            Self::ServiceUnavailable => "service_unavailable",
        }
    }

    /// Check if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Map an authorization denial to what the client sees.
    ///
    /// Unless `expose` is set, expired, revoked and malformed tokens all look
    /// the same, as do the two role failures.
    pub fn from_denial(reason: DenyReason, expose: bool) -> Self {
        match (reason, expose) {
            (DenyReason::Unauthenticated | DenyReason::TokenExpired | DenyReason::TokenRevoked, false) => {
                Self::Unauthorized
            }
            (DenyReason::InsufficientRole | DenyReason::UnknownRole, false) => Self::Forbidden,
            (DenyReason::Unauthenticated, true) => Self::InvalidToken,
            (DenyReason::TokenExpired, true) => Self::TokenExpired,
            (DenyReason::TokenRevoked, true) => Self::TokenRevoked,
            (DenyReason::InsufficientRole, true) => Self::InsufficientRole,
            (DenyReason::UnknownRole, true) => Self::Forbidden,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => Self::InvalidCredentials,
            AuthError::InvalidToken | AuthError::SessionNotFound => Self::InvalidToken,
            AuthError::DuplicateUsername(name) => Self::DuplicateUsername(name),
            AuthError::UnknownRole(id) => Self::UnknownRole(id),
            AuthError::Denied(reason) => Self::from_denial(reason, false),
            AuthError::Infrastructure(_) => Self::ServiceUnavailable,
            err @ (AuthError::PasswordHash(_) | AuthError::Signing(_) | AuthError::Config(_)) => {
                Self::Internal(anyhow::Error::new(err))
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}
