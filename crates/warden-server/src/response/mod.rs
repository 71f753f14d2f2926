//! Response bodies.

use serde::Serialize;
use warden_auth::IssuedToken;

/// Returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Expiry as unix seconds.
    pub active_time: i64,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            active_time: issued.expires_at.timestamp(),
            token: issued.token,
        }
    }
}

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Registration acknowledgement.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub msg: &'static str,
}
