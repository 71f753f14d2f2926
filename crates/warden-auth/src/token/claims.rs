//! JWT claims.

use crate::types::{RoleId, TokenId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims as they travel inside the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Role ID.
    pub role: RoleId,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// JWT ID. Identifies the session in the registry.
    pub jti: String,
}

impl Claims {
    /// Build wire claims for one issuance.
    pub fn new(
        user_id: UserId,
        role_id: RoleId,
        token_id: TokenId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            role: role_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: token_id.to_string(),
        }
    }

    /// Parse into typed form. `None` if any field is out of shape.
    pub fn verify_shape(&self) -> Option<VerifiedToken> {
        Some(VerifiedToken {
            user_id: self.sub.parse().ok()?,
            role_id: self.role,
            token_id: TokenId::parse(&self.jti).ok()?,
            issued_at: DateTime::from_timestamp(self.iat, 0)?,
            expires_at: DateTime::from_timestamp(self.exp, 0)?,
        })
    }
}

/// A token whose signature and structure have been checked.
///
/// Expiry and revocation are not part of this check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub token_id: TokenId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerifiedToken {
    /// Whether the embedded expiry has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
