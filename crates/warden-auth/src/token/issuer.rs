//! Token minting and signature verification.

use super::claims::{Claims, VerifiedToken};
use crate::error::{AuthError, AuthResult, DenyReason};
use crate::types::{IssuedToken, RoleId, TokenId, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use warden_common_secret::SecretString;

/// Mints and verifies HS256 tokens with a process-wide key.
///
/// The issuer is pure: callers pass the current time in, so expiry checks
/// happen against whatever clock the caller trusts.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer. The key must be non-empty and the TTL positive.
    pub fn new(signing_key: &SecretString, ttl: Duration) -> AuthResult<Self> {
        if signing_key.is_empty() {
            return Err(AuthError::Config("signing key is empty".into()));
        }
        if ttl <= Duration::zero() {
            return Err(AuthError::Config("session ttl must be positive".into()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock, not the system one.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(signing_key.expose_bytes()),
            decoding_key: DecodingKey::from_secret(signing_key.expose_bytes()),
            header: Header::new(Algorithm::HS256),
            validation,
            ttl,
        })
    }

    /// Session lifetime applied to new and refreshed tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a fresh token with a new token id.
    pub fn issue(
        &self,
        user_id: UserId,
        role_id: RoleId,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let issued_at = whole_seconds(now);
        let expires_at = self.expiry_from(issued_at)?;
        self.sign(user_id, role_id, TokenId::new(), issued_at, expires_at)
    }

    /// `now + ttl`, truncated to whole seconds. The expiry a refresh at
    /// `now` aims for.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> AuthResult<DateTime<Utc>> {
        whole_seconds(now)
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Config("session ttl overflows the clock".into()))
    }

    /// Re-sign an existing token with the same token id and the expiry the
    /// session registry settled on.
    pub fn reissue(
        &self,
        current: &VerifiedToken,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let issued_at = whole_seconds(now);
        let expires_at = whole_seconds(expires_at);
        self.sign(
            current.user_id,
            current.role_id,
            current.token_id,
            issued_at,
            expires_at,
        )
    }

    /// Verify signature and structure. Expiry is not checked here.
    pub fn decode(&self, token: &str) -> AuthResult<VerifiedToken> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::Denied(DenyReason::Unauthenticated))?;

        data.claims
            .verify_shape()
            .ok_or(AuthError::Denied(DenyReason::Unauthenticated))
    }

    fn sign(
        &self,
        user_id: UserId,
        role_id: RoleId,
        token_id: TokenId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let claims = Claims::new(user_id, role_id, token_id, issued_at, expires_at);
        let token = encode(&self.header, &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            token_id,
            user_id,
            role_id,
            issued_at,
            expires_at,
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Claims carry unix seconds, so stored instants are truncated to match.
fn whole_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}
