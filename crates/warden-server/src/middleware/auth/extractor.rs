//! Authentication extractors for handlers.

use crate::error::ApiError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use warden_auth::Principal;

/// The principal admitted by [`RoleGateLayer`](super::RoleGateLayer).
///
/// Only valid on routes behind the gate; elsewhere it rejects with 401.
#[derive(Debug, Clone)]
pub struct Auth(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Auth)
            .ok_or(ApiError::Unauthorized)
    }
}
