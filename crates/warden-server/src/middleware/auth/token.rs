//! Reading the bearer token off a request.

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

const COOKIE_NAME: &str = "access_token=";

/// Pull the bearer token from `Authorization: Bearer <t>`, falling back to
/// an `access_token` cookie.
///
/// A missing token, an empty token and an `Authorization` header with any
/// other scheme are all `InvalidAuthorizationHeader`.
pub fn extract_token(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::InvalidAuthorizationHeader)?;

        return match auth_str.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(ApiError::InvalidAuthorizationHeader),
        };
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_str) = cookie_header.to_str() else {
            continue;
        };
        for cookie in cookie_str.split(';') {
            if let Some(token) = cookie.trim().strip_prefix(COOKIE_NAME) {
                if !token.is_empty() {
                    return Ok(token.to_string());
                }
            }
        }
    }

    Err(ApiError::InvalidAuthorizationHeader)
}

/// The raw bearer token, for handlers that validate it themselves
/// (refresh and logout).
#[derive(Clone)]
pub struct BearerToken(pub String);

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_token(&parts.headers).map(BearerToken)
    }
}
