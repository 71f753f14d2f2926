//! Role-gate middleware layer.

use super::token::extract_token;
use crate::error::ApiError;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use warden_auth::{AuthService, Decision, RoleId};

/// Gate a route at a required role.
///
/// Allowed requests continue with the [`Principal`](warden_auth::Principal)
/// in their extensions; denied ones are answered here.
#[derive(Clone)]
pub struct RoleGateLayer {
    auth: Arc<AuthService>,
    required: RoleId,
}

impl RoleGateLayer {
    pub fn new(auth: Arc<AuthService>, required: RoleId) -> Self {
        Self { auth, required }
    }
}

impl<S> Layer<S> for RoleGateLayer {
    type Service = RoleGateMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RoleGateMiddleware {
            inner,
            auth: self.auth.clone(),
            required: self.required,
        }
    }
}

/// Role-gate middleware service.
#[derive(Clone)]
pub struct RoleGateMiddleware<S> {
    inner: S,
    auth: Arc<AuthService>,
    required: RoleId,
}

impl<S> Service<Request<Body>> for RoleGateMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let auth = self.auth.clone();
        let required = self.required;
        // Use the clone that was polled ready, leave a fresh one behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let token = match extract_token(req.headers()) {
                Ok(token) => token,
                Err(err) => return Ok(err.into_response()),
            };

            match auth.authorize(&token, required).await {
                Ok(Decision::Allow(principal)) => {
                    req.extensions_mut().insert(principal);
                }
                Ok(Decision::Deny(reason)) => {
                    let err = ApiError::from_denial(reason, auth.expose_denial_reasons());
                    return Ok(err.into_response());
                }
                Err(err) => return Ok(ApiError::from(err).into_response()),
            }

            inner.call(req).await
        })
    }
}
