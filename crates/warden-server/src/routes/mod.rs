//! Route configuration for the Warden API server.

mod gated;
mod public;
mod session;

use crate::state::AppState;
use axum::{
    handler::HandlerWithoutStateExt, http::StatusCode, response::IntoResponse, Json, Router,
};
use serde_json::json;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Create the main application router.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let common_middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .merge(public::router())
        .merge(session::router())
        .merge(gated::router(&state))
        .fallback_service(fallback_handler.into_service())
        .layer(common_middleware)
        .with_state(state)
}

async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": {
                "code": "not_found",
                "message": "The requested resource was not found"
            }
        })),
    )
}
