//! Unauthenticated routes.

use crate::state::AppState;
use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Hello World" }))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
