//! Role-gated routes.

use crate::{middleware::{Auth, RoleGateLayer}, response::MessageResponse, state::AppState};
use axum::{routing::get, Json, Router};
use warden_auth::BuiltinRole;

pub(super) fn router(state: &AppState) -> Router<AppState> {
    let gate = |role: BuiltinRole| RoleGateLayer::new(state.auth.clone(), role.id());

    Router::new()
        .merge(
            Router::new()
                .route("/admin_path", get(admin))
                .route_layer(gate(BuiltinRole::Admin)),
        )
        .merge(
            Router::new()
                .route("/moderator_path", get(moderator))
                .route_layer(gate(BuiltinRole::Moderator)),
        )
        .merge(
            Router::new()
                .route("/user_path", get(user))
                .route_layer(gate(BuiltinRole::User)),
        )
}

async fn admin(Auth(principal): Auth) -> Json<MessageResponse> {
    Json(MessageResponse::new(format!(
        "Welcome to the admin area, user {}",
        principal.user_id
    )))
}

async fn moderator(Auth(principal): Auth) -> Json<MessageResponse> {
    Json(MessageResponse::new(format!(
        "Welcome to the moderator area, user {}",
        principal.user_id
    )))
}

async fn user(Auth(principal): Auth) -> Json<MessageResponse> {
    Json(MessageResponse::new(format!(
        "Welcome, user {}",
        principal.user_id
    )))
}
