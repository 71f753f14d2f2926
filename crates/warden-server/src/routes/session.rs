//! Registration, login and token lifecycle routes.

use crate::{
    error::ApiResult,
    middleware::BearerToken,
    request::{LoginRequest, RegisterRequest},
    response::{CreatedResponse, MessageResponse, TokenResponse},
    state::AppState,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::instrument;
use validator::Validate;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh/token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/logout_all", post(logout_all))
}

#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    req.validate()?;
    state
        .auth
        .register(&req.username, &req.password, req.role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            msg: "User created successfully",
        }),
    ))
}

#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;
    let issued = state.auth.login(&req.username, &req.password).await?;
    Ok(Json(issued.into()))
}

async fn refresh_token(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> ApiResult<Json<TokenResponse>> {
    let issued = state.auth.refresh_token(&token).await?;
    Ok(Json(issued.into()))
}

async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> ApiResult<Json<MessageResponse>> {
    state.auth.logout(&token).await?;
    Ok(Json(MessageResponse::new("Logged out")))
}

async fn logout_all(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> ApiResult<Json<MessageResponse>> {
    let ended = state.auth.logout_all(&token).await?;
    Ok(Json(MessageResponse::new(format!(
        "Logged out of {ended} session(s)"
    ))))
}
