use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SessionRequest, SignupRequest, TouchResponse},
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/session", post(get_session_user))
        .route("/auth/session/touch", post(touch_session))
}

#[instrument(skip(state, body))]
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = body?;
    let res = services::signup(&state, payload, OffsetDateTime::now_utc()).await?;
    Ok(Json(res))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = body?;
    let res = services::login(&state, payload, OffsetDateTime::now_utc()).await?;
    Ok(Json(res))
}

#[instrument(skip(state, body))]
pub async fn get_session_user(
    State(state): State<AppState>,
    body: Result<Json<SessionRequest>, JsonRejection>,
) -> AppResult<Json<Option<PublicUser>>> {
    let Json(payload) = body?;
    let user = services::session_user(&state, &payload.session_token).await?;
    Ok(Json(user))
}

#[instrument(skip(state, body))]
pub async fn touch_session(
    State(state): State<AppState>,
    body: Result<Json<SessionRequest>, JsonRejection>,
) -> AppResult<Json<TouchResponse>> {
    let Json(payload) = body?;
    let res =
        services::touch_session(&state, &payload.session_token, OffsetDateTime::now_utc()).await?;
    Ok(Json(res))
}
