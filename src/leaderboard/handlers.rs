use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    error::AppResult,
    leaderboard::{
        dto::{CurrentPlayer, HighScore, SubmitScoreRequest, SubmitScoreResponse},
        repo_types::{Period, ScoreEntry},
        services,
    },
    state::AppState,
};

pub fn score_routes() -> Router<AppState> {
    Router::new()
        .route("/scores", post(submit))
        .route("/scores/top/:period", get(top_scores))
        .route("/scores/high", get(global_high_score))
}

pub fn player_routes() -> Router<AppState> {
    Router::new().route("/players/current", get(current_players))
}

/// Body rejections (malformed JSON, missing or mistyped fields) are
/// validation errors like any other bad input.
#[instrument(skip(state, body))]
pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> AppResult<Json<SubmitScoreResponse>> {
    let Json(payload) = body?;
    services::submit_score(
        &state,
        &payload.session_token,
        payload.score,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(SubmitScoreResponse { success: true }))
}

/// The period is parsed here rather than by the extractor so an unknown tag
/// surfaces as a validation error.
#[instrument(skip(state))]
pub async fn top_scores(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> AppResult<Json<Vec<ScoreEntry>>> {
    let period: Period = period.parse()?;
    let entries = services::top_scores(&state, period, OffsetDateTime::now_utc()).await?;
    Ok(Json(entries))
}

#[instrument(skip(state))]
pub async fn global_high_score(State(state): State<AppState>) -> AppResult<Json<Option<HighScore>>> {
    Ok(Json(services::global_high_score(&state).await?))
}

#[instrument(skip(state))]
pub async fn current_players(State(state): State<AppState>) -> AppResult<Json<Vec<CurrentPlayer>>> {
    let players = services::current_players(&state, OffsetDateTime::now_utc()).await?;
    Ok(Json(players))
}
