use std::collections::HashSet;

use time::OffsetDateTime;
use tracing::{debug, info};

use crate::{
    auth::services::resolve_user,
    error::{AppError, AppResult},
    leaderboard::{
        dto::{CurrentPlayer, HighScore},
        repo_types::{Period, ScoreEntry},
    },
    state::AppState,
};

pub const TOP_SCORES_LIMIT: i64 = 10;

/// Record `score` for the session's user under every period.
pub async fn submit_score(
    state: &AppState,
    token: &str,
    score: f64,
    now: OffsetDateTime,
) -> AppResult<Vec<ScoreEntry>> {
    if !score.is_finite() || score < 0.0 {
        return Err(AppError::validation("Invalid score"));
    }

    let user = resolve_user(state, token)
        .await?
        .ok_or_else(AppError::invalid_session)?;

    let entries = state
        .scores
        .insert_all_periods(user.id, &user.username, score, now)
        .await?;
    info!(user_id = %user.id, score, "score submitted");
    Ok(entries)
}

pub async fn top_scores(
    state: &AppState,
    period: Period,
    now: OffsetDateTime,
) -> AppResult<Vec<ScoreEntry>> {
    state
        .scores
        .top(period, period.since(now), TOP_SCORES_LIMIT)
        .await
}

pub async fn global_high_score(state: &AppState) -> AppResult<Option<HighScore>> {
    let top = state.scores.top(Period::Alltime, None, 1).await?;
    Ok(top.into_iter().next().map(|e| HighScore {
        username: e.username,
        score: e.score,
    }))
}

/// Snapshot of recently active players, best score first.
///
/// Only the most recent `presence.scan_limit` sessions are read, so a player
/// whose last session fell out of that window, or out of the activity cutoff,
/// is missing from the result even if still connected.
pub async fn current_players(state: &AppState, now: OffsetDateTime) -> AppResult<Vec<CurrentPlayer>> {
    let presence = &state.config.presence;
    // A window reaching past the representable range means no cutoff.
    let cutoff = time::Duration::try_from(presence.active_window)
        .ok()
        .and_then(|window| now.checked_sub(window));

    let sessions = state.sessions.most_recent(presence.scan_limit).await?;
    let scanned = sessions.len();

    let mut seen = HashSet::new();
    let mut players = Vec::new();
    for session in sessions {
        let active_at = session.active_at();
        if cutoff.is_some_and(|c| active_at < c) || !seen.insert(session.user_id) {
            continue;
        }
        let Some(user) = state.users.find_by_id(session.user_id).await? else {
            continue;
        };
        let score = state
            .scores
            .best_for_user(user.id, Period::Alltime)
            .await?
            .map_or(0.0, |e| e.score);
        players.push(CurrentPlayer {
            username: user.username,
            score,
            active_at,
        });
    }

    // Stable: equal scores stay in recency order.
    players.sort_by(|a, b| b.score.total_cmp(&a.score));
    debug!(scanned, players = players.len(), "current players computed");
    Ok(players)
}
