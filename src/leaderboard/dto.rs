use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    pub session_token: String,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct SubmitScoreResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HighScore {
    pub username: String,
    pub score: f64,
}

/// A player seen recently, with their best all-time score.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurrentPlayer {
    pub username: String,
    pub score: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub active_at: OffsetDateTime,
}
