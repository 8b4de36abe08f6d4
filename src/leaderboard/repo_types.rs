use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;

/// Ranking scope a score entry is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Alltime,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Daily, Period::Weekly, Period::Alltime];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Alltime => "alltime",
        }
    }

    /// How far back the period ranks. Entries are never purged; older ones
    /// are simply filtered out at query time.
    pub fn window(self) -> Option<Duration> {
        match self {
            Period::Daily => Some(Duration::days(1)),
            Period::Weekly => Some(Duration::weeks(1)),
            Period::Alltime => None,
        }
    }

    pub fn since(self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        self.window().map(|w| now - w)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "alltime" => Ok(Period::Alltime),
            other => Err(AppError::validation(format!(
                "Invalid period {other:?}, expected daily, weekly or alltime"
            ))),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ScoreRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub score: f64,
    pub period: String,
    pub achieved_at: OffsetDateTime,
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub score: f64,
    pub period: Period,
    #[serde(with = "time::serde::rfc3339")]
    pub achieved_at: OffsetDateTime,
}

impl TryFrom<ScoreRow> for ScoreEntry {
    type Error = AppError;

    fn try_from(r: ScoreRow) -> Result<Self, Self::Error> {
        let period = r
            .period
            .parse::<Period>()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("stored period {:?} is invalid", r.period)))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            username: r.username,
            score: r.score,
            period,
            achieved_at: r.achieved_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_only_known_tags() {
        for p in Period::ALL {
            assert_eq!(p.as_str().parse::<Period>().unwrap(), p);
        }
        assert!(matches!("monthly".parse::<Period>(), Err(AppError::Validation(_))));
        assert!(matches!("Daily".parse::<Period>(), Err(AppError::Validation(_))));
    }

    #[test]
    fn period_windows() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(Period::Daily.since(now), Some(now - Duration::hours(24)));
        assert_eq!(Period::Weekly.since(now), Some(now - Duration::days(7)));
        assert_eq!(Period::Alltime.since(now), None);
    }

    #[test]
    fn entry_serializes_period_and_rfc3339_time() {
        let entry = ScoreEntry {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            username: "ann".into(),
            score: 42.0,
            period: Period::Weekly,
            achieved_at: time::macros::datetime!(2024-05-01 12:00 UTC),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["period"], "weekly");
        assert_eq!(json["achieved_at"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn rejects_corrupt_stored_period() {
        let row = ScoreRow {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            username: "ann".into(),
            score: 1.0,
            period: "yearly".into(),
            achieved_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(matches!(ScoreEntry::try_from(row), Err(AppError::Internal(_))));
    }
}
