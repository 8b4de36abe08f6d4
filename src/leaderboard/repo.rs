use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppResult;
use crate::leaderboard::repo_types::{Period, ScoreEntry, ScoreRow};

/// Append-only score ledger.
///
/// Rankings order by score descending, then earlier `achieved_at`, then id.
#[async_trait]
pub trait ScoreRepo: Send + Sync {
    /// Insert one entry per period, all sharing score and timestamp. Either
    /// every entry is written or none is.
    async fn insert_all_periods(
        &self,
        user_id: Uuid,
        username: &str,
        score: f64,
        achieved_at: OffsetDateTime,
    ) -> AppResult<Vec<ScoreEntry>>;

    /// Best `limit` entries of `period` achieved at or after `since`.
    async fn top(
        &self,
        period: Period,
        since: Option<OffsetDateTime>,
        limit: i64,
    ) -> AppResult<Vec<ScoreEntry>>;

    async fn best_for_user(&self, user_id: Uuid, period: Period) -> AppResult<Option<ScoreEntry>>;
}

#[derive(Clone)]
pub struct PgScoreRepo {
    db: PgPool,
}

impl PgScoreRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ScoreRepo for PgScoreRepo {
    async fn insert_all_periods(
        &self,
        user_id: Uuid,
        username: &str,
        score: f64,
        achieved_at: OffsetDateTime,
    ) -> AppResult<Vec<ScoreEntry>> {
        let mut tx = self.db.begin().await?;
        let mut entries = Vec::with_capacity(Period::ALL.len());
        for period in Period::ALL {
            let row = sqlx::query_as::<_, ScoreRow>(
                r#"
                INSERT INTO scores (id, user_id, username, score, period, achieved_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, user_id, username, score, period, achieved_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(username)
            .bind(score)
            .bind(period.as_str())
            .bind(achieved_at)
            .fetch_one(&mut *tx)
            .await?;
            entries.push(ScoreEntry::try_from(row)?);
        }
        tx.commit().await?;
        Ok(entries)
    }

    async fn top(
        &self,
        period: Period,
        since: Option<OffsetDateTime>,
        limit: i64,
    ) -> AppResult<Vec<ScoreEntry>> {
        let rows = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT id, user_id, username, score, period, achieved_at
            FROM scores
            WHERE period = $1
              AND ($2::timestamptz IS NULL OR achieved_at >= $2)
            ORDER BY score DESC, achieved_at ASC, id ASC
            LIMIT $3
            "#,
        )
        .bind(period.as_str())
        .bind(since)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(ScoreEntry::try_from).collect()
    }

    async fn best_for_user(&self, user_id: Uuid, period: Period) -> AppResult<Option<ScoreEntry>> {
        let row = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT id, user_id, username, score, period, achieved_at
            FROM scores
            WHERE user_id = $1 AND period = $2
            ORDER BY score DESC, achieved_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(period.as_str())
        .fetch_optional(&self.db)
        .await?;
        row.map(ScoreEntry::try_from).transpose()
    }
}
