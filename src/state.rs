use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::repo::{PgSessionRepo, PgUserRepo, SessionRepo, UserRepo};
use crate::config::{AppConfig, StorageBackend};
use crate::db;
use crate::leaderboard::repo::{PgScoreRepo, ScoreRepo};
use crate::memory::{MemoryScoreRepo, MemorySessionRepo, MemoryUserRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub sessions: Arc<dyn SessionRepo>,
    pub scores: Arc<dyn ScoreRepo>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        match config.storage {
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;
                let pool = db::connect(&url).await?;
                db::migrate(&pool).await;
                Ok(Self::from_pool(pool, config))
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on restart");
                Ok(Self::in_memory_with(config))
            }
        }
    }

    pub fn from_pool(db: PgPool, config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(PgUserRepo::new(db.clone())),
            sessions: Arc::new(PgSessionRepo::new(db.clone())),
            scores: Arc::new(PgScoreRepo::new(db)),
        }
    }

    pub fn in_memory_with(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(MemoryUserRepo::new()),
            sessions: Arc::new(MemorySessionRepo::new()),
            scores: Arc::new(MemoryScoreRepo::new()),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::in_memory_with(AppConfig::in_memory())
    }
}
