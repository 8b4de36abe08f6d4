use std::time::Duration;

use anyhow::{bail, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown STORAGE_BACKEND {other:?}, expected postgres or memory"),
        }
    }
}

/// Policy for the "current players" snapshot.
///
/// Only the `scan_limit` most recently active sessions are considered, and of
/// those only sessions active within `active_window`. Players outside either
/// bound are left out of the snapshot.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub active_window: Duration,
    pub scan_limit: i64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            active_window: Duration::from_secs(5 * 60),
            scan_limit: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub presence: PresenceConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let storage = match get("STORAGE_BACKEND") {
            Some(v) => v.parse()?,
            None => StorageBackend::Postgres,
        };

        let database_url = get("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when STORAGE_BACKEND=postgres");
        }

        let defaults = PresenceConfig::default();
        let window_secs = positive(&get, "PRESENCE_WINDOW_SECS")?
            .unwrap_or(defaults.active_window.as_secs() as i64);
        let scan_limit = positive(&get, "PRESENCE_SCAN_LIMIT")?.unwrap_or(defaults.scan_limit);

        Ok(Self {
            storage,
            database_url,
            presence: PresenceConfig {
                active_window: Duration::from_secs(window_secs as u64),
                scan_limit,
            },
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            presence: PresenceConfig::default(),
        }
    }
}

fn positive(get: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<i64>> {
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("{key} must be an integer, got {raw:?}"))?;
    if value <= 0 {
        bail!("{key} must be positive, got {value}");
    }
    Ok(Some(value))
}
