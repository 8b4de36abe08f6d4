//! In-memory stores for local runs (`STORAGE_BACKEND=memory`) and tests.
//!
//! Each collection sits behind its own `tokio::sync::Mutex`, so every
//! operation is atomic with respect to that collection. Data is lost on
//! restart.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{email_taken, NewUser, SessionRepo, UserRepo},
        repo_types::{Session, User},
    },
    error::AppResult,
    leaderboard::{
        repo::ScoreRepo,
        repo_types::{Period, ScoreEntry},
    },
};

// ===== MemoryUserRepo =====

#[derive(Clone, Default)]
pub struct MemoryUserRepo {
    users: Arc<Mutex<Vec<User>>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser) -> AppResult<User> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email == new.email) {
            return Err(email_taken());
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: new.created_at,
        };
        users.push(user.clone());
        Ok(user)
    }
}

// ===== MemorySessionRepo =====

#[derive(Clone, Default)]
pub struct MemorySessionRepo {
    sessions: Arc<Mutex<Vec<Session>>>,
}

impl MemorySessionRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepo for MemorySessionRepo {
    async fn create(&self, user_id: Uuid, token: &str, now: OffsetDateTime) -> AppResult<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            created_at: now,
            last_seen_at: Some(now),
        };
        self.sessions.lock().await.push(session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Session>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.iter().find(|s| s.token == token).cloned())
    }

    async fn touch(&self, token: &str, now: OffsetDateTime) -> AppResult<bool> {
        let mut sessions = self.sessions.lock().await;
        match sessions.iter_mut().find(|s| s.token == token) {
            Some(session) => {
                session.last_seen_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn most_recent(&self, limit: i64) -> AppResult<Vec<Session>> {
        let sessions = self.sessions.lock().await;
        // Newest insert first so equal activity times favour the later session.
        let mut recent: Vec<Session> = sessions.iter().rev().cloned().collect();
        recent.sort_by(|a, b| b.active_at().cmp(&a.active_at()));
        recent.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(recent)
    }
}

// ===== MemoryScoreRepo =====

#[derive(Clone, Default)]
pub struct MemoryScoreRepo {
    scores: Arc<Mutex<Vec<ScoreEntry>>>,
}

impl MemoryScoreRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

fn rank(entries: &mut [ScoreEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.achieved_at.cmp(&b.achieved_at))
            .then(a.id.cmp(&b.id))
    });
}

#[async_trait]
impl ScoreRepo for MemoryScoreRepo {
    async fn insert_all_periods(
        &self,
        user_id: Uuid,
        username: &str,
        score: f64,
        achieved_at: OffsetDateTime,
    ) -> AppResult<Vec<ScoreEntry>> {
        let entries: Vec<ScoreEntry> = Period::ALL
            .into_iter()
            .map(|period| ScoreEntry {
                id: Uuid::new_v4(),
                user_id,
                username: username.to_string(),
                score,
                period,
                achieved_at,
            })
            .collect();
        self.scores.lock().await.extend(entries.iter().cloned());
        Ok(entries)
    }

    async fn top(
        &self,
        period: Period,
        since: Option<OffsetDateTime>,
        limit: i64,
    ) -> AppResult<Vec<ScoreEntry>> {
        let mut matching: Vec<ScoreEntry> = self
            .scores
            .lock()
            .await
            .iter()
            .filter(|e| e.period == period && since.map_or(true, |t| e.achieved_at >= t))
            .cloned()
            .collect();
        rank(&mut matching);
        matching.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matching)
    }

    async fn best_for_user(&self, user_id: Uuid, period: Period) -> AppResult<Option<ScoreEntry>> {
        let mut matching: Vec<ScoreEntry> = self
            .scores
            .lock()
            .await
            .iter()
            .filter(|e| e.user_id == user_id && e.period == period)
            .cloned()
            .collect();
        rank(&mut matching);
        Ok(matching.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "ann".into(),
            email: email.into(),
            password_hash: "hash".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = MemoryUserRepo::new();
        repo.create(new_user("a@x.com")).await.unwrap();
        let err = repo.create(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn most_recent_orders_by_activity_and_limits() {
        let repo = MemorySessionRepo::new();
        let t0 = OffsetDateTime::now_utc();
        let user = Uuid::new_v4();
        repo.create(user, "a", t0).await.unwrap();
        repo.create(user, "b", t0 + Duration::seconds(1)).await.unwrap();
        repo.create(user, "c", t0 + Duration::seconds(2)).await.unwrap();
        repo.touch("a", t0 + Duration::seconds(5)).await.unwrap();

        let tokens: Vec<_> = repo
            .most_recent(2)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect();
        assert_eq!(tokens, ["a", "c"]);
    }

    #[tokio::test]
    async fn best_for_user_ignores_other_users_and_periods() {
        let repo = MemoryScoreRepo::new();
        let now = OffsetDateTime::now_utc();
        let ann = Uuid::new_v4();
        let bob = Uuid::new_v4();
        repo.insert_all_periods(ann, "ann", 5.0, now).await.unwrap();
        repo.insert_all_periods(ann, "ann", 8.0, now).await.unwrap();
        repo.insert_all_periods(bob, "bob", 50.0, now).await.unwrap();

        let best = repo.best_for_user(ann, Period::Alltime).await.unwrap().unwrap();
        assert_eq!(best.score, 8.0);
        assert_eq!(best.period, Period::Alltime);
        assert!(repo
            .best_for_user(Uuid::new_v4(), Period::Alltime)
            .await
            .unwrap()
            .is_none());
    }
}
