use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Session, User};
use crate::error::{AppError, AppResult};

/// Fields of a user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// Credential store: users keyed by id and by normalized email.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Insert a user. Fails with `AppError::Conflict` if the email is taken.
    async fn create(&self, new: NewUser) -> AppResult<User>;
}

/// Session store: bearer tokens keyed by token.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn create(&self, user_id: Uuid, token: &str, now: OffsetDateTime) -> AppResult<Session>;

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Session>>;

    /// Set `last_seen_at` to `now`. Returns false if no session has this token.
    async fn touch(&self, token: &str, now: OffsetDateTime) -> AppResult<bool>;

    /// The `limit` most recently active sessions, most recent first.
    async fn most_recent(&self, limit: i64) -> AppResult<Vec<Session>>;
}

pub(crate) fn email_taken() -> AppError {
    AppError::Conflict("Email already exists".into())
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> AppResult<User> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.created_at)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            // Lost a signup race against the same email.
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(email_taken()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Clone)]
pub struct PgSessionRepo {
    db: PgPool,
}

impl PgSessionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRepo for PgSessionRepo {
    async fn create(&self, user_id: Uuid, token: &str, now: OffsetDateTime) -> AppResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, token, created_at, last_seen_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, user_id, token, created_at, last_seen_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(session)
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token, created_at, last_seen_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(session)
    }

    async fn touch(&self, token: &str, now: OffsetDateTime) -> AppResult<bool> {
        let res = sqlx::query(r#"UPDATE sessions SET last_seen_at = $2 WHERE token = $1"#)
            .bind(token)
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn most_recent(&self, limit: i64) -> AppResult<Vec<Session>> {
        let rows = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token, created_at, last_seen_at
            FROM sessions
            ORDER BY COALESCE(last_seen_at, created_at) DESC, created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
