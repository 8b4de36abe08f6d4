use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest, TouchResponse},
        password::{burn_verification, hash_password, verify_password},
        repo::{email_taken, NewUser},
        repo_types::User,
    },
    error::{AppError, AppResult},
    state::AppState,
};

const TOKEN_BYTES: usize = 32;
const MIN_USERNAME_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 256-bit session token from the OS CSPRNG, hex-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

async fn open_session(state: &AppState, user: User, now: OffsetDateTime) -> AppResult<AuthResponse> {
    let session = state.sessions.create(user.id, &generate_token(), now).await?;
    debug!(user_id = %user.id, session_id = %session.id, "session opened");
    Ok(AuthResponse {
        success: true,
        session_token: session.token,
        user: user.into(),
    })
}

pub async fn signup(state: &AppState, req: SignupRequest, now: OffsetDateTime) -> AppResult<AuthResponse> {
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);

    if username.chars().count() < MIN_USERNAME_CHARS {
        return Err(AppError::validation("Username must be at least 2 characters"));
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::validation("Password must be at least 6 characters"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(email_taken());
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .users
        .create(NewUser {
            username,
            email,
            password_hash,
            created_at: now,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    open_session(state, user, now).await
}

pub async fn login(state: &AppState, req: LoginRequest, now: OffsetDateTime) -> AppResult<AuthResponse> {
    let email = normalize_email(&req.email);

    let Some(user) = state.users.find_by_email(&email).await? else {
        burn_verification(&req.password);
        warn!(email = %email, "login unknown email");
        return Err(AppError::invalid_credentials());
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::invalid_credentials());
    }

    info!(user_id = %user.id, "user logged in");
    open_session(state, user, now).await
}

/// Resolve a token to its user. Unknown tokens and dangling sessions are `None`.
pub async fn resolve_user(state: &AppState, token: &str) -> AppResult<Option<User>> {
    let Some(session) = state.sessions.find_by_token(token).await? else {
        return Ok(None);
    };
    let user = state.users.find_by_id(session.user_id).await?;
    if user.is_none() {
        warn!(session_id = %session.id, user_id = %session.user_id, "session references missing user");
    }
    Ok(user)
}

pub async fn session_user(state: &AppState, token: &str) -> AppResult<Option<PublicUser>> {
    Ok(resolve_user(state, token).await?.map(PublicUser::from))
}

pub async fn touch_session(state: &AppState, token: &str, now: OffsetDateTime) -> AppResult<TouchResponse> {
    let ok = state.sessions.touch(token, now).await?;
    Ok(TouchResponse { ok })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use uuid::Uuid;

    fn signup_req(username: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn tokens_are_long_hex_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
    }

    #[tokio::test]
    async fn signup_then_login_returns_same_user() {
        let state = AppState::in_memory();
        let now = OffsetDateTime::now_utc();

        let created = signup(&state, signup_req(" ann ", "A@x.com", "secret1"), now)
            .await
            .unwrap();
        assert!(created.success);
        assert_eq!(created.user.username, "ann");
        assert_eq!(created.user.email, "a@x.com");

        let logged_in = login(&state, login_req("a@x.com", "secret1"), now).await.unwrap();
        assert_eq!(logged_in.user.id, created.user.id);
        assert_ne!(logged_in.session_token, created.session_token);

        let owner = session_user(&state, &created.session_token).await.unwrap();
        assert_eq!(owner.map(|u| u.id), Some(created.user.id));
    }

    #[tokio::test]
    async fn login_keeps_previous_sessions_valid() {
        let state = AppState::in_memory();
        let now = OffsetDateTime::now_utc();
        let first = signup(&state, signup_req("ann", "a@x.com", "secret1"), now).await.unwrap();
        let second = login(&state, login_req("A@X.COM ", "secret1"), now).await.unwrap();

        assert!(session_user(&state, &first.session_token).await.unwrap().is_some());
        assert!(session_user(&state, &second.session_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let state = AppState::in_memory();
        let now = OffsetDateTime::now_utc();
        signup(&state, signup_req("ann", "a@x.com", "secret1"), now).await.unwrap();

        let err = signup(&state, signup_req("bob", "  A@X.com", "other-pass"), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let state = AppState::in_memory();
        let now = OffsetDateTime::now_utc();

        let short_name = signup(&state, signup_req("  a ", "a@x.com", "secret1"), now).await;
        assert!(matches!(short_name, Err(AppError::Validation(_))));

        let short_pass = signup(&state, signup_req("ann", "a@x.com", "12345"), now).await;
        assert!(matches!(short_pass, Err(AppError::Validation(_))));

        let bad_email = signup(&state, signup_req("ann", "nope", "secret1"), now).await;
        assert!(matches!(bad_email, Err(AppError::Validation(_))));

        // Nothing was written by the failed attempts.
        let ok = signup(&state, signup_req("ann", "a@x.com", "secret1"), now).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() {
        let state = AppState::in_memory();
        let now = OffsetDateTime::now_utc();
        signup(&state, signup_req("ann", "a@x.com", "secret1"), now).await.unwrap();

        let wrong = login(&state, login_req("a@x.com", "secret2"), now).await.unwrap_err();
        let missing = login(&state, login_req("who@x.com", "secret1"), now).await.unwrap_err();

        assert!(matches!(wrong, AppError::Auth(_)));
        assert!(matches!(missing, AppError::Auth(_)));
        assert_eq!(wrong.to_string(), missing.to_string());
        assert_eq!(wrong.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn unknown_token_has_no_user() {
        let state = AppState::in_memory();
        assert!(session_user(&state, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dangling_session_resolves_to_none() {
        let state = AppState::in_memory();
        let now = OffsetDateTime::now_utc();
        let session = state.sessions.create(Uuid::new_v4(), "orphan", now).await.unwrap();

        assert!(session_user(&state, &session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn touch_updates_last_seen() {
        let state = AppState::in_memory();
        let t0 = OffsetDateTime::now_utc() - Duration::minutes(10);
        let created = signup(&state, signup_req("ann", "a@x.com", "secret1"), t0).await.unwrap();

        let t1 = t0 + Duration::minutes(3);
        let res = touch_session(&state, &created.session_token, t1).await.unwrap();
        assert_eq!(res, TouchResponse { ok: true });

        let session = state
            .sessions
            .find_by_token(&created.session_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.created_at, t0);
        assert_eq!(session.last_seen_at, Some(t1));
    }

    #[tokio::test]
    async fn touch_unknown_token_is_not_ok_and_writes_nothing() {
        let state = AppState::in_memory();
        let t0 = OffsetDateTime::now_utc();
        let created = signup(&state, signup_req("ann", "a@x.com", "secret1"), t0).await.unwrap();

        let res = touch_session(&state, "not-a-token", t0 + Duration::hours(1)).await.unwrap();
        assert_eq!(res, TouchResponse { ok: false });

        let recent = state.sessions.most_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].token, created.session_token);
        assert_eq!(recent[0].active_at(), t0);
    }
}
