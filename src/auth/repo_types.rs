use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,                     // unique user ID
    pub username: String,             // display name, trimmed
    pub email: String,                // lowercased, unique
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime,   // creation timestamp
}

/// Bearer session. Sessions never expire and are never deleted.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub created_at: OffsetDateTime,
    pub last_seen_at: Option<OffsetDateTime>,
}

impl Session {
    /// Last time the session was seen, or its creation time if never touched.
    pub fn active_at(&self) -> OffsetDateTime {
        self.last_seen_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serialization_skips_hash_and_session_falls_back_to_creation() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: "ann".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@x.com");

        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            token: "t".into(),
            created_at: now,
            last_seen_at: None,
        };
        assert_eq!(session.active_at(), now);
    }
}
