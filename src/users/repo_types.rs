use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Subscription tier of an account. New accounts start on `starter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "subscription", rename_all = "lowercase")]
pub enum Subscription {
    Starter,
    Pro,
    Business,
}

impl Default for Subscription {
    fn default() -> Self {
        Subscription::Starter
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub avatar_url: String,
    pub subscription: Subscription,
    pub token: Option<String>, // session token, present only while logged in
    pub verified: bool,
    pub verification_token: String, // sentinel once consumed, never blank
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod repo_type_tests {
    use super::*;

    #[test]
    fn password_hash_never_serializes() {
        let user = User {
            id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            avatar_url: "/avatars/a.png".into(),
            subscription: Subscription::default(),
            token: None,
            verified: false,
            verification_token: "tok".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains("alice@example.com"));
    }

    #[test]
    fn subscription_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Subscription::Starter).unwrap(),
            "\"starter\""
        );
        assert_eq!(
            serde_json::to_string(&Subscription::Business).unwrap(),
            "\"business\""
        );
    }
}
