use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo_types::{Subscription, User};
use crate::users::services::VERIFICATION_TOKEN_CONSUMED;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, avatar_url, subscription, token,
                   verified, verification_token, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, avatar_url, subscription, token,
                   verified, verification_token, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find the unverified holder of a verification token. Verified rows all
    /// share the consumed sentinel, so they must never match here.
    pub async fn find_by_verification_token(
        db: &PgPool,
        verification_token: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, avatar_url, subscription, token,
                   verified, verification_token, created_at
            FROM users
            WHERE verification_token = $1 AND NOT verified
            "#,
        )
        .bind(verification_token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new, unverified user with a hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        avatar_url: &str,
        subscription: Subscription,
        verification_token: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, avatar_url, subscription, verification_token)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, avatar_url, subscription, token,
                      verified, verification_token, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(avatar_url)
        .bind(subscription)
        .bind(verification_token)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Set or clear the stored session token. Returns the updated row, or
    /// `None` if the user no longer exists.
    pub async fn set_session_token(
        db: &PgPool,
        id: Uuid,
        token: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET token = $2
            WHERE id = $1
            RETURNING id, email, password_hash, avatar_url, subscription, token,
                      verified, verification_token, created_at
            "#,
        )
        .bind(id)
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_avatar_url(
        db: &PgPool,
        id: Uuid,
        avatar_url: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET avatar_url = $2
            WHERE id = $1
            RETURNING id, email, password_hash, avatar_url, subscription, token,
                      verified, verification_token, created_at
            "#,
        )
        .bind(id)
        .bind(avatar_url)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Flip the verified flag and burn the verification token. The sentinel
    /// is non-empty and can never collide with a freshly issued token, so a
    /// consumed link cannot verify twice.
    pub async fn consume_verification(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET verified = TRUE, verification_token = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(VERIFICATION_TOKEN_CONSUMED)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Remove a user row. Only used to compensate a registration whose
    /// verification email could not be delivered.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
