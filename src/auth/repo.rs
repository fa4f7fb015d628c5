use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub expires_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut **tx)
        .await
        .context("insert user")?;
        Ok(user)
    }
}

impl Session {
    /// Also prunes the user's expired sessions so the table stays bounded.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<Session> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= now()")
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .context("prune expired sessions")?;

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, expires_at)
            VALUES ($1, $2)
            RETURNING id, expires_at
            "#,
        )
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&mut **tx)
        .await
        .context("insert session")?;
        Ok(session)
    }

    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<Session> {
        let mut tx = db.begin().await.context("begin tx")?;
        let session = Self::create_tx(&mut tx, user_id, expires_at).await?;
        tx.commit().await.context("commit tx")?;
        Ok(session)
    }

    /// Session that belongs to `user_id` and hasn't expired yet.
    pub async fn find_active(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, expires_at
            FROM sessions
            WHERE id = $1 AND user_id = $2 AND expires_at > now()
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find active session")?;
        Ok(session)
    }

    /// Pushes out the expiry of a still-active session. `None` when it has
    /// ended or expired, checked in the same statement as the update.
    pub async fn extend(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
               SET expires_at = $3
             WHERE id = $1 AND user_id = $2 AND expires_at > now()
            RETURNING id, expires_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_optional(db)
        .await
        .context("extend session")?;
        Ok(session)
    }

    /// Returns false when there was no such session.
    pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM sessions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await
            .context("delete session")?;
        Ok(res.rows_affected() > 0)
    }
}
