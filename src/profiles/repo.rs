use anyhow::Context;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub social_links: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields to change; `None` leaves the column alone, `Some("")` clears bio/avatar.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub social_links: Option<serde_json::Value>,
}

pub async fn create_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    username: &str,
) -> anyhow::Result<Profile> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (id, username)
        VALUES ($1, $2)
        RETURNING id, username, bio, avatar_url, social_links, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(username)
    .fetch_one(&mut **tx)
    .await
    .context("insert profile")?;
    Ok(profile)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, username, bio, avatar_url, social_links, created_at, updated_at
          FROM profiles
         WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find profile by id")?;
    Ok(profile)
}

pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, username, bio, avatar_url, social_links, created_at, updated_at
          FROM profiles
         WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(db)
    .await
    .context("find profile by username")?;
    Ok(profile)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    changes: ProfileChanges,
) -> anyhow::Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles
           SET username     = COALESCE($2, username),
               bio          = CASE WHEN $3::text IS NULL THEN bio ELSE NULLIF($3, '') END,
               avatar_url   = CASE WHEN $4::text IS NULL THEN avatar_url ELSE NULLIF($4, '') END,
               social_links = COALESCE($5::jsonb, social_links),
               updated_at   = now()
         WHERE id = $1
        RETURNING id, username, bio, avatar_url, social_links, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(changes.username)
    .bind(changes.bio)
    .bind(changes.avatar_url)
    .bind(changes.social_links)
    .fetch_optional(db)
    .await
    .context("update profile")?;
    Ok(profile)
}
