use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub generation_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct FlagRow {
    pub id: Uuid,
    pub generation_id: Uuid,
    pub reason: String,
    pub created_at: OffsetDateTime,
}

// ---- likes ----

pub async fn like_count(db: &PgPool, generation_id: Uuid) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE generation_id = $1")
        .bind(generation_id)
        .fetch_one(db)
        .await
        .context("count likes")?;
    Ok(count)
}

pub async fn has_liked(db: &PgPool, generation_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let liked: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM likes WHERE generation_id = $1 AND user_id = $2)",
    )
    .bind(generation_id)
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("check like")?;
    Ok(liked)
}

/// Unlikes when a like exists, likes otherwise. Returns the new state and the
/// count as seen inside the same transaction.
pub async fn toggle_like(
    db: &PgPool,
    generation_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<(bool, i64)> {
    let mut tx = db.begin().await.context("begin tx")?;

    let removed = sqlx::query("DELETE FROM likes WHERE generation_id = $1 AND user_id = $2")
        .bind(generation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("delete like")?
        .rows_affected();

    let liked = if removed > 0 {
        false
    } else {
        sqlx::query(
            r#"
            INSERT INTO likes (generation_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (generation_id, user_id) DO NOTHING
            "#,
        )
        .bind(generation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("insert like")?;
        true
    };

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE generation_id = $1")
        .bind(generation_id)
        .fetch_one(&mut *tx)
        .await
        .context("count likes")?;

    tx.commit().await.context("commit tx")?;
    Ok((liked, count))
}

// ---- comments ----

/// Oldest first.
pub async fn list_comments(db: &PgPool, generation_id: Uuid) -> anyhow::Result<Vec<CommentRow>> {
    let rows = sqlx::query_as::<_, CommentRow>(
        r#"
        SELECT c.id, c.generation_id, c.user_id, c.content, c.created_at,
               p.username, p.avatar_url
          FROM comments c
          JOIN profiles p ON p.id = c.user_id
         WHERE c.generation_id = $1
         ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(generation_id)
    .fetch_all(db)
    .await
    .context("list comments")?;
    Ok(rows)
}

pub async fn insert_comment(
    db: &PgPool,
    generation_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> anyhow::Result<CommentRow> {
    let row = sqlx::query_as::<_, CommentRow>(
        r#"
        WITH inserted AS (
            INSERT INTO comments (generation_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, generation_id, user_id, content, created_at
        )
        SELECT i.id, i.generation_id, i.user_id, i.content, i.created_at,
               p.username, p.avatar_url
          FROM inserted i
          JOIN profiles p ON p.id = i.user_id
        "#,
    )
    .bind(generation_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(db)
    .await
    .context("insert comment")?;
    Ok(row)
}

// ---- flags ----

pub async fn insert_flag(
    db: &PgPool,
    generation_id: Uuid,
    user_id: Uuid,
    reason: &str,
) -> anyhow::Result<FlagRow> {
    let row = sqlx::query_as::<_, FlagRow>(
        r#"
        INSERT INTO flags (generation_id, user_id, reason)
        VALUES ($1, $2, $3)
        RETURNING id, generation_id, reason, created_at
        "#,
    )
    .bind(generation_id)
    .bind(user_id)
    .bind(reason)
    .fetch_one(db)
    .await
    .context("insert flag")?;
    Ok(row)
}
