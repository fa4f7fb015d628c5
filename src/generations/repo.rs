use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{ExploreTab, GenerationKind};
use crate::generator::GeneratedAsset;

/// Likes younger than this count towards the trending order.
pub const TRENDING_WINDOW_DAYS: i32 = 7;

#[derive(Debug, Clone, FromRow)]
pub struct GenerationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub prompt: String,
    pub asset_url: String,
    pub thumbnail_url: Option<String>,
    pub public: bool,
    pub status: String,
    pub metadata: serde_json::Value,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct GenerationCardRow {
    #[sqlx(flatten)]
    pub generation: GenerationRow,
    pub username: String,
    pub avatar_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
}

/// Owner and visibility of a generation, enough for access checks.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct GenerationAccess {
    pub user_id: Uuid,
    pub public: bool,
}

pub struct ExploreFilter<'a> {
    pub tab: ExploreTab,
    pub kind: Option<GenerationKind>,
    /// Already escaped ILIKE pattern.
    pub pattern: Option<&'a str>,
    pub limit: i64,
}

const GENERATION_COLUMNS: &str =
    "id, user_id, type, prompt, asset_url, thumbnail_url, public, status, metadata, created_at";

const CARD_SELECT: &str = r#"
    SELECT g.id, g.user_id, g.type, g.prompt, g.asset_url, g.thumbnail_url, g.public,
           g.status, g.metadata, g.created_at,
           p.username, p.avatar_url,
           (SELECT COUNT(*) FROM likes l WHERE l.generation_id = g.id) AS like_count,
           (SELECT COUNT(*) FROM comments c WHERE c.generation_id = g.id) AS comment_count
      FROM generations g
      JOIN profiles p ON p.id = g.user_id
"#;

fn order_clause(tab: ExploreTab) -> String {
    match tab {
        ExploreTab::Recent => "g.created_at DESC".to_string(),
        ExploreTab::Popular => "like_count DESC, g.created_at DESC".to_string(),
        ExploreTab::Trending => format!(
            "(SELECT COUNT(*) FROM likes l \
               WHERE l.generation_id = g.id \
                 AND l.created_at > now() - interval '{TRENDING_WINDOW_DAYS} days') DESC, \
             g.created_at DESC"
        ),
    }
}

pub async fn insert(
    db: &PgPool,
    user_id: Uuid,
    kind: GenerationKind,
    prompt: &str,
    public: bool,
    asset: GeneratedAsset,
) -> anyhow::Result<GenerationRow> {
    let row = sqlx::query_as::<_, GenerationRow>(&format!(
        r#"
        INSERT INTO generations
               (user_id, type, prompt, asset_url, thumbnail_url, public, status, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {GENERATION_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(kind.as_str())
    .bind(prompt)
    .bind(asset.asset_url)
    .bind(asset.thumbnail_url)
    .bind(public)
    .bind(asset.status)
    .bind(asset.metadata)
    .fetch_one(db)
    .await
    .context("insert generation")?;
    Ok(row)
}

pub async fn find_access(db: &PgPool, id: Uuid) -> anyhow::Result<Option<GenerationAccess>> {
    let row = sqlx::query_as::<_, GenerationAccess>(
        "SELECT user_id, public FROM generations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find generation access")?;
    Ok(row)
}

pub async fn find_card(db: &PgPool, id: Uuid) -> anyhow::Result<Option<GenerationCardRow>> {
    let row = sqlx::query_as::<_, GenerationCardRow>(&format!("{CARD_SELECT} WHERE g.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find generation")?;
    Ok(row)
}

/// Newest first; private rows only when `include_private`.
pub async fn list_by_owner(
    db: &PgPool,
    owner_id: Uuid,
    include_private: bool,
) -> anyhow::Result<Vec<GenerationCardRow>> {
    let rows = sqlx::query_as::<_, GenerationCardRow>(&format!(
        r#"
        {CARD_SELECT}
         WHERE g.user_id = $1
           AND (g.public OR $2)
         ORDER BY g.created_at DESC
        "#
    ))
    .bind(owner_id)
    .bind(include_private)
    .fetch_all(db)
    .await
    .context("list generations by owner")?;
    Ok(rows)
}

pub async fn explore(
    db: &PgPool,
    filter: ExploreFilter<'_>,
) -> anyhow::Result<Vec<GenerationCardRow>> {
    let order = order_clause(filter.tab);
    let rows = sqlx::query_as::<_, GenerationCardRow>(&format!(
        r#"
        {CARD_SELECT}
         WHERE g.public
           AND ($1::text IS NULL OR g.type = $1)
           AND ($2::text IS NULL
                OR g.prompt ILIKE $2 ESCAPE '\'
                OR p.username ILIKE $2 ESCAPE '\')
         ORDER BY {order}
         LIMIT $3
        "#
    ))
    .bind(filter.kind.map(GenerationKind::as_str))
    .bind(filter.pattern)
    .bind(filter.limit)
    .fetch_all(db)
    .await
    .context("explore generations")?;
    Ok(rows)
}

pub async fn set_visibility(db: &PgPool, id: Uuid, public: bool) -> anyhow::Result<GenerationRow> {
    let row = sqlx::query_as::<_, GenerationRow>(&format!(
        r#"
        UPDATE generations
           SET public = $2, updated_at = now()
         WHERE id = $1
        RETURNING {GENERATION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(public)
    .fetch_one(db)
    .await
    .context("update generation visibility")?;
    Ok(row)
}

/// Likes, comments and flags go with it via ON DELETE CASCADE.
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM generations WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete generation")?;
    Ok(res.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        generations::services::like_pattern,
        social,
        test_support::{backdate_generation, count_rows, seed_generation, seed_user, test_pool},
    };

    fn ids(rows: Vec<GenerationCardRow>) -> Vec<Uuid> {
        rows.into_iter().map(|r| r.generation.id).collect()
    }

    async fn explore_ids(db: &PgPool, tab: ExploreTab, q: Option<&str>) -> Vec<Uuid> {
        let pattern = like_pattern(q);
        let filter = ExploreFilter {
            tab,
            kind: None,
            pattern: pattern.as_deref(),
            limit: 50,
        };
        ids(explore(db, filter).await.unwrap())
    }

    async fn old_like(db: &PgPool, generation_id: Uuid, user_id: Uuid) {
        sqlx::query(
            "INSERT INTO likes (generation_id, user_id, created_at) \
             VALUES ($1, $2, now() - interval '30 days')",
        )
        .bind(generation_id)
        .bind(user_id)
        .execute(db)
        .await
        .unwrap();
    }

    #[test]
    fn every_tab_orders_differently() {
        let recent = order_clause(ExploreTab::Recent);
        let popular = order_clause(ExploreTab::Popular);
        let trending = order_clause(ExploreTab::Trending);
        assert_ne!(recent, popular);
        assert_ne!(popular, trending);
        assert_ne!(recent, trending);
        assert!(trending.contains("interval '7 days'"));
    }

    #[tokio::test]
    async fn tabs_rank_rows_differently() {
        let db = test_pool().await;
        let author = seed_user(&db, "author").await;
        let fans = [
            seed_user(&db, "fan_a").await,
            seed_user(&db, "fan_b").await,
            seed_user(&db, "fan_c").await,
        ];

        let classic = seed_generation(&db, author, GenerationKind::Image, "classic", true).await;
        let rising = seed_generation(&db, author, GenerationKind::Video, "rising", true).await;
        let fresh = seed_generation(&db, author, GenerationKind::Text, "fresh", true).await;
        backdate_generation(&db, classic, 24 * 40).await;
        backdate_generation(&db, rising, 3).await;
        backdate_generation(&db, fresh, 1).await;

        for fan in fans {
            old_like(&db, classic, fan).await;
        }
        social::repo::toggle_like(&db, rising, fans[0]).await.unwrap();

        assert_eq!(
            explore_ids(&db, ExploreTab::Recent, None).await,
            vec![fresh, rising, classic]
        );
        assert_eq!(
            explore_ids(&db, ExploreTab::Popular, None).await,
            vec![classic, rising, fresh]
        );
        assert_eq!(
            explore_ids(&db, ExploreTab::Trending, None).await,
            vec![rising, fresh, classic]
        );
    }

    #[tokio::test]
    async fn private_rows_stay_with_their_owner() {
        let db = test_pool().await;
        let owner = seed_user(&db, "owner").await;
        let shown = seed_generation(&db, owner, GenerationKind::Image, "shown", true).await;
        let hidden = seed_generation(&db, owner, GenerationKind::Image, "hidden", false).await;
        backdate_generation(&db, shown, 2).await;

        assert_eq!(ids(list_by_owner(&db, owner, false).await.unwrap()), vec![shown]);
        assert_eq!(
            ids(list_by_owner(&db, owner, true).await.unwrap()),
            vec![hidden, shown]
        );
        assert_eq!(explore_ids(&db, ExploreTab::Recent, None).await, vec![shown]);
        assert_eq!(explore_ids(&db, ExploreTab::Recent, Some("hidden")).await, Vec::<uuid::Uuid>::new());

        let card = find_card(&db, hidden).await.unwrap().unwrap();
        assert_eq!(card.username, "owner");
        assert!(!card.generation.public);
        assert!(set_visibility(&db, hidden, true).await.unwrap().public);
        assert_eq!(
            explore_ids(&db, ExploreTab::Recent, None).await,
            vec![hidden, shown]
        );
    }

    #[tokio::test]
    async fn search_matches_wildcards_literally() {
        let db = test_pool().await;
        let author = seed_user(&db, "searcher").await;
        let mut prompts = Vec::new();
        for prompt in [
            "100% cotton",
            "1000 cotton",
            "snake_case",
            "snakeXcase",
            r"C:\path",
            "C:path",
        ] {
            prompts.push(seed_generation(&db, author, GenerationKind::Text, prompt, true).await);
        }

        assert_eq!(explore_ids(&db, ExploreTab::Recent, Some("100%")).await, vec![prompts[0]]);
        assert_eq!(explore_ids(&db, ExploreTab::Recent, Some("e_c")).await, vec![prompts[2]]);
        assert_eq!(explore_ids(&db, ExploreTab::Recent, Some(r"C:\p")).await, vec![prompts[4]]);
        assert_eq!(explore_ids(&db, ExploreTab::Recent, Some("COTTON")).await.len(), 2);
        // author name matches too
        assert_eq!(explore_ids(&db, ExploreTab::Recent, Some("SEARCH")).await.len(), 6);
    }

    #[tokio::test]
    async fn delete_takes_likes_comments_and_flags_along() {
        let db = test_pool().await;
        let owner = seed_user(&db, "owner").await;
        let fan = seed_user(&db, "fan").await;
        let id = seed_generation(&db, owner, GenerationKind::Audio, "a hum", true).await;

        social::repo::toggle_like(&db, id, fan).await.unwrap();
        social::repo::insert_comment(&db, id, fan, "nice").await.unwrap();
        social::repo::insert_flag(&db, id, fan, "spam").await.unwrap();
        for table in ["likes", "comments", "flags"] {
            assert_eq!(count_rows(&db, table, id).await, 1, "{table}");
        }

        assert!(delete(&db, id).await.unwrap());
        for table in ["likes", "comments", "flags"] {
            assert_eq!(count_rows(&db, table, id).await, 0, "{table}");
        }
        assert!(find_access(&db, id).await.unwrap().is_none());
        assert!(!delete(&db, id).await.unwrap());
    }
}
