use sqlx::PgPool;
use uuid::Uuid;

use super::{
    dto::{DashboardStats, GenerationCard, GenerationKind},
    repo::{self, GenerationAccess},
};
use crate::error::{AppError, AppResult};

pub const MAX_PROMPT_LEN: usize = 2000;
pub const DEFAULT_EXPLORE_LIMIT: i64 = 50;
pub const MAX_EXPLORE_LIMIT: i64 = 100;

pub fn validate_prompt(prompt: &str) -> AppResult<String> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::bad_request("Please enter a prompt"));
    }
    if prompt.chars().count() > MAX_PROMPT_LEN {
        return Err(AppError::bad_request(format!(
            "Prompt must be at most {MAX_PROMPT_LEN} characters"
        )));
    }
    Ok(prompt.to_string())
}

/// Private generations are only visible to their owner.
pub fn can_view(access: &GenerationAccess, viewer: Option<Uuid>) -> bool {
    access.public || viewer == Some(access.user_id)
}

/// Loads a generation the viewer may see; hidden ones look missing.
pub async fn require_visible(
    db: &PgPool,
    id: Uuid,
    viewer: Option<Uuid>,
) -> AppResult<GenerationAccess> {
    match repo::find_access(db, id).await? {
        Some(access) if can_view(&access, viewer) => Ok(access),
        _ => Err(AppError::not_found("Generation")),
    }
}

pub async fn require_owner(db: &PgPool, id: Uuid, user_id: Uuid) -> AppResult<GenerationAccess> {
    let access = require_visible(db, id, Some(user_id)).await?;
    if access.user_id != user_id {
        return Err(AppError::Forbidden(
            "Only the owner can modify this generation".into(),
        ));
    }
    Ok(access)
}

/// Case-insensitive substring pattern for ILIKE with `\` as escape; `None` for blank input.
pub fn like_pattern(query: Option<&str>) -> Option<String> {
    let q = query?.trim();
    if q.is_empty() {
        return None;
    }
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for ch in q.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_EXPLORE_LIMIT)
        .clamp(1, MAX_EXPLORE_LIMIT)
}

pub fn compute_stats(cards: &[GenerationCard]) -> DashboardStats {
    cards.iter().fold(
        DashboardStats {
            total: cards.len(),
            ..Default::default()
        },
        |mut s, c| {
            match c.generation.kind {
                GenerationKind::Image => s.images += 1,
                GenerationKind::Video => s.videos += 1,
                GenerationKind::Audio => s.audio += 1,
                GenerationKind::Text => s.texts += 1,
            }
            s.total_likes += c.like_count;
            s.total_comments += c.comment_count;
            s
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generations::dto::{Author, GenerationResponse};
    use time::OffsetDateTime;

    fn card(kind: GenerationKind, likes: i64, comments: i64) -> GenerationCard {
        GenerationCard {
            generation: GenerationResponse {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                kind,
                prompt: "p".into(),
                asset_url: "https://x/a".into(),
                thumbnail_url: None,
                public: true,
                status: "completed".into(),
                metadata: serde_json::json!({}),
                created_at: OffsetDateTime::now_utc(),
            },
            author: Author {
                username: "neo".into(),
                avatar_url: None,
            },
            like_count: likes,
            comment_count: comments,
        }
    }

    #[test]
    fn prompt_is_trimmed_and_required() {
        assert_eq!(validate_prompt("  a forest  ").unwrap(), "a forest");
        assert!(matches!(validate_prompt("   "), Err(AppError::BadRequest(_))));
        assert!(validate_prompt(&"x".repeat(MAX_PROMPT_LEN)).is_ok());
        assert!(validate_prompt(&"x".repeat(MAX_PROMPT_LEN + 1)).is_err());
    }

    #[test]
    fn visibility_rules() {
        let owner = Uuid::new_v4();
        let private = GenerationAccess {
            user_id: owner,
            public: false,
        };
        let public = GenerationAccess {
            public: true,
            ..private
        };
        assert!(can_view(&private, Some(owner)));
        assert!(!can_view(&private, Some(Uuid::new_v4())));
        assert!(!can_view(&private, None));
        assert!(can_view(&public, None));
        assert!(can_view(&public, Some(Uuid::new_v4())));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(None), None);
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(Some(" Forest ")).as_deref(), Some("%Forest%"));
        assert_eq!(like_pattern(Some("100%")).as_deref(), Some("%100\\%%"));
        assert_eq!(like_pattern(Some("a_b\\c")).as_deref(), Some("%a\\_b\\\\c%"));
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(20)), 20);
        assert_eq!(clamp_limit(Some(10_000)), 100);
    }

    #[test]
    fn stats_count_rows_by_type() {
        let cards = vec![
            card(GenerationKind::Image, 3, 1),
            card(GenerationKind::Image, 0, 0),
            card(GenerationKind::Video, 2, 4),
            card(GenerationKind::Audio, 1, 0),
            card(GenerationKind::Text, 0, 2),
        ];
        assert_eq!(
            compute_stats(&cards),
            DashboardStats {
                total: 5,
                images: 2,
                videos: 1,
                audio: 1,
                texts: 1,
                total_likes: 6,
                total_comments: 7,
            }
        );
        assert_eq!(compute_stats(&[]), DashboardStats::default());
    }
}
