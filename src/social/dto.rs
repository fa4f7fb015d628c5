use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{CommentRow, FlagRow};
use crate::generations::dto::Author;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewComment {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub generation_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: Author,
}

impl From<CommentRow> for CommentResponse {
    fn from(r: CommentRow) -> Self {
        Self {
            id: r.id,
            generation_id: r.generation_id,
            user_id: r.user_id,
            content: r.content,
            created_at: r.created_at,
            author: Author {
                username: r.username,
                avatar_url: r.avatar_url,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NewFlag {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FlagResponse {
    pub id: Uuid,
    pub generation_id: Uuid,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<FlagRow> for FlagResponse {
    fn from(r: FlagRow) -> Self {
        Self {
            id: r.id,
            generation_id: r.generation_id,
            reason: r.reason,
            created_at: r.created_at,
        }
    }
}
