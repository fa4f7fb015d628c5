use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{GenerationCardRow, GenerationRow};

/// What a generation produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Image,
    Video,
    Audio,
    Text,
}

impl GenerationKind {
    pub const ALL: [GenerationKind; 4] = [
        GenerationKind::Image,
        GenerationKind::Video,
        GenerationKind::Audio,
        GenerationKind::Text,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationKind::Image => "image",
            GenerationKind::Video => "video",
            GenerationKind::Audio => "audio",
            GenerationKind::Text => "text",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GenerationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown generation type '{s}'"))
    }
}

/// `?type=` on explore: one kind, or `all`.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Image,
    Video,
    Audio,
    Text,
}

impl TypeFilter {
    pub fn kind(self) -> Option<GenerationKind> {
        match self {
            TypeFilter::All => None,
            TypeFilter::Image => Some(GenerationKind::Image),
            TypeFilter::Video => Some(GenerationKind::Video),
            TypeFilter::Audio => Some(GenerationKind::Audio),
            TypeFilter::Text => Some(GenerationKind::Text),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExploreTab {
    #[default]
    Trending,
    Recent,
    Popular,
}

#[derive(Debug, Deserialize)]
pub struct ExploreQuery {
    #[serde(default)]
    pub tab: ExploreTab,
    #[serde(default, rename = "type")]
    pub type_filter: TypeFilter,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGenerationRequest {
    #[serde(rename = "type")]
    pub kind: GenerationKind,
    pub prompt: String,
    #[serde(default = "default_public")]
    pub public: bool,
}
fn default_public() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub public: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: GenerationKind,
    pub prompt: String,
    pub asset_url: String,
    pub thumbnail_url: Option<String>,
    pub public: bool,
    pub status: String,
    pub metadata: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TryFrom<GenerationRow> for GenerationResponse {
    type Error = anyhow::Error;

    fn try_from(r: GenerationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            kind: r.kind.parse()?,
            prompt: r.prompt,
            asset_url: r.asset_url,
            thumbnail_url: r.thumbnail_url,
            public: r.public,
            status: r.status,
            metadata: r.metadata,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Author {
    pub username: String,
    pub avatar_url: Option<String>,
}

/// A generation as shown in lists: author and aggregated counts included.
#[derive(Debug, Serialize)]
pub struct GenerationCard {
    #[serde(flatten)]
    pub generation: GenerationResponse,
    pub author: Author,
    pub like_count: i64,
    pub comment_count: i64,
}

impl TryFrom<GenerationCardRow> for GenerationCard {
    type Error = anyhow::Error;

    fn try_from(r: GenerationCardRow) -> Result<Self, Self::Error> {
        Ok(Self {
            author: Author {
                username: r.username,
                avatar_url: r.avatar_url,
            },
            like_count: r.like_count,
            comment_count: r.comment_count,
            generation: r.generation.try_into()?,
        })
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub images: usize,
    pub videos: usize,
    pub audio: usize,
    pub texts: usize,
    pub total_likes: i64,
    pub total_comments: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub generations: Vec<GenerationCard>,
}

#[derive(Debug, Serialize)]
pub struct GenerationDetail {
    #[serde(flatten)]
    pub card: GenerationCard,
    pub liked_by_me: bool,
    pub is_owner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_column_values() {
        for kind in GenerationKind::ALL {
            assert_eq!(kind.as_str().parse::<GenerationKind>().unwrap(), kind);
        }
        assert!("Image".parse::<GenerationKind>().is_err());
        assert!("gif".parse::<GenerationKind>().is_err());
    }

    #[test]
    fn create_request_defaults_to_public() {
        let body = r#"{"type":"audio","prompt":"uplifting orchestral music"}"#;
        let req: CreateGenerationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.kind, GenerationKind::Audio);
        assert!(req.public);
    }

    #[test]
    fn type_filter_maps_to_kind() {
        assert_eq!(TypeFilter::All.kind(), None);
        assert_eq!(TypeFilter::Text.kind(), Some(GenerationKind::Text));
        assert_eq!(ExploreTab::default(), ExploreTab::Trending);
    }
}
