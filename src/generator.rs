use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::generations::dto::GenerationKind;

/// Output of a generation backend, ready to be stored on a `generations` row.
#[derive(Debug, Clone)]
pub struct GeneratedAsset {
    pub asset_url: String,
    pub thumbnail_url: Option<String>,
    pub status: &'static str,
    pub metadata: serde_json::Value,
}

#[async_trait]
pub trait AssetGenerator: Send + Sync {
    async fn generate(&self, kind: GenerationKind, prompt: &str) -> anyhow::Result<GeneratedAsset>;
}

/// Produces placeholder image links instead of invoking a model.
#[derive(Clone)]
pub struct PlaceholderGenerator {
    base: String,
}

impl PlaceholderGenerator {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, size: u32, kind: GenerationKind) -> String {
        format!(
            "{}/{size}x{size}?text={}",
            self.base,
            kind.as_str().to_uppercase()
        )
    }
}

#[async_trait]
impl AssetGenerator for PlaceholderGenerator {
    async fn generate(
        &self,
        kind: GenerationKind,
        _prompt: &str,
    ) -> anyhow::Result<GeneratedAsset> {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("format generated_at")?;
        Ok(GeneratedAsset {
            asset_url: self.url(512, kind),
            thumbnail_url: Some(self.url(256, kind)),
            status: "completed",
            metadata: json!({
                "generated_at": generated_at,
                "model": format!("{}-model-v1", kind.as_str()),
            }),
        })
    }
}
