use tracing::warn;

use super::dto::NewFlag;
use crate::error::{AppError, AppResult};

pub const MAX_COMMENT_LEN: usize = 2000;
pub const MAX_REASON_LEN: usize = 500;
pub const DEFAULT_FLAG_REASON: &str = "Inappropriate content";

pub fn validate_comment(content: &str) -> AppResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("Please enter a comment"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::bad_request(format!(
            "Comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(content.to_string())
}

pub fn flag_reason(reason: Option<&str>) -> AppResult<String> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    match reason {
        None => Ok(DEFAULT_FLAG_REASON.to_string()),
        Some(r) if r.chars().count() > MAX_REASON_LEN => Err(AppError::bad_request(format!(
            "Reason must be at most {MAX_REASON_LEN} characters"
        ))),
        Some(r) => Ok(r.to_string()),
    }
}

/// An empty (or whitespace-only) body means "no reason given".
pub fn parse_flag_body(body: &[u8]) -> AppResult<NewFlag> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(NewFlag::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "malformed flag body");
        AppError::bad_request(format!("Invalid request body: {e}"))
    })
}
