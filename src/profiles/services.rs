use lazy_static::lazy_static;
use regex::Regex;

use super::{dto::UpdateProfileRequest, repo::ProfileChanges};
use crate::error::{AppError, AppResult};

pub const MAX_BIO_LEN: usize = 500;
pub const MAX_URL_LEN: usize = 2048;

pub fn validate_username(username: &str) -> AppResult<()> {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{3,30}$").unwrap();
    }
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(AppError::bad_request(
            "Username must be 3-30 characters of letters, digits or underscores",
        ))
    }
}

fn validate_url(url: &str, field: &str) -> AppResult<()> {
    if url.len() > MAX_URL_LEN || !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::bad_request(format!("{field} must be an http(s) URL")));
    }
    Ok(())
}

fn validate_social_links(links: &serde_json::Value) -> AppResult<()> {
    let Some(map) = links.as_object() else {
        return Err(AppError::bad_request("social_links must be an object"));
    };
    for (name, value) in map {
        let url = value
            .as_str()
            .ok_or_else(|| {
                AppError::bad_request(format!("social link '{name}' must be a string"))
            })?;
        validate_url(url, &format!("social link '{name}'"))?;
    }
    Ok(())
}

/// Trims and validates an edit request, turning it into column changes.
pub fn prepare_changes(req: UpdateProfileRequest) -> AppResult<ProfileChanges> {
    let username = match req.username {
        Some(name) => {
            let name = name.trim().to_string();
            validate_username(&name)?;
            Some(name)
        }
        None => None,
    };

    let bio = req.bio.map(|b| b.trim().to_string());
    if let Some(b) = &bio {
        if b.chars().count() > MAX_BIO_LEN {
            return Err(AppError::bad_request(format!(
                "Bio must be at most {MAX_BIO_LEN} characters"
            )));
        }
    }

    let avatar_url = req.avatar_url.map(|u| u.trim().to_string());
    if let Some(u) = avatar_url.as_deref().filter(|u| !u.is_empty()) {
        validate_url(u, "avatar_url")?;
    }

    if let Some(links) = &req.social_links {
        validate_social_links(links)?;
    }

    Ok(ProfileChanges {
        username,
        bio,
        avatar_url,
        social_links: req.social_links,
    })
}
