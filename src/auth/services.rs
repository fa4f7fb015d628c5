use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use uuid::Uuid;

use super::{dto::TokenPair, jwt::JwtKeys};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Username handed out when sign-up doesn't supply one, e.g. `user_k3f9x0a`.
pub(crate) fn default_username() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("user_{suffix}")
}

pub(crate) fn issue_tokens(
    keys: &JwtKeys,
    user_id: Uuid,
    session_id: Uuid,
) -> anyhow::Result<TokenPair> {
    Ok(TokenPair {
        access_token: keys.sign_access(user_id, session_id)?,
        refresh_token: keys.sign_refresh(user_id, session_id)?,
    })
}
