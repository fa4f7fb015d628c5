use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::Claims, jwt::JwtKeys};
use crate::error::AppError;

/// Extracts and validates an access JWT, returning the user ID.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

/// Like [`AuthUser`], but also carries the session the token belongs to.
#[derive(Debug)]
pub struct CurrentSession {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

/// `None` for anonymous requests; a present but invalid token is still rejected.
#[derive(Debug)]
pub struct MaybeAuthUser(pub Option<Uuid>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid Authorization header"))?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(Some)
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))
}

fn access_claims(keys: &JwtKeys, token: &str) -> Result<Claims, AppError> {
    keys.verify_access(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::unauthorized("Invalid or expired token")
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;
        let claims = access_claims(&JwtKeys::from_ref(state), token)?;
        Ok(CurrentSession {
            user_id: claims.sub,
            session_id: claims.sid,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = CurrentSession::from_request_parts(parts, state).await?;
        Ok(AuthUser(session.user_id))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            None => Ok(MaybeAuthUser(None)),
            Some(token) => {
                let claims = access_claims(&JwtKeys::from_ref(state), token)?;
                Ok(MaybeAuthUser(Some(claims.sub)))
            }
        }
    }
}
