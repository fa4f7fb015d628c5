use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{ProfilePage, ProfileResponse, UpdateProfileRequest},
    repo,
    services::prepare_changes,
};
use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::{is_unique_violation, AppError, AppResult},
    generations::{self, dto::GenerationCard},
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles/:username", get(get_profile))
        .route("/me/profile", patch(update_profile))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<ProfilePage>> {
    let profile = repo::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| AppError::not_found("Profile"))?;

    let is_owner = viewer == Some(profile.id);
    let generations = generations::repo::list_by_owner(&state.db, profile.id, is_owner)
        .await?
        .into_iter()
        .map(GenerationCard::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(ProfilePage {
        profile: profile.into(),
        is_owner,
        generations,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let changes = prepare_changes(payload)?;

    let profile = match repo::update(&state.db, user_id, changes).await {
        Ok(Some(p)) => p,
        Ok(None) => return Err(AppError::not_found("Profile")),
        Err(e) if is_unique_violation(&e) => {
            warn!(%user_id, "username already taken");
            return Err(AppError::Conflict("Username already taken".into()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(%user_id, username = %profile.username, "profile updated");
    Ok(Json(profile.into()))
}
