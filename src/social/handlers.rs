use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CommentResponse, FlagResponse, LikeState, NewComment},
    repo,
    services::{flag_reason, parse_flag_body, validate_comment},
};
use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::{AppError, AppResult},
    generations::services::require_visible,
    state::AppState,
};

pub fn social_routes() -> Router<AppState> {
    Router::new()
        .route("/generations/:id/like", get(like_status).post(toggle_like))
        .route(
            "/generations/:id/comments",
            get(list_comments).post(add_comment),
        )
        .route("/generations/:id/flag", post(flag_generation))
}

#[instrument(skip(state))]
pub async fn like_status(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LikeState>> {
    require_visible(&state.db, id, viewer).await?;
    let liked = match viewer {
        Some(user_id) => repo::has_liked(&state.db, id, user_id).await?,
        None => false,
    };
    let like_count = repo::like_count(&state.db, id).await?;
    Ok(Json(LikeState { liked, like_count }))
}

#[instrument(skip(state))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LikeState>> {
    require_visible(&state.db, id, Some(user_id)).await?;
    let (liked, like_count) = repo::toggle_like(&state.db, id, user_id).await?;
    info!(%user_id, generation_id = %id, liked, like_count, "like toggled");
    Ok(Json(LikeState { liked, like_count }))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    require_visible(&state.db, id, viewer).await?;
    let comments = repo::list_comments(&state.db, id)
        .await?
        .into_iter()
        .map(CommentResponse::from)
        .collect();
    Ok(Json(comments))
}

#[instrument(skip(state, payload))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewComment>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let content = validate_comment(&payload.content)?;
    require_visible(&state.db, id, Some(user_id)).await?;
    let comment = repo::insert_comment(&state.db, id, user_id, &content).await?;
    info!(%user_id, generation_id = %id, comment_id = %comment.id, "comment added");
    Ok((StatusCode::CREATED, Json(comment.into())))
}

/// The body is optional; when present it must be a valid `NewFlag` document.
#[instrument(skip(state, body))]
pub async fn flag_generation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<FlagResponse>)> {
    let payload = parse_flag_body(&body)?;
    let reason = flag_reason(payload.reason.as_deref())?;

    let generation = require_visible(&state.db, id, Some(user_id)).await?;
    if generation.user_id == user_id {
        warn!(%user_id, generation_id = %id, "owner tried to flag own generation");
        return Err(AppError::bad_request("You cannot report your own generation"));
    }

    let flag = repo::insert_flag(&state.db, id, user_id, &reason).await?;
    info!(%user_id, generation_id = %id, flag_id = %flag.id, "generation flagged");
    Ok((StatusCode::CREATED, Json(flag.into())))
}
