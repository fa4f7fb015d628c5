use axum::{
    extract::{Path, Query, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{
        CreateGenerationRequest, DashboardResponse, ExploreQuery, GenerationCard,
        GenerationDetail, GenerationResponse, VisibilityRequest,
    },
    repo::{self, ExploreFilter},
    services::{
        clamp_limit, compute_stats, like_pattern, require_owner, require_visible, validate_prompt,
    },
};
use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::{AppError, AppResult},
    social,
    state::AppState,
};

pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/explore", get(explore))
        .route("/generations", post(create_generation))
        .route(
            "/generations/:id",
            get(get_generation).delete(delete_generation),
        )
        .route("/generations/:id/visibility", patch(set_visibility))
}

fn into_cards(rows: Vec<repo::GenerationCardRow>) -> anyhow::Result<Vec<GenerationCard>> {
    rows.into_iter().map(TryInto::try_into).collect()
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<DashboardResponse>> {
    let generations = into_cards(repo::list_by_owner(&state.db, user_id, true).await?)?;
    let stats = compute_stats(&generations);
    Ok(Json(DashboardResponse { stats, generations }))
}

#[instrument(skip(state, payload))]
pub async fn create_generation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateGenerationRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<GenerationResponse>)> {
    let prompt = validate_prompt(&payload.prompt)?;

    let asset = state.generator.generate(payload.kind, &prompt).await?;
    let row =
        repo::insert(&state.db, user_id, payload.kind, &prompt, payload.public, asset).await?;
    let generation = GenerationResponse::try_from(row)?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/generations/{}", generation.id))
        .map_err(anyhow::Error::from)?;
    headers.insert(LOCATION, location);

    info!(
        %user_id,
        generation_id = %generation.id,
        kind = %generation.kind,
        public = generation.public,
        "generation created"
    );
    Ok((StatusCode::CREATED, headers, Json(generation)))
}

#[instrument(skip(state))]
pub async fn explore(
    State(state): State<AppState>,
    Query(query): Query<ExploreQuery>,
) -> AppResult<Json<Vec<GenerationCard>>> {
    let pattern = like_pattern(query.q.as_deref());
    let rows = repo::explore(
        &state.db,
        ExploreFilter {
            tab: query.tab,
            kind: query.type_filter.kind(),
            pattern: pattern.as_deref(),
            limit: clamp_limit(query.limit),
        },
    )
    .await?;
    Ok(Json(into_cards(rows)?))
}

#[instrument(skip(state))]
pub async fn get_generation(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GenerationDetail>> {
    require_visible(&state.db, id, viewer).await?;
    let card: GenerationCard = repo::find_card(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Generation"))?
        .try_into()?;

    let liked_by_me = match viewer {
        Some(user_id) => social::repo::has_liked(&state.db, id, user_id).await?,
        None => false,
    };
    let is_owner = viewer == Some(card.generation.user_id);

    Ok(Json(GenerationDetail {
        card,
        liked_by_me,
        is_owner,
    }))
}

#[instrument(skip(state))]
pub async fn delete_generation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_owner(&state.db, id, user_id).await?;
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Generation"));
    }
    info!(%user_id, generation_id = %id, "generation deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn set_visibility(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VisibilityRequest>,
) -> AppResult<Json<GenerationResponse>> {
    require_owner(&state.db, id, user_id).await?;
    let row = repo::set_visibility(&state.db, id, payload.public).await?;
    info!(%user_id, generation_id = %id, public = payload.public, "visibility changed");
    Ok(Json(GenerationResponse::try_from(row)?))
}
