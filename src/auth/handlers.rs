use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest,
            SessionResponse,
        },
        extractors::{AuthUser, CurrentSession},
        jwt::JwtKeys,
        password::{hash_password, verify_against_dummy, verify_password, MIN_PASSWORD_LEN},
        repo::{Session, User},
        services::{default_username, is_valid_email, issue_tokens, normalize_email},
    },
    error::{is_unique_violation, AppError, AppResult},
    profiles::{self, services::validate_username},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/session", get(get_session))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn validate_registration(payload: &mut RegisterRequest) -> AppResult<String> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::bad_request("Password too short"));
    }

    let username = match payload.username.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default_username(),
    };
    validate_username(&username)?;
    Ok(username)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let username = validate_registration(&mut payload)?;

    // Ensure email is not taken
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        AppError::Internal(e)
    })?;

    let keys = JwtKeys::from_ref(&state);
    let mut tx = state.db.begin().await?;
    let created = async {
        let user = User::create_tx(&mut tx, &payload.email, &hash).await?;
        let profile = profiles::repo::create_tx(&mut tx, user.id, &username).await?;
        let session = Session::create_tx(&mut tx, user.id, keys.session_expiry()).await?;
        anyhow::Ok((user, profile, session))
    }
    .await;

    let (user, profile, session) = match created {
        Ok(rows) => rows,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, %username, "email or username already taken");
            return Err(AppError::Conflict("Email or username already taken".into()));
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;

    let tokens = issue_tokens(&keys, user.id, session.id)?;

    info!(user_id = %user.id, email = %user.email, username = %profile.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            tokens,
            user: PublicUser {
                id: user.id,
                email: user.email,
                username: profile.username,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        verify_against_dummy(&payload.password);
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let profile = profiles::repo::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile"))?;

    let keys = JwtKeys::from_ref(&state);
    let session = Session::create(&state.db, user.id, keys.session_expiry()).await?;
    let tokens = issue_tokens(&keys, user.id, session.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        tokens,
        user: PublicUser {
            id: user.id,
            email: user.email,
            username: profile.username,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        AppError::unauthorized("Invalid or expired refresh token")
    })?;

    let Some(session) =
        Session::extend(&state.db, claims.sid, claims.sub, keys.session_expiry()).await?
    else {
        warn!(user_id = %claims.sub, session_id = %claims.sid, "refresh for ended session");
        return Err(AppError::unauthorized("Session has ended"));
    };

    let (user, profile) = load_user(&state, claims.sub).await?;
    let tokens = issue_tokens(&keys, user.id, session.id)?;

    Ok(Json(AuthResponse {
        tokens,
        user: PublicUser {
            id: user.id,
            email: user.email,
            username: profile.username,
        },
    }))
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    current: CurrentSession,
) -> AppResult<Json<SessionResponse>> {
    let session = Session::find_active(&state.db, current.session_id, current.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Session has ended"))?;
    let (user, profile) = load_user(&state, current.user_id).await?;

    Ok(Json(SessionResponse {
        session_id: session.id,
        expires_at: session.expires_at,
        user: PublicUser {
            id: user.id,
            email: user.email,
            username: profile.username.clone(),
        },
        profile: profile.into(),
    }))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentSession,
) -> AppResult<StatusCode> {
    let ended = Session::delete(&state.db, current.session_id, current.user_id).await?;
    info!(user_id = %current.user_id, session_id = %current.session_id, ended, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let (user, profile) = load_user(&state, user_id).await?;
    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
        username: profile.username,
    }))
}

async fn load_user(
    state: &AppState,
    user_id: uuid::Uuid,
) -> AppResult<(User, profiles::repo::Profile)> {
    let user = User::find_by_id(&state.db, user_id).await?.ok_or_else(|| {
        error!(%user_id, "user not found");
        AppError::unauthorized("User not found")
    })?;
    let profile = profiles::repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile"))?;
    Ok((user, profile))
}
