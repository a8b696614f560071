use crate::api::middleware::RequireAdmin;
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{
    ArtistRef, Credentials, PlayedArtist, RegisterUserRequest, SyncReport,
    UpdatePreferencesRequest, UserPreferences,
};
use crate::services::{SessionFactory, UserStore};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Serialize)]
struct RegisteredUser {
    user_id: String,
    playlist_id: String,
    preferences: UserPreferences,
}

#[derive(Debug, Serialize)]
struct UserArtists {
    followed: Vec<ArtistRef>,
    recently_played: Vec<PlayedArtist>,
}

pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register_user))
        .route(
            "/users/:id/preferences",
            get(get_preferences).put(update_preferences),
        )
        .route("/users/:id/artists", get(list_artists))
        .route("/users/:id/sync", post(sync_user))
}

/// Store credentials handed over by the login flow. A first-time user gets a
/// fresh playlist on their account.
async fn register_user(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(req): Json<RegisterUserRequest>,
) -> Result<Json<RegisteredUser>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let credentials = Credentials {
        access_token: req.access_token.clone(),
        token_type: req.token_type.clone(),
        refresh_token: req.refresh_token.clone(),
        expiry: req.expiry,
    };
    if credentials.is_expired(Utc::now()) {
        return Err(AppError::Validation("Access token is already expired".to_string()));
    }

    let known_playlist = match req.playlist_id.clone() {
        Some(id) => Some(id),
        None => state
            .users
            .find_user(&req.user_id)
            .await?
            .map(|u| u.playlist_id),
    };

    let playlist_id = match known_playlist {
        Some(id) => id,
        None => {
            let session = state.sessions.for_token(&req.access_token);
            state
                .sync
                .provision_playlist(session.as_ref(), &req.user_id)
                .await?
        }
    };

    let user = state
        .users
        .upsert_user(&req.user_id, &playlist_id, &credentials)
        .await?;
    tracing::info!("Registered user {} with playlist {}", user.user_id, user.playlist_id);

    Ok(Json(RegisteredUser {
        user_id: user.user_id,
        playlist_id: user.playlist_id,
        preferences: user.preferences,
    }))
}

async fn get_preferences(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
) -> Result<Json<UserPreferences>> {
    let user = state.users.get_user(&user_id).await?;
    Ok(Json(user.preferences))
}

async fn update_preferences(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Result<Json<UserPreferences>> {
    let current = state.users.get_user(&user_id).await?;
    let user = state
        .users
        .update_preferences(&user_id, req.apply(current.preferences))
        .await?;
    Ok(Json(user.preferences))
}

async fn list_artists(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
) -> Result<Json<UserArtists>> {
    let user = state.users.get_user(&user_id).await?;
    let session = state.sessions.open(&user).await?;
    let discovery = state.sync.discovery();

    let followed = discovery.followed_artists(session.as_ref()).await?;
    let recently_played = discovery
        .recently_played_artists(
            session.as_ref(),
            state.sync.config().recently_played_window,
            Utc::now(),
        )
        .await?;

    Ok(Json(UserArtists {
        followed,
        recently_played,
    }))
}

/// Admin-triggered sync for one user, outside the regular schedule.
async fn sync_user(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
) -> Result<Json<SyncReport>> {
    let report = state.sync.sync_user_playlist(&user_id).await?;
    Ok(Json(report))
}
