use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};
use uuid::Uuid;

use meeple_db::models::{ProfilePatch, ProfileRow};
use meeple_types::api::{Claims, ProfileResponse, UpdateProfileRequest, VpsResponse};

use crate::auth::AppStateInner;
use crate::{parse_timestamp, store_status};

pub async fn get_profile(
    State(state): State<Arc<AppStateInner>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let uid = user_id.to_string();

    let row = tokio::task::spawn_blocking(move || {
        db.db
            .get_profile(&uid)
            .map_err(store_status)?
            .ok_or(StatusCode::NOT_FOUND)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(to_profile_response(row)))
}

/// Patch the authenticated user's display fields. The reputation fields are
/// not patchable through this route.
pub async fn update_me(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if let Some(name) = &req.name {
        if name.is_empty() || name.len() > 64 {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let patch = ProfilePatch {
        name: req.name,
        location: req.location,
        bio: req.bio,
        avatar_url: req.avatar_url,
        favorite_game_id: req.favorite_game_id,
        favorite_genre_id: req.favorite_genre_id,
    };

    let db = state.clone();
    let uid = claims.sub.to_string();

    let row = tokio::task::spawn_blocking(move || {
        db.db.update_profile(&uid, &patch).map_err(store_status)?;
        db.db
            .get_profile(&uid)
            .map_err(store_status)?
            .ok_or(StatusCode::NOT_FOUND)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(to_profile_response(row)))
}

/// Reconciliation endpoint: recompute the authenticated user's reputation
/// score from scratch and persist it.
pub async fn recompute_vps(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let uid = claims.sub.to_string();

    let vps = tokio::task::spawn_blocking(move || db.db.recompute_vps(&uid).map_err(store_status))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })??;

    Ok(Json(VpsResponse { vps }))
}

fn to_profile_response(row: ProfileRow) -> ProfileResponse {
    ProfileResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt profile id '{}': {}", row.id, e);
            Uuid::default()
        }),
        joined_at: parse_timestamp(&row.joined_at, &row.id),
        name: row.name,
        email: row.email,
        location: row.location,
        bio: row.bio,
        avatar_url: row.avatar_url,
        vps: row.vps,
        post_count: row.post_count,
        favorite_game_id: row.favorite_game_id,
        favorite_genre_id: row.favorite_genre_id,
    }
}
