use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use meeple_types::api::{Claims, StarStateResponse};

use crate::auth::AppStateInner;
use crate::store_status;

/// Star a listing for the authenticated user. Idempotent: re-starring an
/// already-starred listing succeeds without changing the count.
pub async fn star(
    State(state): State<Arc<AppStateInner>>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let lid = listing_id.to_string();
    let uid = claims.sub.to_string();

    let star_count = tokio::task::spawn_blocking(move || {
        db.db.star_listing(&lid, &uid).map_err(store_status)?;
        let row = db
            .db
            .get_listing(&lid)
            .map_err(store_status)?
            .ok_or(StatusCode::NOT_FOUND)?;
        Ok::<_, StatusCode>(row.star_count)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(StarStateResponse {
        starred: true,
        star_count,
    }))
}

/// Remove the authenticated user's star. Unstarring a listing that was never
/// starred is a successful no-op.
pub async fn unstar(
    State(state): State<Arc<AppStateInner>>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let lid = listing_id.to_string();
    let uid = claims.sub.to_string();

    let star_count = tokio::task::spawn_blocking(move || {
        db.db.unstar_listing(&lid, &uid).map_err(store_status)?;
        let row = db
            .db
            .get_listing(&lid)
            .map_err(store_status)?
            .ok_or(StatusCode::NOT_FOUND)?;
        Ok::<_, StatusCode>(row.star_count)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(StarStateResponse {
        starred: false,
        star_count,
    }))
}

/// Whether the authenticated user has starred this listing.
pub async fn star_state(
    State(state): State<Arc<AppStateInner>>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let lid = listing_id.to_string();
    let uid = claims.sub.to_string();

    let (starred, star_count) = tokio::task::spawn_blocking(move || {
        let row = db
            .db
            .get_listing(&lid)
            .map_err(store_status)?
            .ok_or(StatusCode::NOT_FOUND)?;
        let starred = db.db.is_starred(&lid, &uid).map_err(store_status)?;
        Ok::<_, StatusCode>((starred, row.star_count))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(StarStateResponse { starred, star_count }))
}
