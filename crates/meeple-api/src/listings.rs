use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use meeple_db::models::{ListingRow, NewListing, StarRow};
use meeple_types::api::{Claims, CreateListingRequest, ListingResponse};
use meeple_types::models::ListingKind;

use crate::auth::AppStateInner;
use crate::{parse_timestamp, store_status};

#[derive(Debug, Deserialize)]
pub struct ListingsQuery {
    pub kind: ListingKind,
}

#[derive(Debug, Deserialize)]
pub struct UserListingsQuery {
    pub kind: Option<ListingKind>,
}

pub async fn create_listing(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.title.trim().is_empty() || req.title.len() > 200 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.location.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // A client-supplied id doubles as an idempotency key for retries.
    let listing_id = req.id.unwrap_or_else(Uuid::new_v4);

    let new = NewListing {
        id: listing_id.to_string(),
        user_id: claims.sub.to_string(),
        title: req.title,
        description: req.description,
        condition: req.condition,
        price: req.price,
        trade_only: req.trade_only,
        image_url: req.image_url,
        location: req.location,
        created_at: chrono::Utc::now().to_rfc3339(),
        kind: req.kind,
    };

    // Run blocking DB work off the async runtime. The listing insert and the
    // owner's milestone award commit in one transaction inside the store.
    let db = state.clone();
    let (row, star_rows) = tokio::task::spawn_blocking(move || {
        let row = db.db.create_listing(&new).map_err(store_status)?;
        let star_rows = db
            .db
            .stars_for_listings(std::slice::from_ref(&row.id))
            .map_err(store_status)?;
        Ok::<_, StatusCode>((row, star_rows))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    let mut star_map = group_stars(&star_rows);
    let starred_by = star_map.remove(&row.id).unwrap_or_default();

    Ok((
        StatusCode::CREATED,
        Json(to_listing_response(row, starred_by)),
    ))
}

pub async fn get_listing(
    State(state): State<Arc<AppStateInner>>,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let id = listing_id.to_string();

    let (row, star_rows) = tokio::task::spawn_blocking(move || {
        let row = db
            .db
            .get_listing(&id)
            .map_err(store_status)?
            .ok_or(StatusCode::NOT_FOUND)?;
        let star_rows = db
            .db
            .stars_for_listings(std::slice::from_ref(&row.id))
            .map_err(store_status)?;
        Ok::<_, StatusCode>((row, star_rows))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    let mut star_map = group_stars(&star_rows);
    let starred_by = star_map.remove(&row.id).unwrap_or_default();

    Ok(Json(to_listing_response(row, starred_by)))
}

/// All listings of one kind across owners, newest first.
pub async fn list_listings(
    State(state): State<Arc<AppStateInner>>,
    Query(query): Query<ListingsQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();

    let (rows, star_rows) = tokio::task::spawn_blocking(move || {
        let rows = db.db.get_all_listings(query.kind).map_err(store_status)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let star_rows = db.db.stars_for_listings(&ids).map_err(store_status)?;
        Ok::<_, StatusCode>((rows, star_rows))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(to_listing_responses(rows, &star_rows)))
}

pub async fn user_listings(
    State(state): State<Arc<AppStateInner>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<UserListingsQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let uid = user_id.to_string();

    let (rows, star_rows) = tokio::task::spawn_blocking(move || {
        let rows = db
            .db
            .get_user_listings(&uid, query.kind)
            .map_err(store_status)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let star_rows = db.db.stars_for_listings(&ids).map_err(store_status)?;
        Ok::<_, StatusCode>((rows, star_rows))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(to_listing_responses(rows, &star_rows)))
}

/// Owner-only delete; the star relations go with the listing.
pub async fn delete_listing(
    State(state): State<Arc<AppStateInner>>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let id = listing_id.to_string();
    let uid = claims.sub.to_string();

    tokio::task::spawn_blocking(move || db.db.delete_listing(&id, &uid).map_err(store_status))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })??;

    Ok(StatusCode::NO_CONTENT)
}

// Group star rows by listing id
pub(crate) fn group_stars(rows: &[StarRow]) -> HashMap<String, Vec<Uuid>> {
    let mut map: HashMap<String, Vec<Uuid>> = HashMap::new();
    for r in rows {
        if let Ok(uid) = r.user_id.parse::<Uuid>() {
            map.entry(r.listing_id.clone()).or_default().push(uid);
        }
    }
    map
}

pub(crate) fn to_listing_responses(
    rows: Vec<ListingRow>,
    star_rows: &[StarRow],
) -> Vec<ListingResponse> {
    let mut star_map = group_stars(star_rows);
    rows.into_iter()
        .map(|row| {
            let starred_by = star_map.remove(&row.id).unwrap_or_default();
            to_listing_response(row, starred_by)
        })
        .collect()
}

pub(crate) fn to_listing_response(row: ListingRow, starred_by: Vec<Uuid>) -> ListingResponse {
    ListingResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt listing id '{}': {}", row.id, e);
            Uuid::default()
        }),
        user_id: row.user_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user_id '{}' on listing '{}': {}", row.user_id, row.id, e);
            Uuid::default()
        }),
        created_at: parse_timestamp(&row.created_at, &row.id),
        kind: row.kind.parse().unwrap_or_else(|e| {
            warn!("Corrupt kind on listing '{}': {}", row.id, e);
            ListingKind::Offering
        }),
        title: row.title,
        description: row.description,
        condition: row.condition,
        price: row.price,
        trade_only: row.trade_only,
        image_url: row.image_url,
        location: row.location,
        star_count: row.star_count,
        starred_by,
    }
}
