use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ListingKind;

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the auth handlers.
/// Canonical definition lives here in meeple-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub token: String,
}

// -- Listings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    /// Optional client-generated id, used as an idempotency key: a retried
    /// creation with the same id returns the already-committed listing and
    /// never awards milestone points twice.
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub condition: String,
    pub price: Option<f64>,
    #[serde(default)]
    pub trade_only: bool,
    pub image_url: Option<String>,
    pub location: String,
    pub kind: ListingKind,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub condition: String,
    pub price: Option<f64>,
    pub trade_only: bool,
    pub image_url: Option<String>,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub kind: ListingKind,
    pub star_count: u32,
    pub starred_by: Vec<Uuid>,
}

// -- Stars --

#[derive(Debug, Serialize)]
pub struct StarStateResponse {
    pub starred: bool,
    pub star_count: u32,
}

// -- Profiles --

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub location: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub vps: u32,
    pub post_count: u32,
    pub favorite_game_id: Option<String>,
    pub favorite_genre_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub favorite_game_id: Option<String>,
    pub favorite_genre_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VpsResponse {
    pub vps: u32,
}
