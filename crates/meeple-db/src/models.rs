//! Database row types — these map directly to SQLite rows.
//! Distinct from the meeple-types API models to keep the DB layer independent.

use meeple_types::models::ListingKind;

pub struct ProfileRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub location: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub joined_at: String,
    pub vps: u32,
    pub post_count: u32,
    pub favorite_game_id: Option<String>,
    pub favorite_genre_id: Option<String>,
}

pub struct ListingRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub condition: String,
    pub price: Option<f64>,
    pub trade_only: bool,
    pub image_url: Option<String>,
    pub location: String,
    pub created_at: String,
    pub kind: String,
    pub star_count: u32,
}

pub struct StarRow {
    pub listing_id: String,
    pub user_id: String,
}

pub struct NewProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub location: String,
    pub joined_at: String,
}

pub struct NewListing {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub condition: String,
    pub price: Option<f64>,
    pub trade_only: bool,
    pub image_url: Option<String>,
    pub location: String,
    pub created_at: String,
    pub kind: ListingKind,
}

/// Partial update of the profile display fields. `None` leaves the stored
/// value untouched. `vps` and `post_count` are not patchable here: they are
/// owned by the milestone award and reconciliation paths.
#[derive(Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub favorite_game_id: Option<String>,
    pub favorite_genre_id: Option<String>,
}
