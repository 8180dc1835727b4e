use meeple_types::models::ListingKind;

use crate::Database;
use crate::models::{NewListing, NewProfile};

pub fn new_profile(id: &str) -> NewProfile {
    NewProfile {
        id: id.to_string(),
        name: id.to_string(),
        email: format!("{id}@example.com"),
        password_hash: "argon2-hash".to_string(),
        location: "Bergen".to_string(),
        joined_at: "2026-01-01T00:00:00+00:00".to_string(),
    }
}

pub fn seed_profile(db: &Database, id: &str) {
    db.create_profile(&new_profile(id)).unwrap();
}

pub fn new_listing(id: &str, owner: &str) -> NewListing {
    listing_at(id, owner, "2026-02-01T12:00:00+00:00")
}

pub fn listing_at(id: &str, owner: &str, created_at: &str) -> NewListing {
    NewListing {
        id: id.to_string(),
        user_id: owner.to_string(),
        title: format!("Copy of {id}"),
        description: "well loved, complete".to_string(),
        condition: "good".to_string(),
        price: Some(250.0),
        trade_only: false,
        image_url: None,
        location: "Bergen".to_string(),
        created_at: created_at.to_string(),
        kind: ListingKind::Selling,
    }
}
