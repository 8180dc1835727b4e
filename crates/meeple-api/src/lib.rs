pub mod auth;
pub mod listings;
pub mod middleware;
pub mod profiles;
pub mod stars;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use tracing::{error, warn};

use meeple_db::StoreError;

/// Map store errors onto HTTP statuses. Transient store failures are logged
/// here so handlers can stay terse.
pub(crate) fn store_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Forbidden => StatusCode::FORBIDDEN,
        StoreError::Conflict => StatusCode::CONFLICT,
        StoreError::Busy | StoreError::Unavailable(_) => {
            error!("store failure: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Stored timestamps are RFC 3339, but SQLite's own defaults are
/// "YYYY-MM-DD HH:MM:SS" without timezone. Accept both, warn on garbage.
pub(crate) fn parse_timestamp(value: &str, record_id: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on record '{}': {}", value, record_id, e);
            DateTime::default()
        })
}
