//! Victory Point accrual.
//!
//! Pure arithmetic over a profile's cumulative stats; no I/O, no clock.
//! Every caller that needs a from-scratch reputation value (the milestone
//! award transaction, the reconciliation path) goes through [`compute_vps`]
//! so there is exactly one authoritative formula.

/// A listing with at least this many stars counts as high-rated.
pub const HIGH_RATED_STAR_THRESHOLD: u32 = 2;

/// VPs contributed by the number of listings a user has posted.
pub fn post_tier(post_count: u32) -> u32 {
    if post_count >= 10 {
        5
    } else if post_count >= 5 {
        3
    } else if post_count >= 1 {
        1
    } else {
        0
    }
}

/// Total VPs for a user: 1 for creating the account, a tier contribution
/// from `post_count`, and 1 per high-rated listing.
///
/// Deterministic: identical inputs always yield the identical output.
pub fn compute_vps(post_count: u32, high_rated_listings: u32) -> u32 {
    1 + post_tier(post_count) + high_rated_listings
}
