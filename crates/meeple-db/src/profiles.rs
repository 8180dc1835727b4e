use rusqlite::Connection;

use crate::Database;
use crate::StoreError;
use crate::error::OptionalExt;
use crate::listings::count_high_rated;
use crate::models::{NewProfile, ProfilePatch, ProfileRow};

impl Database {
    // -- Profiles --

    /// Create a profile at signup. Every account starts with the baseline
    /// point: `vps = 1, post_count = 0`. A duplicate id or email is a
    /// `Conflict` and leaves the store untouched.
    pub fn create_profile(&self, new: &NewProfile) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, name, email, password, location, joined_at, vps, post_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, 0)",
                rusqlite::params![
                    new.id,
                    new.name,
                    new.email,
                    new.password_hash,
                    new.location,
                    new.joined_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, StoreError> {
        self.with_conn(|conn| query_profile(conn, "id", user_id))
    }

    pub fn get_profile_by_email(&self, email: &str) -> Result<Option<ProfileRow>, StoreError> {
        self.with_conn(|conn| query_profile(conn, "email", email))
    }

    /// Patch the display fields. `vps` and `post_count` are out of reach
    /// here; they belong to the milestone award and reconciliation
    /// transactions.
    pub fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE profiles SET
                     name              = COALESCE(?1, name),
                     location          = COALESCE(?2, location),
                     bio               = COALESCE(?3, bio),
                     avatar_url        = COALESCE(?4, avatar_url),
                     favorite_game_id  = COALESCE(?5, favorite_game_id),
                     favorite_genre_id = COALESCE(?6, favorite_genre_id)
                 WHERE id = ?7",
                rusqlite::params![
                    patch.name,
                    patch.location,
                    patch.bio,
                    patch.avatar_url,
                    patch.favorite_game_id,
                    patch.favorite_genre_id,
                    user_id,
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    /// Reconciliation: recompute the reputation score from scratch out of the
    /// stored stats and persist it. Heals any drift between the stored score
    /// and the accrual formula, and picks up listings that crossed the
    /// high-rated star threshold since the last award.
    pub fn recompute_vps(&self, user_id: &str) -> Result<u32, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let post_count: Option<u32> = tx
                .query_row(
                    "SELECT post_count FROM profiles WHERE id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(post_count) = post_count else {
                return Err(StoreError::NotFound);
            };

            let high_rated = count_high_rated(&tx, user_id)?;
            let vps = meeple_points::compute_vps(post_count, high_rated);
            tx.execute(
                "UPDATE profiles SET vps = ?1 WHERE id = ?2",
                rusqlite::params![vps, user_id],
            )?;

            tx.commit()?;
            Ok(vps)
        })
    }
}

fn query_profile(
    conn: &Connection,
    column: &str,
    value: &str,
) -> Result<Option<ProfileRow>, StoreError> {
    let sql = format!(
        "SELECT id, name, email, password, location, bio, avatar_url, joined_at,
                vps, post_count, favorite_game_id, favorite_genre_id
         FROM profiles
         WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(ProfileRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                location: row.get(4)?,
                bio: row.get(5)?,
                avatar_url: row.get(6)?,
                joined_at: row.get(7)?,
                vps: row.get(8)?,
                post_count: row.get(9)?,
                favorite_game_id: row.get(10)?,
                favorite_genre_id: row.get(11)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::StoreError;
    use crate::models::ProfilePatch;
    use crate::test_util::{new_listing, new_profile, seed_profile};

    #[test]
    fn new_profile_starts_with_the_baseline_point() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");

        let profile = db.get_profile("alice").unwrap().unwrap();
        assert_eq!(profile.vps, 1);
        assert_eq!(profile.post_count, 0);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");

        let mut dup = new_profile("alice2");
        dup.email = "alice@example.com".to_string();
        assert!(matches!(db.create_profile(&dup), Err(StoreError::Conflict)));
        assert!(db.get_profile("alice2").unwrap().is_none());
    }

    #[test]
    fn patch_touches_only_the_given_fields() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        db.create_listing(&new_listing("l1", "alice")).unwrap();

        db.update_profile(
            "alice",
            &ProfilePatch {
                bio: Some("trades anything for worker placement".to_string()),
                favorite_game_id: Some("agricola".to_string()),
                ..ProfilePatch::default()
            },
        )
        .unwrap();

        let profile = db.get_profile("alice").unwrap().unwrap();
        assert_eq!(profile.bio, "trades anything for worker placement");
        assert_eq!(profile.favorite_game_id.as_deref(), Some("agricola"));
        assert_eq!(profile.name, "alice");
        // Ledger-owned fields unaffected by the display patch
        assert_eq!(profile.post_count, 1);
        assert_eq!(profile.vps, 2);
    }

    #[test]
    fn patch_unknown_profile_is_not_found() {
        let db = Database::open_in_memory().unwrap();

        let patch = ProfilePatch {
            bio: Some("hello".to_string()),
            ..ProfilePatch::default()
        };
        assert!(matches!(
            db.update_profile("ghost", &patch),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn recompute_counts_high_rated_listings() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        seed_profile(&db, "bob");
        seed_profile(&db, "carol");
        db.create_listing(&new_listing("l1", "alice")).unwrap();

        // Two stars push the listing over the high-rated threshold
        db.star_listing("l1", "bob").unwrap();
        db.star_listing("l1", "carol").unwrap();

        let vps = db.recompute_vps("alice").unwrap();
        assert_eq!(vps, meeple_points::compute_vps(1, 1));
        assert_eq!(db.get_profile("alice").unwrap().unwrap().vps, 3);
    }

    #[test]
    fn recompute_heals_a_drifted_score() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        db.create_listing(&new_listing("l1", "alice")).unwrap();

        // Simulate drift from a lost update
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE profiles SET vps = 1 WHERE id = 'alice'", [])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(db.recompute_vps("alice").unwrap(), 2);
    }

    #[test]
    fn recompute_unknown_profile_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.recompute_vps("ghost"),
            Err(StoreError::NotFound)
        ));
    }
}
