use rusqlite::Connection;

use meeple_types::models::ListingKind;

use crate::Database;
use crate::StoreError;
use crate::error::OptionalExt;
use crate::models::{ListingRow, NewListing};

impl Database {
    // -- Listings --

    /// Insert a listing and apply the owner's post milestone in the same
    /// transaction: `post_count` advances by one and `vps` is recomputed
    /// from scratch, so the stored score always agrees with the accrual
    /// formula no matter how calls interleave.
    ///
    /// The award is keyed to the listing id in `listing_awards`. A retried
    /// creation with an id that already committed returns the stored listing
    /// and never re-awards, even if the listing was deleted in between.
    pub fn create_listing(&self, new: &NewListing) -> Result<ListingRow, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let post_count: Option<u32> = tx
                .query_row(
                    "SELECT post_count FROM profiles WHERE id = ?1",
                    [new.user_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(post_count) = post_count else {
                return Err(StoreError::NotFound);
            };

            if let Some(existing) = query_listing(&tx, &new.id)? {
                tx.commit()?;
                return Ok(existing);
            }

            tx.execute(
                "INSERT INTO listings
                     (id, user_id, title, description, condition, price, trade_only,
                      image_url, location, created_at, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    new.id,
                    new.user_id,
                    new.title,
                    new.description,
                    new.condition,
                    new.price,
                    new.trade_only,
                    new.image_url,
                    new.location,
                    new.created_at,
                    new.kind.as_str(),
                ],
            )?;

            let awarded = tx.execute(
                "INSERT OR IGNORE INTO listing_awards (listing_id, user_id) VALUES (?1, ?2)",
                [new.id.as_str(), new.user_id.as_str()],
            )?;
            if awarded > 0 {
                let new_count = post_count + 1;
                let high_rated = count_high_rated(&tx, &new.user_id)?;
                let vps = meeple_points::compute_vps(new_count, high_rated);
                tx.execute(
                    "UPDATE profiles SET post_count = ?1, vps = ?2 WHERE id = ?3",
                    rusqlite::params![new_count, vps, new.user_id],
                )?;
            }

            let row = query_listing(&tx, &new.id)?.ok_or_else(|| {
                StoreError::Unavailable("listing vanished mid-transaction".to_string())
            })?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_listing(&self, listing_id: &str) -> Result<Option<ListingRow>, StoreError> {
        self.with_conn(|conn| query_listing(conn, listing_id))
    }

    /// One user's listings, newest first, ties broken by id descending so a
    /// re-query over unchanged data reproduces the same order.
    pub fn get_user_listings(
        &self,
        user_id: &str,
        kind: Option<ListingKind>,
    ) -> Result<Vec<ListingRow>, StoreError> {
        self.with_conn(|conn| {
            let rows = match kind {
                Some(kind) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, user_id, title, description, condition, price, trade_only,
                                image_url, location, created_at, kind, star_count
                         FROM listings
                         WHERE user_id = ?1 AND kind = ?2
                         ORDER BY created_at DESC, id DESC",
                    )?;
                    let rows = stmt
                        .query_map([user_id, kind.as_str()], map_listing_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, user_id, title, description, condition, price, trade_only,
                                image_url, location, created_at, kind, star_count
                         FROM listings
                         WHERE user_id = ?1
                         ORDER BY created_at DESC, id DESC",
                    )?;
                    let rows = stmt
                        .query_map([user_id], map_listing_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };

            Ok(rows)
        })
    }

    /// All listings of one kind across owners, same ordering rule.
    pub fn get_all_listings(&self, kind: ListingKind) -> Result<Vec<ListingRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, description, condition, price, trade_only,
                        image_url, location, created_at, kind, star_count
                 FROM listings
                 WHERE kind = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([kind.as_str()], map_listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Owner-only delete. The listing and its star relations go together in
    /// one transaction; no orphaned membership rows are reachable afterward.
    pub fn delete_listing(
        &self,
        listing_id: &str,
        requesting_user_id: &str,
    ) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let owner: Option<String> = tx
                .query_row(
                    "SELECT user_id FROM listings WHERE id = ?1",
                    [listing_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(owner) = owner else {
                return Err(StoreError::NotFound);
            };
            if owner != requesting_user_id {
                return Err(StoreError::Forbidden);
            }

            tx.execute("DELETE FROM stars WHERE listing_id = ?1", [listing_id])?;
            tx.execute("DELETE FROM listings WHERE id = ?1", [listing_id])?;

            tx.commit()?;
            Ok(())
        })
    }
}

/// Listings whose star count has reached the high-rated threshold, for one
/// owner. Counted inside the caller's transaction.
pub(crate) fn count_high_rated(conn: &Connection, user_id: &str) -> Result<u32, StoreError> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM listings WHERE user_id = ?1 AND star_count >= ?2",
        rusqlite::params![user_id, meeple_points::HIGH_RATED_STAR_THRESHOLD],
        |row| row.get(0),
    )?;
    Ok(n)
}

fn query_listing(conn: &Connection, listing_id: &str) -> Result<Option<ListingRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, title, description, condition, price, trade_only,
                image_url, location, created_at, kind, star_count
         FROM listings
         WHERE id = ?1",
    )?;

    let row = stmt.query_row([listing_id], map_listing_row).optional()?;

    Ok(row)
}

fn map_listing_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        condition: row.get(4)?,
        price: row.get(5)?,
        trade_only: row.get(6)?,
        image_url: row.get(7)?,
        location: row.get(8)?,
        created_at: row.get(9)?,
        kind: row.get(10)?,
        star_count: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use meeple_types::models::ListingKind;

    use crate::Database;
    use crate::StoreError;
    use crate::models::NewListing;
    use crate::test_util::{listing_at, new_listing, seed_profile};

    fn profile_stats(db: &Database, user_id: &str) -> (u32, u32) {
        let profile = db.get_profile(user_id).unwrap().unwrap();
        (profile.post_count, profile.vps)
    }

    #[test]
    fn first_listing_awards_first_milestone() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");

        db.create_listing(&new_listing("l1", "alice")).unwrap();

        assert_eq!(profile_stats(&db, "alice"), (1, 2));
    }

    #[test]
    fn vps_follow_the_tier_formula_across_many_posts() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");

        for i in 1..=12 {
            db.create_listing(&new_listing(&format!("l{i}"), "alice"))
                .unwrap();
            let (post_count, vps) = profile_stats(&db, "alice");
            assert_eq!(post_count, i);
            assert_eq!(vps, meeple_points::compute_vps(i, 0));
        }

        assert_eq!(profile_stats(&db, "alice"), (12, 6));
    }

    #[test]
    fn retried_creation_with_same_id_awards_once() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        let listing = new_listing("l1", "alice");

        db.create_listing(&listing).unwrap();
        let replay = db.create_listing(&listing).unwrap();

        assert_eq!(replay.id, "l1");
        assert_eq!(profile_stats(&db, "alice"), (1, 2));
    }

    #[test]
    fn create_for_unknown_profile_is_not_found() {
        let db = Database::open_in_memory().unwrap();

        assert!(matches!(
            db.create_listing(&new_listing("l1", "ghost")),
            Err(StoreError::NotFound)
        ));
        assert!(db.get_listing("l1").unwrap().is_none());
    }

    #[test]
    fn concurrent_creations_lose_no_updates() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_profile(&db, "alice");

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    db.create_listing(&new_listing(&format!("l{i}"), "alice"))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Both creations landed: post_count advanced by exactly two and the
        // score reflects the final count.
        assert_eq!(profile_stats(&db, "alice"), (2, 2));
    }

    #[test]
    fn delete_cascades_to_star_relations() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        seed_profile(&db, "bob");
        db.create_listing(&new_listing("l1", "alice")).unwrap();
        db.star_listing("l1", "bob").unwrap();

        db.delete_listing("l1", "alice").unwrap();

        assert!(db.get_listing("l1").unwrap().is_none());
        assert!(!db.is_starred("l1", "bob").unwrap());
        assert!(
            db.get_user_listings("alice", None)
                .unwrap()
                .iter()
                .all(|l| l.id != "l1")
        );
        let orphans: u32 = db
            .with_conn(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM stars WHERE listing_id = 'l1'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn only_the_owner_may_delete() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        seed_profile(&db, "bob");
        db.create_listing(&new_listing("l1", "alice")).unwrap();

        assert!(matches!(
            db.delete_listing("l1", "bob"),
            Err(StoreError::Forbidden)
        ));
        assert!(db.get_listing("l1").unwrap().is_some());

        assert!(matches!(
            db.delete_listing("ghost", "alice"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn recreating_a_deleted_id_does_not_reaward() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");

        db.create_listing(&new_listing("l1", "alice")).unwrap();
        db.delete_listing("l1", "alice").unwrap();
        db.create_listing(&new_listing("l1", "alice")).unwrap();

        assert!(db.get_listing("l1").unwrap().is_some());
        assert_eq!(profile_stats(&db, "alice"), (1, 2));
    }

    #[test]
    fn listings_order_newest_first_with_id_tiebreak() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");

        db.create_listing(&listing_at("a", "alice", "2026-03-01T10:00:00+00:00"))
            .unwrap();
        db.create_listing(&listing_at("b", "alice", "2026-03-02T10:00:00+00:00"))
            .unwrap();
        db.create_listing(&listing_at("c", "alice", "2026-03-03T10:00:00+00:00"))
            .unwrap();
        // Same instant as "b": the id breaks the tie, descending.
        db.create_listing(&listing_at("z", "alice", "2026-03-02T10:00:00+00:00"))
            .unwrap();

        let ids: Vec<String> = db
            .get_all_listings(ListingKind::Selling)
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["c", "z", "b", "a"]);
    }

    #[test]
    fn user_listings_filter_by_kind() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        seed_profile(&db, "bob");

        db.create_listing(&new_listing("l1", "alice")).unwrap();
        db.create_listing(&NewListing {
            kind: ListingKind::Wanting,
            ..new_listing("l2", "alice")
        })
        .unwrap();
        db.create_listing(&new_listing("l3", "bob")).unwrap();

        let selling = db
            .get_user_listings("alice", Some(ListingKind::Selling))
            .unwrap();
        assert_eq!(selling.len(), 1);
        assert_eq!(selling[0].id, "l1");

        let all = db.get_user_listings("alice", None).unwrap();
        assert_eq!(all.len(), 2);
    }
}
