use rusqlite::Connection;

use crate::Database;
use crate::StoreError;
use crate::error::OptionalExt;
use crate::models::StarRow;

impl Database {
    // -- Stars --

    /// Star a listing for a user. Idempotent: starring an already-starred
    /// listing is a successful no-op. Membership insert and counter bump
    /// happen in one transaction so `star_count` can never drift from the
    /// membership set, whatever the interleaving of concurrent calls.
    ///
    /// Returns true if the state changed.
    pub fn star_listing(&self, listing_id: &str, user_id: &str) -> Result<bool, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !listing_exists(&tx, listing_id)? {
                return Err(StoreError::NotFound);
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO stars (listing_id, user_id) VALUES (?1, ?2)",
                [listing_id, user_id],
            )?;
            if inserted > 0 {
                tx.execute(
                    "UPDATE listings SET star_count = star_count + 1 WHERE id = ?1",
                    [listing_id],
                )?;
            }

            tx.commit()?;
            Ok(inserted > 0)
        })
    }

    /// Remove a user's star. Idempotent: unstarring a pair that was never
    /// starred is a successful no-op, not an error.
    pub fn unstar_listing(&self, listing_id: &str, user_id: &str) -> Result<bool, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !listing_exists(&tx, listing_id)? {
                return Err(StoreError::NotFound);
            }

            let removed = tx.execute(
                "DELETE FROM stars WHERE listing_id = ?1 AND user_id = ?2",
                [listing_id, user_id],
            )?;
            if removed > 0 {
                tx.execute(
                    "UPDATE listings SET star_count = star_count - 1 WHERE id = ?1",
                    [listing_id],
                )?;
            }

            tx.commit()?;
            Ok(removed > 0)
        })
    }

    /// Plain membership read; never blocks writers.
    pub fn is_starred(&self, listing_id: &str, user_id: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let row: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM stars WHERE listing_id = ?1 AND user_id = ?2",
                    [listing_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(row.is_some())
        })
    }

    /// Batch-fetch star memberships for a set of listing ids.
    pub fn stars_for_listings(&self, listing_ids: &[String]) -> Result<Vec<StarRow>, StoreError> {
        if listing_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=listing_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT listing_id, user_id FROM stars WHERE listing_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = listing_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(StarRow {
                        listing_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn listing_exists(conn: &Connection, listing_id: &str) -> Result<bool, StoreError> {
    let row: Option<i64> = conn
        .query_row("SELECT 1 FROM listings WHERE id = ?1", [listing_id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use crate::Database;
    use crate::StoreError;
    use crate::test_util::{new_listing, seed_profile};

    fn membership_count(db: &Database, listing_id: &str) -> u32 {
        db.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM stars WHERE listing_id = ?1",
                [listing_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .unwrap()
    }

    fn star_count(db: &Database, listing_id: &str) -> u32 {
        db.get_listing(listing_id).unwrap().unwrap().star_count
    }

    #[test]
    fn star_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        seed_profile(&db, "bob");
        db.create_listing(&new_listing("l1", "alice")).unwrap();

        assert!(db.star_listing("l1", "bob").unwrap());
        assert_eq!(star_count(&db, "l1"), 1);

        // Second call is a no-op, not a double count
        assert!(!db.star_listing("l1", "bob").unwrap());
        assert_eq!(star_count(&db, "l1"), 1);
        assert_eq!(membership_count(&db, "l1"), 1);
    }

    #[test]
    fn unstar_never_starred_is_successful_noop() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        seed_profile(&db, "bob");
        db.create_listing(&new_listing("l1", "alice")).unwrap();

        assert!(!db.unstar_listing("l1", "bob").unwrap());
        assert_eq!(star_count(&db, "l1"), 0);
    }

    #[test]
    fn star_unknown_listing_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "bob");

        assert!(matches!(
            db.star_listing("ghost", "bob"),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.unstar_listing("ghost", "bob"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn is_starred_reflects_membership() {
        let db = Database::open_in_memory().unwrap();
        seed_profile(&db, "alice");
        seed_profile(&db, "bob");
        db.create_listing(&new_listing("l1", "alice")).unwrap();

        assert!(!db.is_starred("l1", "bob").unwrap());
        db.star_listing("l1", "bob").unwrap();
        assert!(db.is_starred("l1", "bob").unwrap());
        db.unstar_listing("l1", "bob").unwrap();
        assert!(!db.is_starred("l1", "bob").unwrap());
    }

    #[test]
    fn counter_matches_membership_under_concurrent_toggles() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_profile(&db, "owner");
        db.create_listing(&new_listing("l1", "owner")).unwrap();

        let users: Vec<String> = (0..8).map(|i| format!("user-{i}")).collect();
        for user in &users {
            seed_profile(&db, user);
        }

        let handles: Vec<_> = users
            .iter()
            .map(|user| {
                let db = Arc::clone(&db);
                let user = user.clone();
                thread::spawn(move || {
                    for round in 0..20 {
                        if round % 2 == 0 {
                            db.star_listing("l1", &user).unwrap();
                        } else {
                            db.unstar_listing("l1", &user).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Each user ended on an unstar, and regardless of interleaving the
        // cached counter equals the membership cardinality.
        assert_eq!(star_count(&db, "l1"), membership_count(&db, "l1"));
        assert_eq!(star_count(&db, "l1"), 0);
    }

    #[test]
    fn concurrent_double_star_counts_once() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_profile(&db, "owner");
        seed_profile(&db, "bob");
        db.create_listing(&new_listing("l1", "owner")).unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let db = Arc::clone(&db);
                thread::spawn(move || db.star_listing("l1", "bob").unwrap())
            })
            .collect();
        let changed: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(changed.iter().filter(|c| **c).count(), 1);
        assert_eq!(star_count(&db, "l1"), 1);
        assert_eq!(membership_count(&db, "l1"), 1);
    }
}
