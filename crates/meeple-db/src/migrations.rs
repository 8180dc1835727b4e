use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id                TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            email             TEXT NOT NULL UNIQUE,
            password          TEXT NOT NULL,
            location          TEXT NOT NULL DEFAULT '',
            bio               TEXT NOT NULL DEFAULT '',
            avatar_url        TEXT,
            joined_at         TEXT NOT NULL,
            vps               INTEGER NOT NULL DEFAULT 1 CHECK (vps >= 1),
            post_count        INTEGER NOT NULL DEFAULT 0 CHECK (post_count >= 0),
            favorite_game_id  TEXT,
            favorite_genre_id TEXT
        );

        CREATE TABLE IF NOT EXISTS listings (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            condition   TEXT NOT NULL,
            price       REAL,
            trade_only  INTEGER NOT NULL DEFAULT 0,
            image_url   TEXT,
            location    TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            kind        TEXT NOT NULL CHECK (kind IN ('offering', 'selling', 'wanting')),
            star_count  INTEGER NOT NULL DEFAULT 0 CHECK (star_count >= 0)
        );

        CREATE INDEX IF NOT EXISTS idx_listings_kind
            ON listings(kind, created_at DESC, id DESC);

        CREATE INDEX IF NOT EXISTS idx_listings_user
            ON listings(user_id, created_at DESC, id DESC);

        -- Star membership. The set is the source of truth; listings.star_count
        -- is its cached cardinality, updated in the same transaction as every
        -- membership change.
        CREATE TABLE IF NOT EXISTS stars (
            listing_id  TEXT NOT NULL REFERENCES listings(id),
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            starred_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(listing_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_stars_listing
            ON stars(listing_id);

        -- Which listing ids have already triggered a milestone award.
        -- No foreign key: the record must outlive the listing so a
        -- deleted-then-recreated id can never award twice.
        CREATE TABLE IF NOT EXISTS listing_awards (
            listing_id  TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            awarded_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
