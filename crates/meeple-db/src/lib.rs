pub mod error;
pub mod listings;
pub mod migrations;
pub mod models;
pub mod profiles;
pub mod stars;

#[cfg(test)]
mod test_util;

use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{info, warn};

pub use error::StoreError;

const BUSY_RETRIES: u32 = 3;
const BUSY_BACKOFF: Duration = Duration::from_millis(50);

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("connection lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Run a mutation while holding the connection. Transient busy errors
    /// (another process holds the file lock) are retried with bounded
    /// backoff before surfacing as `Unavailable`.
    pub fn with_conn_mut<T>(
        &self,
        mut f: impl FnMut(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 0;
        loop {
            let result = {
                let mut conn = self.conn.lock().map_err(|e| {
                    StoreError::Unavailable(format!("connection lock poisoned: {e}"))
                })?;
                f(&mut conn)
            };
            match result {
                Err(StoreError::Busy) if attempt < BUSY_RETRIES => {
                    attempt += 1;
                    warn!("database busy, retrying ({attempt}/{BUSY_RETRIES})");
                    thread::sleep(BUSY_BACKOFF * attempt);
                }
                Err(StoreError::Busy) => {
                    return Err(StoreError::Unavailable(
                        "database busy after retries".to_string(),
                    ));
                }
                other => return other,
            }
        }
    }
}
