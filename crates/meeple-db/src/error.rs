use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced listing or profile does not exist. No mutation occurred.
    #[error("record not found")]
    NotFound,

    /// Mutation attempted by someone other than the owner.
    #[error("forbidden")]
    Forbidden,

    /// Uniqueness conflict, e.g. registering an email that is already taken.
    #[error("record already exists")]
    Conflict,

    /// Transient lock contention; retried internally by `with_conn_mut`.
    #[error("database busy")]
    Busy,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _) => match e.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Self::Busy,
                ErrorCode::ConstraintViolation => Self::Conflict,
                _ => Self::Unavailable(err.to_string()),
            },
            _ => Self::Unavailable(err.to_string()),
        }
    }
}

/// Extension trait for optional query results
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
