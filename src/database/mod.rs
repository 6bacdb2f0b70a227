pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{init_db, open_in_memory, DbHandle};

use crate::core::ports::{ConfirmError, SourceError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database query error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database lock poisoned: {0}")]
    Lock(String),
}

impl From<DatabaseError> for SourceError {
    fn from(err: DatabaseError) -> Self {
        SourceError::Unavailable(err.to_string())
    }
}

impl From<DatabaseError> for ConfirmError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlite(e) => ConfirmError::Rejected(e.to_string()),
            other => ConfirmError::Unavailable(other.to_string()),
        }
    }
}
