//! Storage-level error type and its mapping into the core error.

use moneta_core::errors::{DatabaseError, Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Writer lock poisoned")]
    WriterPoisoned,

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let db = match err {
            StorageError::Query(e) => DatabaseError::QueryFailed(e.to_string()),
            StorageError::Connection(m) | StorageError::Pool(m) => DatabaseError::Pool(m),
            StorageError::Migration(m) => DatabaseError::Migration(m),
            StorageError::WriterPoisoned => {
                DatabaseError::Internal("writer lock poisoned".to_string())
            }
            StorageError::CorruptRow(m) => DatabaseError::Internal(m),
        };
        Error::Database(db)
    }
}
