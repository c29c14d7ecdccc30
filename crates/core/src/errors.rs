//! Error types shared across the Moneta crates.

use thiserror::Error;

/// Result type alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Failures raised by the local store.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("{0}")]
    Internal(String),
}

/// Failures raised at the remote-store boundary.
///
/// `NotFound` is its own variant because the push phase keys on it: an
/// update rejected as not-found is retried as a create.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("record not found on the remote store")]
    NotFound,

    #[error("remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication error: {0}")]
    Auth(String),
}

impl RemoteError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        if status == 404 {
            return Self::NotFound;
        }
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound => Some(404),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_constructor_maps_404_to_not_found() {
        assert!(matches!(RemoteError::api(404, "gone"), RemoteError::NotFound));
        assert!(matches!(
            RemoteError::api(500, "boom"),
            RemoteError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn status_code_round_trip() {
        assert_eq!(RemoteError::NotFound.status_code(), Some(404));
        assert_eq!(RemoteError::api(422, "invalid").status_code(), Some(422));
        assert_eq!(
            RemoteError::Transport("offline".to_string()).status_code(),
            None
        );
    }
}
