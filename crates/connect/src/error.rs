//! Error types for the connect crate.

use thiserror::Error;

use moneta_core::errors::{Error, RemoteError};

/// Result type alias for connect operations.
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Retry policy class for API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Errors that can occur while talking to the cloud service.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the cloud service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (missing required data, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication error (missing or invalid token)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl ConnectError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> ApiRetryClass {
        match self {
            Self::Api { status, .. } => match *status {
                401 | 403 => ApiRetryClass::ReauthRequired,
                408 | 409 | 423 | 425 | 429 => ApiRetryClass::Retryable,
                500..=599 => ApiRetryClass::Retryable,
                _ => ApiRetryClass::Permanent,
            },
            Self::Http(_) => ApiRetryClass::Retryable,
            Self::Json(_) => ApiRetryClass::Permanent,
            Self::InvalidRequest(_) => ApiRetryClass::Permanent,
            Self::Auth(_) => ApiRetryClass::ReauthRequired,
        }
    }
}

impl From<ConnectError> for Error {
    fn from(err: ConnectError) -> Self {
        let remote = match err {
            // `RemoteError::api` folds 404 into `NotFound`, which the push
            // phase relies on for its recreate rule.
            ConnectError::Api { status, message } => RemoteError::api(status, message),
            ConnectError::Http(e) => RemoteError::Transport(e.to_string()),
            ConnectError::Json(e) => RemoteError::Transport(format!("bad response body: {e}")),
            ConnectError::InvalidRequest(m) => RemoteError::Api {
                status: 400,
                message: m,
            },
            ConnectError::Auth(m) => RemoteError::Auth(m),
        };
        Error::Remote(remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_class_follows_status() {
        assert_eq!(
            ConnectError::api(500, "boom").retry_class(),
            ApiRetryClass::Retryable
        );
        assert_eq!(
            ConnectError::api(429, "slow down").retry_class(),
            ApiRetryClass::Retryable
        );
        assert_eq!(
            ConnectError::api(401, "unauthorized").retry_class(),
            ApiRetryClass::ReauthRequired
        );
        assert_eq!(
            ConnectError::api(400, "bad request").retry_class(),
            ApiRetryClass::Permanent
        );
    }

    #[test]
    fn not_found_maps_into_the_core_not_found_variant() {
        let err: Error = ConnectError::api(404, "gone").into();
        assert!(matches!(err, Error::Remote(RemoteError::NotFound)));

        let err: Error = ConnectError::api(503, "flaky").into();
        assert!(matches!(
            err,
            Error::Remote(RemoteError::Api { status: 503, .. })
        ));
    }
}
