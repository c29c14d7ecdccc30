//! Wire types for the cloud API.

use serde::Deserialize;

use moneta_core::sync::RemoteRow;

/// Error body returned by the cloud service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}

/// Envelope of a `listAll` response, newest first.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsResponse<F> {
    pub items: Vec<RemoteRow<F>>,
}
