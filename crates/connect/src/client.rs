//! CRUD client for the Moneta cloud service.
//!
//! One HTTP client serves the three record collections through the generic
//! helpers below; the per-kind [`RemoteCollection`] impls are thin shims
//! that pick the route and map errors into the core taxonomy.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};

use moneta_core::records::{
    Debt, DebtFields, EntityKind, InvestmentGoal, InvestmentGoalFields, OwnerId, Transaction,
    TransactionFields,
};
use moneta_core::sync::{RemoteCollection, RemoteRow};

use crate::error::{ConnectError, Result};
use crate::session::SessionHandle;
use crate::types::{ApiErrorResponse, ListRecordsResponse};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Environment variable naming the cloud API base URL.
pub const API_URL_ENV: &str = "MONETA_API_URL";

/// Connection settings for the cloud service.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ConnectConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read the base URL from `MONETA_API_URL`. `None` means the hosted
    /// backend is not configured for this install.
    pub fn from_env() -> Option<Self> {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Self::new)
    }
}

fn collection_path(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Transaction => "transactions",
        EntityKind::Debt => "debts",
        EntityKind::InvestmentGoal => "investment-goals",
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRecordRequest<'a, F> {
    owner_id: &'a OwnerId,
    #[serde(flatten)]
    fields: &'a F,
}

/// Client for the Moneta record collections.
#[derive(Debug, Clone)]
pub struct ConnectClient {
    client: reqwest::Client,
    base_url: String,
    session: SessionHandle,
}

impl ConnectClient {
    pub fn new(config: ConnectConfig, session: SessionHandle) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Create headers for an API request.
    fn headers(&self) -> Result<HeaderMap> {
        let token = self
            .session
            .access_token()
            .ok_or_else(|| ConnectError::auth("No active session"))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ConnectError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Parse a JSON response body.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(ConnectError::api(
                    status.as_u16(),
                    format!("{}: {}", error.code, error.message),
                ));
            }
            return Err(ConnectError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            ConnectError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Check a response that carries no interesting body.
    async fn check_response(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        Self::log_response(status, &body);
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
            return Err(ConnectError::api(
                status.as_u16(),
                format!("{}: {}", error.code, error.message),
            ));
        }
        Err(ConnectError::api(
            status.as_u16(),
            format!("Request failed: {}", body),
        ))
    }

    async fn create_row<F>(
        &self,
        kind: EntityKind,
        owner: &OwnerId,
        fields: &F,
    ) -> Result<RemoteRow<F>>
    where
        F: Serialize + DeserializeOwned,
    {
        let url = format!("{}/v1/{}", self.base_url, collection_path(kind));
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&CreateRecordRequest {
                owner_id: owner,
                fields,
            })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn update_row<F>(&self, kind: EntityKind, id: &str, fields: &F) -> Result<RemoteRow<F>>
    where
        F: Serialize + DeserializeOwned,
    {
        let url = format!("{}/v1/{}/{}", self.base_url, collection_path(kind), id);
        let response = self
            .client
            .put(&url)
            .headers(self.headers()?)
            .json(fields)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn delete_row(&self, kind: EntityKind, id: &str) -> Result<()> {
        let url = format!("{}/v1/{}/{}", self.base_url, collection_path(kind), id);
        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        Self::check_response(response).await
    }

    async fn list_rows<F>(&self, kind: EntityKind, owner: &OwnerId) -> Result<Vec<RemoteRow<F>>>
    where
        F: Serialize + DeserializeOwned,
    {
        let url = format!("{}/v1/{}", self.base_url, collection_path(kind));
        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("ownerId", owner.as_str()), ("order", "createdAt.desc")])
            .send()
            .await?;
        let list: ListRecordsResponse<F> = Self::parse_response(response).await?;
        Ok(list.items)
    }
}

macro_rules! impl_remote_collection {
    ($record:ty, $fields:ty, $kind:expr) => {
        #[async_trait]
        impl RemoteCollection<$record> for ConnectClient {
            async fn create(
                &self,
                owner: &OwnerId,
                fields: &$fields,
            ) -> moneta_core::Result<RemoteRow<$fields>> {
                Ok(self.create_row($kind, owner, fields).await?)
            }

            async fn update(
                &self,
                id: &str,
                fields: &$fields,
            ) -> moneta_core::Result<RemoteRow<$fields>> {
                Ok(self.update_row($kind, id, fields).await?)
            }

            async fn delete(&self, id: &str) -> moneta_core::Result<()> {
                Ok(self.delete_row($kind, id).await?)
            }

            async fn list_all(&self, owner: &OwnerId) -> moneta_core::Result<Vec<RemoteRow<$fields>>> {
                Ok(self.list_rows($kind, owner).await?)
            }
        }
    };
}

impl_remote_collection!(Transaction, TransactionFields, EntityKind::Transaction);
impl_remote_collection!(Debt, DebtFields, EntityKind::Debt);
impl_remote_collection!(InvestmentGoal, InvestmentGoalFields, EntityKind::InvestmentGoal);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_paths_match_backend_routes() {
        assert_eq!(collection_path(EntityKind::Transaction), "transactions");
        assert_eq!(collection_path(EntityKind::Debt), "debts");
        assert_eq!(
            collection_path(EntityKind::InvestmentGoal),
            "investment-goals"
        );
    }

    #[test]
    fn base_url_is_trimmed() {
        let client = ConnectClient::new(
            ConnectConfig::new("https://api.moneta.app/"),
            SessionHandle::new(),
        );
        assert_eq!(client.base_url, "https://api.moneta.app");
    }
}
