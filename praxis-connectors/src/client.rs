//! Shared REST client for the managed data store.
//!
//! Every request carries the project `apikey` header and a bearer token:
//! the signed-in user's access token when one is set, the api key otherwise.
//! Row-level security on the data store keys off that bearer token.

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

// =============================================================================
// Constants
// =============================================================================

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the REST connectors.
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    /// HTTP request could not be sent or completed
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Remote returned a non-success status
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl ConnectorError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConnectorError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ConnectorError> for praxis_store::StoreError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::RequestFailed(_) | ConnectorError::Timeout => {
                praxis_store::StoreError::Connection(err.to_string())
            },
            ConnectorError::ApiError { .. } => praxis_store::StoreError::Query(err.to_string()),
            ConnectorError::ParseError(msg) => praxis_store::StoreError::Deserialization(msg),
        }
    }
}

/// Error body shape returned by the data store and its auth service.
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl RestErrorBody {
    fn into_message(self) -> Option<String> {
        self.message.or(self.error_description).or(self.msg)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for the managed data store.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL, e.g. `https://project.example.co`
    pub base_url: String,
    /// Project api key (sent as `apikey`)
    pub api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl RestConfig {
    /// Create a config with the default timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// REST Client
// =============================================================================

/// Thin JSON-over-HTTP client.
pub struct RestClient {
    client: Client,
    config: RestConfig,
}

impl RestClient {
    /// Create a new client.
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Configured base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Build the full URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }

    /// GET `path` with query parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<T, ConnectorError> {
        let body = self.send(Method::GET, path, query, None::<&()>, bearer).await?;
        serde_json::from_str(&body).map_err(|e| ConnectorError::ParseError(e.to_string()))
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
        bearer: Option<&str>,
    ) -> Result<T, ConnectorError> {
        let body = self.send(Method::POST, path, query, Some(body), bearer).await?;
        serde_json::from_str(&body).map_err(|e| ConnectorError::ParseError(e.to_string()))
    }

    /// POST to `path`, ignoring any response body.
    pub async fn post_empty(&self, path: &str, bearer: Option<&str>) -> Result<(), ConnectorError> {
        self.send(Method::POST, path, &[], None::<&()>, bearer).await?;
        Ok(())
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        bearer: Option<&str>,
    ) -> Result<String, ConnectorError> {
        let url = self.url(path);
        let bearer = bearer.unwrap_or(self.config.api_key.as_str());

        let mut request = self
            .client
            .request(method, &url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(bearer)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = timeout(self.config.timeout, request.send())
            .await
            .map_err(|_| ConnectorError::Timeout)?
            .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ConnectorError::ParseError(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::api_error(status, &text));
        }

        Ok(text)
    }

    fn api_error(status: StatusCode, body: &str) -> ConnectorError {
        let message = serde_json::from_str::<RestErrorBody>(body)
            .ok()
            .and_then(RestErrorBody::into_message)
            .unwrap_or_else(|| body.to_string());

        ConnectorError::ApiError {
            status: status.as_u16(),
            message,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
