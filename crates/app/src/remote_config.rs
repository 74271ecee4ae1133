//! Remote ordering configuration.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;
use tatami::config::OrderingConfig;
use thiserror::Error;

/// Path of the ordering configuration endpoint, relative to the API base.
pub const WHATSAPP_CONFIG_PATH: &str = "/api/shop/whatsapp-config";

/// Errors that can occur when fetching the ordering configuration.
#[derive(Debug, Error)]
pub enum ConfigFetchError {
    /// An HTTP transport or deserialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-2xx response.
    #[error("unexpected response from shop API: {0}")]
    UnexpectedResponse(String),
}

#[automock]
#[async_trait]
/// Source of the ordering configuration.
pub trait ConfigSource: Send + Sync {
    /// Fetch the current configuration. `None` means ordering is not configured.
    async fn fetch(&self) -> Result<Option<OrderingConfig>, ConfigFetchError>;
}

/// Fetches the configuration from the shop API.
#[derive(Debug, Clone)]
pub struct HttpConfigSource {
    url: String,
    http: Client,
}

impl HttpConfigSource {
    /// Create a source for the API at `api_base`, e.g. `"http://localhost:3001"`.
    #[must_use]
    pub fn new(api_base: &str) -> Self {
        Self::with_client(api_base, Client::new())
    }

    /// Create a source that shares an existing HTTP client.
    #[must_use]
    pub fn with_client(api_base: &str, http: Client) -> Self {
        Self {
            url: format!("{}{WHATSAPP_CONFIG_PATH}", api_base.trim_end_matches('/')),
            http,
        }
    }

    /// Full URL of the configuration endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch(&self) -> Result<Option<OrderingConfig>, ConfigFetchError> {
        let response = self.http.get(&self.url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(ConfigFetchError::UnexpectedResponse(format!(
                "config request failed with status {status}: {text}"
            )));
        }

        let envelope: ConfigEnvelope = response.json().await?;

        Ok(envelope.into_config())
    }
}

/// A fixed configuration, for deployments without a shop API.
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    config: Option<OrderingConfig>,
}

impl StaticConfigSource {
    /// Always serve `config`.
    #[must_use]
    pub fn new(config: Option<OrderingConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch(&self) -> Result<Option<OrderingConfig>, ConfigFetchError> {
        Ok(self.config.clone())
    }
}

/// Response body: `{ "data": { "phoneE164": "...", "template": "..." } }`.
#[derive(Debug, Deserialize)]
struct ConfigEnvelope {
    #[serde(default)]
    data: Option<OrderingConfig>,
}

impl ConfigEnvelope {
    fn into_config(self) -> Option<OrderingConfig> {
        self.data
            .filter(|config| !config.phone_e164.trim().is_empty())
    }
}
