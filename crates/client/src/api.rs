//! REST API client for the tagsel persistence server.
//!
//! Wraps the `/api/v1` endpoints (catalog snapshot, configs, pinned set,
//! generated files) using [`reqwest`]. Every successful response carries a
//! `{ "data": ... }` envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tagsel_core::catalog::FeatureCatalog;
use tagsel_core::error::CoreError;
use tagsel_core::persistence::{ConfigBackend, SavedFile};
use tagsel_core::repository::Config;
use tagsel_core::types::{ConfigId, Timestamp};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// HTTP client for one tagsel server.
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// `GET /configs` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigsResponse {
    pub configs: Vec<Config>,
    pub saved_at: Option<Timestamp>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinnedBody {
    pinned_configs: Vec<ConfigId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveFileBody<'a> {
    file_name: &'a str,
    content: &'a str,
}

/// `POST /files` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub file_name: String,
    pub original_file_name: String,
    pub renamed: bool,
    pub file_size: u64,
    pub location: String,
    pub saved_at: Timestamp,
}

impl HttpBackend {
    /// Create a client for a server.
    ///
    /// * `api_url` - Base URL of the API tree, e.g. `http://host:5000/api/v1`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a client with the configured request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone()))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    /// Fetch the stored catalog; `None` when the server has none.
    pub async fn get_catalog(&self) -> Result<Option<FeatureCatalog>, ClientError> {
        let response = self.client.get(self.url("/catalog")).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::parse_data(response).await.map(Some)
    }

    pub async fn put_catalog(&self, catalog: &FeatureCatalog) -> Result<(), ClientError> {
        let body = serde_json::json!({ "data": catalog });
        let response = self.client.put(self.url("/catalog")).json(&body).send().await?;
        Self::check_status(response).await
    }

    pub async fn get_configs(&self) -> Result<ConfigsResponse, ClientError> {
        let response = self.client.get(self.url("/configs")).send().await?;
        Self::parse_data(response).await
    }

    pub async fn put_configs(&self, configs: &[Config]) -> Result<(), ClientError> {
        let body = serde_json::json!({ "configs": configs });
        let response = self.client.put(self.url("/configs")).json(&body).send().await?;
        Self::check_status(response).await
    }

    pub async fn get_pinned(&self) -> Result<Vec<ConfigId>, ClientError> {
        let response = self.client.get(self.url("/pinned")).send().await?;
        let body: PinnedBody = Self::parse_data(response).await?;
        Ok(body.pinned_configs)
    }

    pub async fn put_pinned(&self, ids: &[ConfigId]) -> Result<(), ClientError> {
        let body = PinnedBody {
            pinned_configs: ids.to_vec(),
        };
        let response = self.client.put(self.url("/pinned")).json(&body).send().await?;
        Self::check_status(response).await
    }

    /// Upload a generated file. The server renames on collision.
    pub async fn post_file(&self, file_name: &str, content: &str) -> Result<FileResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/files"))
            .json(&SaveFileBody { file_name, content })
            .send()
            .await?;
        Self::parse_data(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ClientError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful `{ "data": T }` body.
    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        let envelope = response.json::<Envelope<T>>().await?;
        Ok(envelope.data)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ClientError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigBackend for HttpBackend {
    fn label(&self) -> &'static str {
        "http"
    }

    async fn load_configs(&self) -> Result<Vec<Config>, CoreError> {
        Ok(self.get_configs().await?.configs)
    }

    async fn save_configs(&self, configs: &[Config]) -> Result<(), CoreError> {
        Ok(self.put_configs(configs).await?)
    }

    async fn load_pinned(&self) -> Result<Vec<ConfigId>, CoreError> {
        Ok(self.get_pinned().await?)
    }

    async fn save_pinned(&self, ids: &[ConfigId]) -> Result<(), CoreError> {
        Ok(self.put_pinned(ids).await?)
    }

    async fn load_catalog_snapshot(&self) -> Result<Option<FeatureCatalog>, CoreError> {
        let catalog = self.get_catalog().await?;
        if let Some(catalog) = &catalog {
            catalog.validate()?;
        }
        Ok(catalog)
    }

    async fn save_catalog_snapshot(&self, catalog: &FeatureCatalog) -> Result<(), CoreError> {
        Ok(self.put_catalog(catalog).await?)
    }

    async fn save_generated_file(&self, name: &str, content: &str) -> Result<SavedFile, CoreError> {
        let saved = self.post_file(name, content).await?;
        Ok(SavedFile {
            final_name: saved.file_name,
            renamed: saved.renamed,
            size: saved.file_size,
            location: saved.location,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let api = HttpBackend::new("http://localhost:5000/api/v1/");
        assert_eq!(api.api_url(), "http://localhost:5000/api/v1");
        assert_eq!(api.url("/configs"), "http://localhost:5000/api/v1/configs");
    }

    #[test]
    fn api_errors_keep_their_meaning() {
        let conflict: CoreError = ClientError::ApiError {
            status: 409,
            body: "dup".into(),
        }
        .into();
        assert!(matches!(conflict, CoreError::Conflict(_)));

        let server: CoreError = ClientError::ApiError {
            status: 500,
            body: "boom".into(),
        }
        .into();
        assert!(matches!(server, CoreError::Persistence(_)));
    }
}
