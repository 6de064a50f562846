//! # OpenAI Batch Client
//!
//! [`BatchProvider`] implementation over the OpenAI Files and Batches
//! endpoints. Requests are made once; retries are left to the caller, since
//! the pipeline treats any provider failure as a bulk failure for the batch.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info, instrument};

use super::errors::{ProviderError, ProviderResult};
use crate::config::ProviderConfig;
use crate::constants::BATCH_FILE_PURPOSE;
use crate::models::{CreateBatchRequest, ExternalBatchJob};
use crate::pipeline::BatchProvider;

const JSONL_MIME: &str = "application/jsonl";

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
}

pub struct OpenAiBatchClient {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for OpenAiBatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBatchClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiBatchClient {
    /// Build a client from provider configuration
    ///
    /// The API key is installed as a default `Authorization` header and is
    /// never logged.
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        Url::parse(&config.base_url)
            .map_err(|e| ProviderError::configuration(format!("Invalid base URL: {e}")))?;

        if config.api_key.is_empty() {
            return Err(ProviderError::configuration("API key is not set"));
        }

        let mut default_headers = reqwest::header::HeaderMap::new();
        let mut auth_value: reqwest::header::HeaderValue = format!("Bearer {}", config.api_key)
            .parse()
            .map_err(|e| ProviderError::configuration(format!("Invalid API key: {e}")))?;
        auth_value.set_sensitive(true);
        default_headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(format!("embedding-batch/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(default_headers)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        info!(
            base_url = %config.base_url,
            timeout_ms = config.request_timeout_ms,
            "Created batch provider client"
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Pass successful responses through; turn the rest into API errors
    async fn check(response: Response) -> ProviderResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = %status, error = %body, "Batch provider request failed");
        Err(ProviderError::api(status.as_u16(), body))
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> ProviderResult<T> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl BatchProvider for OpenAiBatchClient {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn upload_file(&self, path: &Path) -> Result<String, ProviderError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "batch_input.jsonl".to_string());
        debug!(bytes = bytes.len(), file_name = %file_name, "Uploading batch input file");

        let part = Part::bytes(bytes).file_name(file_name).mime_str(JSONL_MIME)?;
        let form = Form::new()
            .text("purpose", BATCH_FILE_PURPOSE)
            .part("file", part);

        let response = self
            .client
            .post(self.url("files"))
            .multipart(form)
            .send()
            .await?;
        let file: FileObject = Self::parse_json(Self::check(response).await?).await?;
        Ok(file.id)
    }

    #[instrument(skip(self, request), fields(input_file_id = %request.input_file_id))]
    async fn create_batch(
        &self,
        request: &CreateBatchRequest,
    ) -> Result<ExternalBatchJob, ProviderError> {
        let response = self
            .client
            .post(self.url("batches"))
            .json(request)
            .send()
            .await?;
        Self::parse_json(Self::check(response).await?).await
    }

    #[instrument(skip(self))]
    async fn get_batch(&self, batch_id: &str) -> Result<ExternalBatchJob, ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("batches/{batch_id}")))
            .send()
            .await?;
        Self::parse_json(Self::check(response).await?).await
    }

    #[instrument(skip(self))]
    async fn download_file(&self, file_id: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("files/{file_id}/content")))
            .send()
            .await?;
        Ok(Self::check(response).await?.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config(base_url: &str, api_key: &str) -> ProviderConfig {
        ProviderConfig {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_urls_are_joined_under_base_path() {
        let client = OpenAiBatchClient::new(&provider_config("https://api.example.com/v1/", "sk-test"))
            .unwrap();

        assert_eq!(client.base_url(), "https://api.example.com/v1");
        assert_eq!(client.url("files"), "https://api.example.com/v1/files");
        assert_eq!(
            client.url("/batches/batch_1"),
            "https://api.example.com/v1/batches/batch_1"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = OpenAiBatchClient::new(&provider_config("not a url", "sk-test")).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_rejects_missing_api_key() {
        let err = OpenAiBatchClient::new(&provider_config("https://api.example.com/v1", ""))
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_debug_does_not_expose_api_key() {
        let client =
            OpenAiBatchClient::new(&provider_config("https://api.example.com/v1", "sk-secret"))
                .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("api.example.com"));
    }
}
