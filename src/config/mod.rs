//! # Configuration
//!
//! Settings for the batch pipeline and its collaborators. Values are layered
//! by [`ConfigManager`]: built-in defaults, then an optional TOML file, then
//! `EMBEDDING_BATCH_*` environment variables.
//!
//! ```rust,no_run
//! use embedding_batch::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let poll_interval = manager.config().pipeline.poll_interval();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BATCH_ENDPOINT, DEFAULT_COMPLETION_WINDOW, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_FETCH_CONCURRENCY, DEFAULT_MAX_CONNECTIONS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_PROVIDER_BASE_URL, DEFAULT_QUEUE_NAME, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_WRITE_CONCURRENCY,
};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/embedding-batch.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingBatchConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub provider: ProviderConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Falls back to `DATABASE_URL` when empty
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUEUE_NAME.to_string(),
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Falls back to `OPENAI_API_KEY` when empty
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub completion_window: String,
    pub request_timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            endpoint: DEFAULT_BATCH_ENDPOINT.to_string(),
            completion_window: DEFAULT_COMPLETION_WINDOW.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("completion_window", &self.completion_window)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub poll_interval_ms: u64,
    /// Upper bound on simultaneous content lookups
    pub fetch_concurrency: usize,
    /// Upper bound on simultaneous vector writes during reconciliation
    pub write_concurrency: usize,
    /// Directory for staged batch input files; system temp dir when unset
    pub staging_dir: Option<PathBuf>,
    /// Whole-run deadline measured from the start of the run; once it passes the
    /// batch wait is cancelled. Unbounded when unset
    pub max_wait_ms: Option<u64>,
    /// `schema.table` pairs the store may touch; empty allows any valid identifier
    pub allowed_tables: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            write_concurrency: DEFAULT_WRITE_CONCURRENCY,
            staging_dir: None,
            max_wait_ms: None,
            allowed_tables: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

impl EmbeddingBatchConfig {
    /// Check invariants that deserialization alone cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.queue.name.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field("name", "queue"));
        }
        if !self
            .queue
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigurationError::invalid_value(
                "queue.name",
                self.queue.name.clone(),
                "queue names may only contain ASCII letters, digits and underscores",
            ));
        }
        if self.provider.model.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field("model", "provider"));
        }
        if !self.provider.endpoint.starts_with('/') {
            return Err(ConfigurationError::invalid_value(
                "provider.endpoint",
                self.provider.endpoint.clone(),
                "endpoint must be an absolute path such as /v1/embeddings",
            ));
        }
        if self.provider.completion_window.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "completion_window",
                "provider",
            ));
        }
        if self.provider.request_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "provider.request_timeout_ms",
                "0",
                "request timeout must be positive",
            ));
        }
        if self.pipeline.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "pipeline.poll_interval_ms",
                "0",
                "poll interval must be positive",
            ));
        }
        if self.pipeline.fetch_concurrency == 0 {
            return Err(ConfigurationError::invalid_value(
                "pipeline.fetch_concurrency",
                "0",
                "concurrency must be at least 1",
            ));
        }
        if self.pipeline.write_concurrency == 0 {
            return Err(ConfigurationError::invalid_value(
                "pipeline.write_concurrency",
                "0",
                "concurrency must be at least 1",
            ));
        }
        if let Some(entry) = self
            .pipeline
            .allowed_tables
            .iter()
            .find(|entry| entry.split('.').count() != 2)
        {
            return Err(ConfigurationError::invalid_value(
                "pipeline.allowed_tables",
                entry.clone(),
                "entries must have the form schema.table",
            ));
        }
        Ok(())
    }

    /// Additional checks for running against real collaborators
    pub fn validate_connections(&self) -> ConfigResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field("url", "database"));
        }
        if self.provider.api_key.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field("api_key", "provider"));
        }
        Ok(())
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "***".to_string()
    }
}
