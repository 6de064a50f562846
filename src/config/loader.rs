//! Configuration Loader
//!
//! Layers built-in defaults, an optional TOML file and `EMBEDDING_BATCH_*`
//! environment variables using the `config` crate, then validates the result.

use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::EmbeddingBatchConfig;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "EMBEDDING_BATCH_CONFIG_PATH";

/// Prefix for per-field environment overrides, e.g. `EMBEDDING_BATCH_PROVIDER__MODEL`
pub const ENV_PREFIX: &str = "EMBEDDING_BATCH";

const DEFAULT_CONFIG_FILE: &str = "config/embedding-batch.toml";

pub struct ConfigManager {
    config: EmbeddingBatchConfig,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from the default locations and the process environment
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let explicit = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from(explicit.as_deref(), None)
    }

    /// Load from a specific file; the file must exist
    pub fn load_from_file(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from(Some(path), None)
    }

    /// Load with an explicit environment map instead of the process environment
    ///
    /// This is useful for testing without modifying global environment variables.
    pub fn load_with_env(
        path: Option<&Path>,
        environment: HashMap<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from(path, Some(environment))
    }

    fn load_from(
        explicit_path: Option<&Path>,
        environment: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let defaults = Config::try_from(&EmbeddingBatchConfig::default())?;

        let (file_path, required) = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigurationError::config_file_not_found(path));
                }
                (path.to_path_buf(), true)
            }
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let fallback_env = environment.clone();
        let env_source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("pipeline.allowed_tables")
            .source(environment);

        debug!(
            "Loading configuration from {} (required: {})",
            file_path.display(),
            required
        );

        let mut config: EmbeddingBatchConfig = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(file_path.as_path())
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .add_source(env_source)
            .build()?
            .try_deserialize()?;

        apply_conventional_fallbacks(&mut config, fallback_env.as_ref());
        config.validate()?;

        let source_file = file_path.exists().then_some(file_path);

        info!(
            queue = %config.queue.name,
            model = %config.provider.model,
            poll_interval_ms = config.pipeline.poll_interval_ms,
            source_file = ?source_file,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            source_file,
        }))
    }

    pub fn config(&self) -> &EmbeddingBatchConfig {
        &self.config
    }

    /// File the configuration was read from, if any
    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }
}

/// Fill empty credentials from the variables other tooling already sets
fn apply_conventional_fallbacks(
    config: &mut EmbeddingBatchConfig,
    environment: Option<&HashMap<String, String>>,
) {
    let lookup = |key: &str| match environment {
        Some(map) => map.get(key).cloned(),
        None => env::var(key).ok(),
    };

    if config.database.url.is_empty() {
        if let Some(url) = lookup("DATABASE_URL") {
            config.database.url = url;
        }
    }
    if config.provider.api_key.is_empty() {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            config.provider.api_key = key;
        }
    }
}
