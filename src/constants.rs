//! # System Constants
//!
//! Defaults for the queue, the batch provider and the polling loop. All of
//! them can be overridden through configuration.

/// pgmq queue holding pending embedding jobs
pub const DEFAULT_QUEUE_NAME: &str = "embedding_jobs";

/// Embedding model requested for every batch item
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Provider endpoint each batch line targets
pub const DEFAULT_BATCH_ENDPOINT: &str = "/v1/embeddings";

/// Completion window requested when creating a batch
pub const DEFAULT_COMPLETION_WINDOW: &str = "24h";

/// Delay between two status polls of a running batch
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;

pub const DEFAULT_FETCH_CONCURRENCY: usize = 1;

pub const DEFAULT_WRITE_CONCURRENCY: usize = 1;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// HTTP method written into every batch request line
pub const BATCH_REQUEST_METHOD: &str = "POST";

/// `purpose` form field for batch input uploads
pub const BATCH_FILE_PURPOSE: &str = "batch";

/// Prefix and suffix of staged batch input files
pub const STAGING_FILE_PREFIX: &str = "embedding-batch-";
pub const STAGING_FILE_SUFFIX: &str = ".jsonl";
