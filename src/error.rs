//! # Pipeline Error Types
//!
//! Two families of errors flow through a batch run:
//!
//! - [`PipelineError`] aborts the whole invocation before a report exists
//!   (malformed payloads, unusable configuration).
//! - [`JobError`] is attached to a single job and becomes the `reason` of a
//!   [`FailedJob`](crate::models::FailedJob). Bulk stages (upload, creation,
//!   polling) produce one `JobError` that is applied to every unresolved job.

use crate::config::ConfigurationError;
use crate::models::RowId;
use thiserror::Error;

/// Errors that prevent a report from being produced at all
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Payload is not an array of well-formed job descriptors (400-equivalent)
    #[error("Malformed batch: {message}")]
    MalformedBatch { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Startup error: {component}: {message}")]
    Startup { component: String, message: String },
}

impl PipelineError {
    /// Create a malformed batch error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedBatch {
            message: message.into(),
        }
    }

    /// Create a startup error for a collaborator that could not be constructed
    pub fn startup(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Startup {
            component: component.into(),
            message: message.into(),
        }
    }

    /// True for errors the transport layer should render as a client error
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedBatch { .. })
    }
}

/// Per-job failure taxonomy; the `Display` output is the reason reported to callers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    #[error("Row not found: {schema}.{table}/{row_id}")]
    RowNotFound {
        schema: String,
        table: String,
        row_id: RowId,
    },

    #[error("Invalid or empty content received from {function} for {schema}.{table}/{row_id}")]
    EmptyContent {
        function: String,
        schema: String,
        table: String,
        row_id: RowId,
    },

    #[error("Database error fetching content: {message}")]
    ContentFetch { message: String },

    #[error("Failed to submit batch: {message}")]
    BatchUpload { message: String },

    #[error("Failed to create batch job: {message}")]
    BatchCreation { message: String },

    #[error("Failed while polling batch job: {message}")]
    BatchPolling { message: String },

    #[error("Timed out waiting for batch job {batch_id} to finish")]
    BatchTimedOut { batch_id: String },

    #[error("Batch {status}: {message}")]
    BatchTerminated { status: String, message: String },

    #[error("Batch completed but no output file ID was provided")]
    MissingOutputFile,

    #[error("Failed to process batch results: {message}")]
    ResultDownload { message: String },

    #[error("Batch item error: {message}")]
    ResultItem { message: String },

    #[error("Database error updating embedding: {message}")]
    StorageWrite { message: String },

    #[error("Row {schema}.{table}/{row_id} disappeared before update")]
    RowDisappeared {
        schema: String,
        table: String,
        row_id: RowId,
    },

    #[error("Missing result for job {job_id} in batch output")]
    MissingResult { job_id: i64 },

    /// Never reported; queue deletion failures are logged only
    #[error("Failed to delete job {job_id} from queue: {message}")]
    QueueDelete { job_id: i64, message: String },
}

impl JobError {
    pub fn content_fetch(message: impl Into<String>) -> Self {
        Self::ContentFetch {
            message: message.into(),
        }
    }

    pub fn batch_upload(message: impl Into<String>) -> Self {
        Self::BatchUpload {
            message: message.into(),
        }
    }

    pub fn batch_creation(message: impl Into<String>) -> Self {
        Self::BatchCreation {
            message: message.into(),
        }
    }

    pub fn batch_polling(message: impl Into<String>) -> Self {
        Self::BatchPolling {
            message: message.into(),
        }
    }

    pub fn result_download(message: impl Into<String>) -> Self {
        Self::ResultDownload {
            message: message.into(),
        }
    }

    pub fn result_item(message: impl Into<String>) -> Self {
        Self::ResultItem {
            message: message.into(),
        }
    }

    pub fn storage_write(message: impl Into<String>) -> Self {
        Self::StorageWrite {
            message: message.into(),
        }
    }

    /// Whether this error fails every unresolved job rather than a single one
    pub fn is_bulk(&self) -> bool {
        matches!(
            self,
            Self::BatchUpload { .. }
                | Self::BatchCreation { .. }
                | Self::BatchPolling { .. }
                | Self::BatchTimedOut { .. }
                | Self::BatchTerminated { .. }
                | Self::MissingOutputFile
                | Self::ResultDownload { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
