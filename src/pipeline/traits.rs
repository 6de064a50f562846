//! # Collaborator Traits
//!
//! The pipeline talks to the outside world only through these seams. Handles
//! are constructed and owned by the caller and injected into
//! [`BatchPipeline`](super::BatchPipeline) as `Arc<dyn Trait>`.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::database::StoreError;
use crate::messaging::QueueError;
use crate::models::{CreateBatchRequest, ExternalBatchJob, Job, RowId};
use crate::provider::ProviderError;

/// Row returned by a content lookup
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedContent {
    pub row_id: RowId,
    /// `None` when the content function returned SQL `NULL`
    pub content: Option<String>,
}

/// Relational store holding the rows to embed
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Evaluate the job's content function against its row; `None` when no row matches
    async fn fetch_content(&self, job: &Job) -> Result<Option<FetchedContent>, StoreError>;

    /// Write `vector` into the job's embedding column, returning affected rows
    async fn update_vector(&self, job: &Job, vector: &[f32]) -> Result<u64, StoreError>;
}

/// Durable queue the jobs were read from
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Acknowledge a job; `Ok(false)` when the queue held no such message
    async fn delete(&self, job_id: i64) -> Result<bool, QueueError>;
}

/// Asynchronous batch inference service
#[async_trait]
pub trait BatchProvider: Send + Sync {
    /// Upload a staged JSONL file, returning the provider's file id
    async fn upload_file(&self, path: &Path) -> Result<String, ProviderError>;

    async fn create_batch(
        &self,
        request: &CreateBatchRequest,
    ) -> Result<ExternalBatchJob, ProviderError>;

    async fn get_batch(&self, batch_id: &str) -> Result<ExternalBatchJob, ProviderError>;

    /// Download a file's raw contents (newline-delimited JSON for batch output)
    async fn download_file(&self, file_id: &str) -> Result<String, ProviderError>;
}

/// Source of delays for the polling loop
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
