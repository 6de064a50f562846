//! # Content Fetcher
//!
//! Resolves each job to the text it must embed. Failures are isolated per job:
//! a missing row, blank content or a storage error fails that job only.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use super::traits::ContentStore;
use crate::error::JobError;
use crate::models::{BatchReport, EnrichedJob, Job};

/// Jobs with usable content plus the failures collected while fetching
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub enriched: Vec<EnrichedJob>,
    pub report: BatchReport,
}

pub struct ContentFetcher {
    store: Arc<dyn ContentStore>,
    concurrency: usize,
}

impl ContentFetcher {
    pub fn new(store: Arc<dyn ContentStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch content for every job; output keeps input order
    pub async fn fetch_all(&self, jobs: Vec<Job>) -> FetchOutcome {
        let results: Vec<(Job, Result<String, JobError>)> = stream::iter(jobs)
            .map(|job| async move {
                let result = self.fetch_one(&job).await;
                (job, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut outcome = FetchOutcome::default();
        for (job, result) in results {
            match result {
                Ok(content) => outcome.enriched.push(EnrichedJob { job, content }),
                Err(err) => {
                    error!(job_id = job.job_id, error = %err, "Failed to fetch content for job");
                    outcome.report.record_failed(job, &err);
                }
            }
        }

        debug!(
            "{} jobs prepared for batch embedding, {} failed during content fetch",
            outcome.enriched.len(),
            outcome.report.failed_count()
        );
        outcome
    }

    /// Resolve one job to trimmed, non-empty content
    #[instrument(skip(self, job), fields(job_id = job.job_id))]
    pub async fn fetch_one(&self, job: &Job) -> Result<String, JobError> {
        let row = self
            .store
            .fetch_content(job)
            .await
            .map_err(|e| JobError::content_fetch(e.to_string()))?;

        let Some(row) = row else {
            warn!(row = %job.row_label(), "Row not found");
            return Err(JobError::RowNotFound {
                schema: job.schema_name.clone(),
                table: job.table_name.clone(),
                row_id: job.row_id.clone(),
            });
        };

        match row.content.as_deref().map(str::trim) {
            Some(content) if !content.is_empty() => Ok(content.to_string()),
            _ => Err(JobError::EmptyContent {
                function: job.content_function_name.clone(),
                schema: job.schema_name.clone(),
                table: job.table_name.clone(),
                row_id: job.row_id.clone(),
            }),
        }
    }
}
