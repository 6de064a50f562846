//! # Batch Submitter
//!
//! Packages enriched jobs into one JSONL input file, uploads it and starts the
//! external batch job. Failures here are all-or-nothing for the batch.
//!
//! The input file is staged on local disk for the duration of the upload and
//! removed on every exit path: explicitly after the upload attempt, and by
//! `NamedTempFile`'s drop if the future is cancelled mid-upload.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, instrument, warn};

use super::traits::BatchProvider;
use crate::constants::{STAGING_FILE_PREFIX, STAGING_FILE_SUFFIX};
use crate::error::JobError;
use crate::models::{BatchRequestItem, CreateBatchRequest, EnrichedJob, ExternalBatchJob};

/// Provider-facing settings for batch submission
#[derive(Debug, Clone)]
pub struct SubmitterSettings {
    pub model: String,
    pub endpoint: String,
    pub completion_window: String,
    /// System temp dir when `None`
    pub staging_dir: Option<PathBuf>,
}

pub struct BatchSubmitter {
    provider: Arc<dyn BatchProvider>,
    settings: SubmitterSettings,
}

impl BatchSubmitter {
    pub fn new(provider: Arc<dyn BatchProvider>, settings: SubmitterSettings) -> Self {
        Self { provider, settings }
    }

    /// One request line per job, keyed by the stringified job id
    pub fn build_request_items(&self, jobs: &[EnrichedJob]) -> Vec<BatchRequestItem> {
        jobs.iter()
            .map(|enriched| {
                BatchRequestItem::new(
                    enriched.job.custom_id(),
                    self.settings.endpoint.as_str(),
                    enriched.content.as_str(),
                    self.settings.model.as_str(),
                )
            })
            .collect()
    }

    /// Upload the input file and create the batch job
    #[instrument(skip(self, jobs), fields(job_count = jobs.len()))]
    pub async fn submit(&self, jobs: &[EnrichedJob]) -> Result<ExternalBatchJob, JobError> {
        let items = self.build_request_items(jobs);
        let jsonl = serialize_jsonl(&items).map_err(|e| JobError::batch_upload(e.to_string()))?;

        let file_id = self.stage_and_upload(&jsonl).await?;
        info!(file_id = %file_id, "Batch input file uploaded");

        let request = CreateBatchRequest {
            input_file_id: file_id,
            endpoint: self.settings.endpoint.clone(),
            completion_window: self.settings.completion_window.clone(),
        };

        let batch = self.provider.create_batch(&request).await.map_err(|e| {
            error!(error = %e, "Failed to create batch job");
            JobError::batch_creation(e.to_string())
        })?;

        info!(
            batch_id = %batch.id,
            status = %batch.status,
            "Batch job created"
        );
        Ok(batch)
    }

    async fn stage_and_upload(&self, jsonl: &str) -> Result<String, JobError> {
        let staged = self.stage(jsonl).map_err(|e| {
            error!(error = %e, "Failed to stage batch input file");
            JobError::batch_upload(e.to_string())
        })?;

        let path = staged.path().to_path_buf();
        debug!(path = %path.display(), bytes = jsonl.len(), "Staged batch input file");

        let upload = self.provider.upload_file(&path).await;
        release_staged_file(staged, &path);

        upload.map_err(|e| {
            error!(error = %e, "Failed to upload batch input file");
            JobError::batch_upload(e.to_string())
        })
    }

    fn stage(&self, jsonl: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGING_FILE_PREFIX).suffix(STAGING_FILE_SUFFIX);

        let mut staged = match &self.settings.staging_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        staged.write_all(jsonl.as_bytes())?;
        staged.flush()?;
        Ok(staged)
    }
}

fn release_staged_file(staged: NamedTempFile, path: &Path) {
    if let Err(e) = staged.close() {
        warn!(
            path = %path.display(),
            error = %e,
            "Failed to delete staged batch input file"
        );
    }
}

/// Newline-delimited JSON, one request item per line
pub fn serialize_jsonl(items: &[BatchRequestItem]) -> Result<String, serde_json::Error> {
    let lines = items
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}
