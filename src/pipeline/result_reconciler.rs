//! # Result Reconciler
//!
//! Maps the provider's per-item results back onto the submitted jobs and
//! decides each job's fate. For successes the vector is written first and the
//! queue message deleted second; a job whose vector was never stored is never
//! acknowledged.
//!
//! Result lines arrive unordered and possibly short: unknown `custom_id`s are
//! discarded, and any submitted job left without a line fails with a
//! missing-result reason, so the report always accounts for every job.

use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::traits::{BatchProvider, ContentStore, JobQueue};
use crate::error::JobError;
use crate::models::{BatchReport, BatchStatus, EnrichedJob, ExternalBatchJob, ExternalResultItem, Job};

/// Decision taken for one result line before any side effect runs
#[derive(Debug)]
enum Resolution {
    Persist { job: Job, vector: Vec<f32> },
    Failed { job: Job, error: JobError },
}

pub struct ResultReconciler {
    provider: Arc<dyn BatchProvider>,
    store: Arc<dyn ContentStore>,
    queue: Arc<dyn JobQueue>,
    write_concurrency: usize,
}

impl ResultReconciler {
    pub fn new(
        provider: Arc<dyn BatchProvider>,
        store: Arc<dyn ContentStore>,
        queue: Arc<dyn JobQueue>,
        write_concurrency: usize,
    ) -> Self {
        Self {
            provider,
            store,
            queue,
            write_concurrency: write_concurrency.max(1),
        }
    }

    /// Reconcile a terminal batch against the jobs that were submitted
    #[instrument(skip(self, batch, jobs), fields(batch_id = %batch.id, status = %batch.status))]
    pub async fn reconcile(&self, batch: &ExternalBatchJob, jobs: Vec<EnrichedJob>) -> BatchReport {
        let mut report = BatchReport::new();
        let unresolved = || jobs.iter().map(|enriched| enriched.job.clone());

        if batch.status != BatchStatus::Completed {
            let error = JobError::BatchTerminated {
                status: batch.status.to_string(),
                message: batch
                    .first_error_message()
                    .unwrap_or("Unknown batch error")
                    .to_string(),
            };
            error!(errors = ?batch.errors, "Batch job finished without completing");
            report.fail_all(unresolved(), &error);
            return report;
        }

        let Some(output_file_id) = batch.output_file_id.as_deref() else {
            error!("Batch job completed but no output file ID found");
            report.fail_all(unresolved(), &JobError::MissingOutputFile);
            return report;
        };

        info!(output_file_id, "Downloading batch results");
        let output = match self.provider.download_file(output_file_id).await {
            Ok(output) => output,
            Err(e) => {
                error!(output_file_id, error = %e, "Failed to download batch results");
                report.fail_all(unresolved(), &JobError::result_download(e.to_string()));
                return report;
            }
        };

        self.reconcile_output(&output, jobs).await
    }

    /// Reconcile already-downloaded result file contents
    pub async fn reconcile_output(&self, output: &str, jobs: Vec<EnrichedJob>) -> BatchReport {
        let submission_order: Vec<String> = jobs.iter().map(|e| e.job.custom_id()).collect();
        let mut pending: HashMap<String, Job> = jobs
            .into_iter()
            .map(|enriched| (enriched.job.custom_id(), enriched.job))
            .collect();
        let mut resolved: HashSet<String> = HashSet::with_capacity(pending.len());
        let mut resolutions = Vec::with_capacity(pending.len());

        for (line_number, line) in output.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let item = match ExternalResultItem::from_line(line) {
                Ok(item) => item,
                Err(e) => {
                    warn!(line_number, error = %e, "Skipping unparseable result line");
                    continue;
                }
            };

            let Some(job) = pending.remove(&item.custom_id) else {
                if resolved.contains(&item.custom_id) {
                    warn!(custom_id = %item.custom_id, "Ignoring repeated result for custom_id");
                } else {
                    warn!(custom_id = %item.custom_id, "Received result for unknown custom_id");
                }
                continue;
            };
            resolved.insert(item.custom_id.clone());

            let resolution = match item.successful_embedding() {
                Some(vector) => Resolution::Persist {
                    job,
                    vector: vector.to_vec(),
                },
                None => {
                    let error = JobError::result_item(item.failure_message());
                    error!(
                        job_id = job.job_id,
                        custom_id = %item.custom_id,
                        error = %error,
                        "Embedding failed for job"
                    );
                    Resolution::Failed { job, error }
                }
            };
            resolutions.push(resolution);
        }

        let outcomes: Vec<(Job, Result<(), JobError>)> = stream::iter(resolutions)
            .map(|resolution| async move {
                match resolution {
                    Resolution::Persist { job, vector } => {
                        let result = self.persist(&job, &vector).await;
                        (job, result)
                    }
                    Resolution::Failed { job, error } => (job, Err(error)),
                }
            })
            .buffered(self.write_concurrency)
            .collect()
            .await;

        let mut report = BatchReport::new();
        for (job, outcome) in outcomes {
            match outcome {
                Ok(()) => report.record_completed(job),
                Err(error) => report.record_failed(job, &error),
            }
        }

        for custom_id in submission_order {
            if let Some(job) = pending.remove(&custom_id) {
                let error = JobError::MissingResult { job_id: job.job_id };
                warn!(job_id = job.job_id, "No result line for submitted job");
                report.record_failed(job, &error);
            }
        }

        debug!(
            completed = report.completed_count(),
            failed = report.failed_count(),
            "Reconciliation finished"
        );
        report
    }

    /// Write the vector, then acknowledge the queue message
    #[instrument(skip(self, job, vector), fields(job_id = job.job_id))]
    async fn persist(&self, job: &Job, vector: &[f32]) -> Result<(), JobError> {
        let affected = self.store.update_vector(job, vector).await.map_err(|e| {
            error!(error = %e, "Error updating embedding");
            JobError::storage_write(e.to_string())
        })?;

        if affected == 0 {
            warn!(row = %job.row_label(), "Row not found during update (maybe deleted?)");
            return Err(JobError::RowDisappeared {
                schema: job.schema_name.clone(),
                table: job.table_name.clone(),
                row_id: job.row_id.clone(),
            });
        }

        // The vector is durable at this point; a failed delete only risks redelivery
        match self.queue.delete(job.job_id).await {
            Ok(true) => debug!("Job deleted from queue"),
            Ok(false) => warn!("Job was not present in queue when acknowledging"),
            Err(e) => {
                let error = JobError::QueueDelete {
                    job_id: job.job_id,
                    message: e.to_string(),
                };
                warn!(error = %error, "Queue entry may be redelivered; check manually");
            }
        }

        info!("Stored embedding for job");
        Ok(())
    }
}
