//! # Batch Pipeline
//!
//! Drives one batch of jobs through fetch, submit, wait and reconcile, and
//! folds every stage's failures into a single [`BatchReport`].
//!
//! Per-job failures never abort the run. Bulk failures (upload, creation,
//! polling, cancellation, non-completed batch) fail only the jobs that were
//! still unresolved when they happened.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::batch_submitter::{BatchSubmitter, SubmitterSettings};
use super::batch_waiter::{BatchWaiter, WaitOutcome};
use super::content_fetcher::{ContentFetcher, FetchOutcome};
use super::intake::JobIntake;
use super::result_reconciler::ResultReconciler;
use super::traits::{BatchProvider, Clock, ContentStore, JobQueue, TokioClock};
use crate::config::EmbeddingBatchConfig;
use crate::error::{JobError, Result};
use crate::logging::log_stage_outcome;
use crate::models::{BatchReport, Job};

/// Externally owned handles the pipeline works against
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ContentStore>,
    pub queue: Arc<dyn JobQueue>,
    pub provider: Arc<dyn BatchProvider>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Collaborators using the real tokio clock
    pub fn new(
        store: Arc<dyn ContentStore>,
        queue: Arc<dyn JobQueue>,
        provider: Arc<dyn BatchProvider>,
    ) -> Self {
        Self {
            store,
            queue,
            provider,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub poll_interval: Duration,
    pub fetch_concurrency: usize,
    pub write_concurrency: usize,
    pub submitter: SubmitterSettings,
}

impl PipelineSettings {
    pub fn from_config(config: &EmbeddingBatchConfig) -> Self {
        Self {
            poll_interval: config.pipeline.poll_interval(),
            fetch_concurrency: config.pipeline.fetch_concurrency,
            write_concurrency: config.pipeline.write_concurrency,
            submitter: SubmitterSettings {
                model: config.provider.model.clone(),
                endpoint: config.provider.endpoint.clone(),
                completion_window: config.provider.completion_window.clone(),
                staging_dir: config.pipeline.staging_dir.clone(),
            },
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&EmbeddingBatchConfig::default())
    }
}

pub struct BatchPipeline {
    fetcher: ContentFetcher,
    submitter: BatchSubmitter,
    waiter: BatchWaiter,
    reconciler: ResultReconciler,
}

impl BatchPipeline {
    pub fn new(collaborators: Collaborators, settings: PipelineSettings) -> Self {
        let Collaborators {
            store,
            queue,
            provider,
            clock,
        } = collaborators;

        Self {
            fetcher: ContentFetcher::new(store.clone(), settings.fetch_concurrency),
            submitter: BatchSubmitter::new(provider.clone(), settings.submitter),
            waiter: BatchWaiter::new(provider.clone(), clock, settings.poll_interval),
            reconciler: ResultReconciler::new(provider, store, queue, settings.write_concurrency),
        }
    }

    /// Decode a raw payload and run it; malformed payloads produce no report
    pub async fn run_payload(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let jobs = JobIntake::decode(payload)?;
        Ok(self.run_batch(jobs, cancel).await)
    }

    /// Run under a wall-clock deadline measured from the start of the run;
    /// unbounded when `max_wait` is `None`
    ///
    /// Content fetch, submission and reconciliation are not interrupted. Time
    /// they spend counts against the deadline, and once it has passed the
    /// waiter stops before its next poll and every submitted job times out.
    pub async fn run_batch_with_deadline(
        &self,
        jobs: Vec<Job>,
        max_wait: Option<Duration>,
    ) -> BatchReport {
        let cancel = CancellationToken::new();
        let deadline = max_wait.map(|limit| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!(limit_ms = limit.as_millis() as u64, "Batch deadline reached");
                token.cancel();
            })
        });

        let report = self.run_batch(jobs, &cancel).await;

        if let Some(handle) = deadline {
            handle.abort();
        }
        report
    }

    /// Process one batch start to finish
    #[instrument(skip(self, jobs, cancel), fields(job_count = jobs.len()))]
    pub async fn run_batch(&self, jobs: Vec<Job>, cancel: &CancellationToken) -> BatchReport {
        let FetchOutcome {
            enriched,
            mut report,
        } = self.fetcher.fetch_all(jobs).await;
        log_stage_outcome(
            "content_fetch",
            None,
            enriched.len(),
            report.failed_count(),
            None,
        );

        if enriched.is_empty() {
            info!("No jobs eligible for batch processing after content fetching");
            return report;
        }

        let batch = match self.submitter.submit(&enriched).await {
            Ok(batch) => batch,
            Err(error) => {
                fail_unresolved(&mut report, enriched.into_iter().map(|e| e.job), &error);
                return report;
            }
        };

        let batch = match self.waiter.wait(batch, cancel).await {
            Ok(WaitOutcome::Terminal { batch, polls }) => {
                info!(batch_id = %batch.id, polls, status = %batch.status, "Batch finished");
                batch
            }
            Ok(WaitOutcome::Cancelled { batch, .. }) => {
                let error = JobError::BatchTimedOut {
                    batch_id: batch.id.clone(),
                };
                fail_unresolved(&mut report, enriched.into_iter().map(|e| e.job), &error);
                return report;
            }
            Err(error) => {
                fail_unresolved(&mut report, enriched.into_iter().map(|e| e.job), &error);
                return report;
            }
        };

        let reconciled = self.reconciler.reconcile(&batch, enriched).await;
        log_stage_outcome(
            "reconcile",
            Some(&batch.id),
            reconciled.completed_count(),
            reconciled.failed_count(),
            None,
        );
        report.merge(reconciled);

        info!(
            "Finished processing jobs: {} completed, {} failed",
            report.completed_count(),
            report.failed_count()
        );
        report
    }
}

fn fail_unresolved<I>(report: &mut BatchReport, jobs: I, error: &JobError)
where
    I: IntoIterator<Item = Job>,
{
    let before = report.failed_count();
    report.fail_all(jobs, error);
    log_stage_outcome(
        "bulk_failure",
        None,
        0,
        report.failed_count() - before,
        Some(&error.to_string()),
    );
}
