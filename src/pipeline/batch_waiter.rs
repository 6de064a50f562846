//! # Batch Waiter
//!
//! Polls an external batch job until it reaches a terminal status. The loop is
//! a two-state machine (poll, then sleep) driven by an injected [`Clock`] and
//! bounded only by the caller's [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::traits::{BatchProvider, Clock};
use crate::error::JobError;
use crate::models::{BatchStatus, ExternalBatchJob};

/// How a wait ended when the status fetch itself never failed
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// The batch reached a terminal status
    Terminal { batch: ExternalBatchJob, polls: u32 },
    /// The token fired first; `batch` is the last observed descriptor
    Cancelled { batch: ExternalBatchJob, polls: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Fetching,
    Sleeping,
}

pub struct BatchWaiter {
    provider: Arc<dyn BatchProvider>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl BatchWaiter {
    pub fn new(
        provider: Arc<dyn BatchProvider>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            clock,
            poll_interval,
        }
    }

    /// Block until the batch is terminal or `cancel` fires
    ///
    /// Errors only when a status fetch fails; a batch that stays non-terminal
    /// keeps the loop going.
    #[instrument(skip(self, batch, cancel), fields(batch_id = %batch.id))]
    pub async fn wait(
        &self,
        batch: ExternalBatchJob,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome, JobError> {
        let batch_id = batch.id.clone();
        let mut current = batch;
        let mut polls: u32 = 0;
        let mut state = PollState::Fetching;

        loop {
            match state {
                PollState::Fetching => {
                    let fetched = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            warn!(polls, status = %current.status, "Batch wait cancelled");
                            return Ok(WaitOutcome::Cancelled { batch: current, polls });
                        }
                        fetched = self.provider.get_batch(&batch_id) => fetched,
                    };

                    current = fetched.map_err(|e| {
                        error!(error = %e, "Error polling batch job");
                        JobError::batch_polling(e.to_string())
                    })?;
                    polls += 1;

                    if current.status.is_terminal() {
                        info!(polls, status = %current.status, "Batch job reached terminal status");
                        return Ok(WaitOutcome::Terminal {
                            batch: current,
                            polls,
                        });
                    }

                    if current.status == BatchStatus::Unknown {
                        warn!("Batch job reported an unrecognized status, continuing to poll");
                    } else {
                        debug!(status = %current.status, "Batch job still running");
                    }
                    state = PollState::Sleeping;
                }
                PollState::Sleeping => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            warn!(polls, status = %current.status, "Batch wait cancelled");
                            return Ok(WaitOutcome::Cancelled { batch: current, polls });
                        }
                        _ = self.clock.sleep(self.poll_interval) => {}
                    }
                    state = PollState::Fetching;
                }
            }
        }
    }
}
