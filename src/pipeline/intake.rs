//! # Job Intake
//!
//! Decodes and validates the raw job payload. Any problem rejects the whole
//! request; no partial acceptance happens here.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::models::Job;

pub struct JobIntake;

impl JobIntake {
    /// Decode a raw request body into jobs, preserving order
    pub fn decode(payload: &[u8]) -> Result<Vec<Job>> {
        let value: Value = serde_json::from_slice(payload).map_err(|e| {
            warn!(error = %e, "Rejected batch payload: invalid JSON");
            PipelineError::malformed(format!("Invalid JSON format: {e}"))
        })?;
        Self::decode_value(value)
    }

    /// Validate an already-parsed JSON value
    pub fn decode_value(value: Value) -> Result<Vec<Job>> {
        let Value::Array(items) = value else {
            return Err(PipelineError::malformed(
                "Invalid request body: expected an array of jobs",
            ));
        };

        let mut jobs = Vec::with_capacity(items.len());
        let mut seen_ids = HashSet::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            if !item.is_object() {
                return Err(PipelineError::malformed(format!(
                    "Invalid request body: job[{index}] is not an object"
                )));
            }

            let job = Job::deserialize(item).map_err(|e| {
                PipelineError::malformed(format!("Invalid request body: job[{index}]: {e}"))
            })?;

            Self::validate_fields(index, &job)?;

            // customId is derived from jobId; duplicates would merge results
            if !seen_ids.insert(job.job_id) {
                return Err(PipelineError::malformed(format!(
                    "Invalid request body: job[{index}] repeats jobId {}",
                    job.job_id
                )));
            }

            jobs.push(job);
        }

        debug!("Received {} jobs to process", jobs.len());
        Ok(jobs)
    }

    fn validate_fields(index: usize, job: &Job) -> Result<()> {
        let fields = [
            ("schema", &job.schema_name),
            ("table", &job.table_name),
            ("contentFunction", &job.content_function_name),
            ("embeddingColumn", &job.embedding_column_name),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(PipelineError::malformed(format!(
                    "Invalid request body: job[{index}]: field `{name}` must be a non-empty string"
                )));
            }
        }
        Ok(())
    }
}
