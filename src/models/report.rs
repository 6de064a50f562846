//! # Batch Report
//!
//! Aggregate outcome of one pipeline run. Every job that passed intake ends in
//! exactly one of the two lists.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;

use super::job::Job;
use crate::error::JobError;

/// A job together with the reason it could not be completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedJob {
    #[serde(flatten)]
    pub job: Job,
    pub reason: String,
}

impl FailedJob {
    pub fn new(job: Job, error: &JobError) -> Self {
        Self {
            job,
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    completed: Vec<Job>,
    failed: Vec<FailedJob>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completed(&mut self, job: Job) {
        self.completed.push(job);
    }

    pub fn record_failed(&mut self, job: Job, error: &JobError) {
        self.failed.push(FailedJob::new(job, error));
    }

    /// Apply one bulk failure reason to every job in `jobs`
    pub fn fail_all<I>(&mut self, jobs: I, error: &JobError)
    where
        I: IntoIterator<Item = Job>,
    {
        let reason = error.to_string();
        self.failed.extend(jobs.into_iter().map(|job| FailedJob {
            job,
            reason: reason.clone(),
        }));
    }

    /// Append another report's outcomes after this one's
    pub fn merge(&mut self, other: BatchReport) {
        self.completed.extend(other.completed);
        self.failed.extend(other.failed);
    }

    pub fn completed_jobs(&self) -> &[Job] {
        &self.completed
    }

    pub fn failed_jobs(&self) -> &[FailedJob] {
        &self.failed
    }

    pub fn completed_job_ids(&self) -> Vec<i64> {
        self.completed.iter().map(|job| job.job_id).collect()
    }

    pub fn failed_job_ids(&self) -> Vec<i64> {
        self.failed.iter().map(|failed| failed.job.job_id).collect()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    /// Reason recorded for `job_id`, if it failed
    pub fn failure_reason(&self, job_id: i64) -> Option<&str> {
        self.failed
            .iter()
            .find(|failed| failed.job.job_id == job_id)
            .map(|failed| failed.reason.as_str())
    }

    /// True when every input job appears exactly once across both lists
    pub fn is_partition_of(&self, input: &[Job]) -> bool {
        if self.total() != input.len() {
            return false;
        }

        let mut seen = HashSet::with_capacity(input.len());
        let reported = self
            .completed
            .iter()
            .map(|job| job.job_id)
            .chain(self.failed.iter().map(|failed| failed.job.job_id));
        for job_id in reported {
            if !seen.insert(job_id) {
                return false;
            }
        }

        input.iter().all(|job| seen.contains(&job.job_id))
    }
}

/// Response body shape: `{"completedJobIds": [...], "failedJobDetails": [...]}`
impl Serialize for BatchReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("BatchReport", 2)?;
        state.serialize_field("completedJobIds", &self.completed_job_ids())?;
        state.serialize_field("failedJobDetails", &self.failed)?;
        state.end()
    }
}
