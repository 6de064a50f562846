//! Proptest strategies for generating batches with mixed per-job outcomes

#![allow(dead_code)]

use proptest::prelude::*;

/// What happens to a single job over the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFate {
    Embedded,
    MissingRow,
    BlankContent,
    FetchError,
    ItemError,
    NoResultLine,
    RowGone,
    WriteError,
    DeleteFails,
}

impl JobFate {
    /// Whether the job should be reported completed when the batch itself completes
    pub fn completes(self) -> bool {
        matches!(self, JobFate::Embedded | JobFate::DeleteFails)
    }
}

/// Outcome of the external batch as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFate {
    Completed,
    Failed,
    UploadFails,
    PollFails,
}

pub fn job_fate_strategy() -> impl Strategy<Value = JobFate> {
    prop_oneof![
        4 => Just(JobFate::Embedded),
        1 => Just(JobFate::MissingRow),
        1 => Just(JobFate::BlankContent),
        1 => Just(JobFate::FetchError),
        1 => Just(JobFate::ItemError),
        1 => Just(JobFate::NoResultLine),
        1 => Just(JobFate::RowGone),
        1 => Just(JobFate::WriteError),
        1 => Just(JobFate::DeleteFails),
    ]
}

pub fn batch_fate_strategy() -> impl Strategy<Value = BatchFate> {
    prop_oneof![
        6 => Just(BatchFate::Completed),
        1 => Just(BatchFate::Failed),
        1 => Just(BatchFate::UploadFails),
        1 => Just(BatchFate::PollFails),
    ]
}

/// Up to 24 jobs with distinct ids in shuffled order, each with its own fate
pub fn job_fates_strategy() -> impl Strategy<Value = Vec<(i64, JobFate)>> {
    prop::collection::btree_set(1i64..10_000, 0..24)
        .prop_flat_map(|ids| {
            let len = ids.len();
            (
                Just(ids.into_iter().collect::<Vec<i64>>()),
                prop::collection::vec(job_fate_strategy(), len),
            )
        })
        .prop_map(|(ids, fates)| ids.into_iter().zip(fates).collect::<Vec<_>>())
        .prop_shuffle()
}
