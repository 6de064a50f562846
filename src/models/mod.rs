//! # Data Model
//!
//! Jobs as they arrive from the queue, the intermediate forms they take while a
//! batch is in flight, and the report that partitions them at the end.

pub mod batch;
pub mod job;
pub mod report;

pub use batch::{
    BatchErrorDetail, BatchErrors, BatchRequestBody, BatchRequestItem, BatchStatus,
    CreateBatchRequest, ExternalBatchJob, ExternalResultItem,
};
pub use job::{EnrichedJob, Job, RowId};
pub use report::{BatchReport, FailedJob};
