//! # Batch Reconciliation Pipeline
//!
//! JobIntake → ContentFetcher → BatchSubmitter → BatchWaiter → ResultReconciler,
//! assembled by [`BatchPipeline`].

pub mod batch_submitter;
pub mod batch_waiter;
pub mod content_fetcher;
pub mod intake;
pub mod orchestrator;
pub mod result_reconciler;
pub mod traits;

pub use batch_submitter::{serialize_jsonl, BatchSubmitter, SubmitterSettings};
pub use batch_waiter::{BatchWaiter, WaitOutcome};
pub use content_fetcher::{ContentFetcher, FetchOutcome};
pub use intake::JobIntake;
pub use orchestrator::{BatchPipeline, Collaborators, PipelineSettings};
pub use result_reconciler::ResultReconciler;
pub use traits::{BatchProvider, Clock, ContentStore, FetchedContent, JobQueue, TokioClock};
