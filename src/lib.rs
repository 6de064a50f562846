#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Embedding Batch
//!
//! Batch embedding pipeline for pgmq-queued jobs.
//!
//! ## Overview
//!
//! Each run takes one batch of embedding jobs (as read from a pgmq queue),
//! fetches the text for every job from PostgreSQL, submits all of it as a
//! single asynchronous batch to an OpenAI-compatible provider, waits for the
//! batch to finish, writes the returned vectors back to their rows and
//! acknowledges the jobs that were stored.
//!
//! Every job in the input ends up in exactly one of the two lists of the
//! resulting [`BatchReport`]: completed or failed with a reason.
//!
//! ## Module Organization
//!
//! - [`pipeline`] - Intake, fetch, submit, wait and reconcile stages
//! - [`models`] - Jobs, batch wire types and the report
//! - [`database`] - PostgreSQL content store
//! - [`messaging`] - pgmq queue acknowledgement
//! - [`provider`] - OpenAI batch API client
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use embedding_batch::config::ConfigManager;
//! use embedding_batch::database::{DatabaseConnection, IdentifierPolicy, PgContentStore};
//! use embedding_batch::messaging::PgmqJobQueue;
//! use embedding_batch::pipeline::{BatchPipeline, Collaborators, JobIntake, PipelineSettings};
//! use embedding_batch::provider::OpenAiBatchClient;
//!
//! # async fn example(payload: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let db = DatabaseConnection::connect(&config.database).await?;
//! let store = PgContentStore::new(db.pool().clone(), IdentifierPolicy::permissive());
//! let queue = PgmqJobQueue::new_with_pool(db.pool().clone(), &config.queue.name).await;
//! let provider = OpenAiBatchClient::new(&config.provider)?;
//!
//! let pipeline = BatchPipeline::new(
//!     Collaborators::new(Arc::new(store), Arc::new(queue), Arc::new(provider)),
//!     PipelineSettings::from_config(config),
//! );
//! let report = pipeline
//!     .run_batch_with_deadline(JobIntake::decode(payload)?, config.pipeline.max_wait())
//!     .await;
//! println!("{}", serde_json::to_string(&report)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod pipeline;
pub mod provider;

pub use config::{ConfigManager, EmbeddingBatchConfig};
pub use error::{JobError, PipelineError, Result};
pub use models::{BatchReport, EnrichedJob, ExternalBatchJob, FailedJob, Job, RowId};
pub use pipeline::{BatchPipeline, Collaborators, JobIntake, PipelineSettings};
