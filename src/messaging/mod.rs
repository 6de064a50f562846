//! # Messaging Module
//!
//! The queue collaborator. Jobs are read and redelivered by pgmq itself; this
//! crate only acknowledges completed jobs.

pub mod errors;
pub mod pgmq_client;

pub use errors::QueueError;
pub use pgmq_client::PgmqJobQueue;
