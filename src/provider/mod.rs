//! # Batch Provider
//!
//! HTTP client for an OpenAI-compatible batch API: file upload, batch
//! creation, status polling and output download.

pub mod errors;
pub mod openai_client;

pub use errors::{ProviderError, ProviderResult};
pub use openai_client::OpenAiBatchClient;
