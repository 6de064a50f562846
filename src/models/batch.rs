//! # Batch Provider Types
//!
//! Request lines, batch descriptors and result lines exchanged with an
//! OpenAI-compatible batch inference service.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::BATCH_REQUEST_METHOD;

/// Lifecycle status of an external batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Validating,
    InProgress,
    Finalizing,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    /// Any status string this crate does not know; treated as non-terminal
    #[serde(other)]
    Unknown,
}

impl BatchStatus {
    /// No further transitions happen after a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::InProgress => "in_progress",
            Self::Finalizing => "finalizing",
            Self::Cancelling => "cancelling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub line: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchErrors {
    #[serde(default)]
    pub data: Vec<BatchErrorDetail>,
}

/// Batch job descriptor; only ever refreshed from the provider, never mutated locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalBatchJob {
    pub id: String,
    pub status: BatchStatus,
    #[serde(default)]
    pub output_file_id: Option<String>,
    #[serde(default)]
    pub error_file_id: Option<String>,
    #[serde(default)]
    pub errors: Option<BatchErrors>,
}

impl ExternalBatchJob {
    /// First error message reported by the provider for the batch as a whole
    pub fn first_error_message(&self) -> Option<&str> {
        self.errors
            .as_ref()
            .and_then(|errors| errors.data.first())
            .and_then(|detail| detail.message.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequestBody {
    pub input: String,
    pub model: String,
}

/// One line of the uploaded batch input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequestItem {
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: BatchRequestBody,
}

impl BatchRequestItem {
    pub fn new(
        custom_id: impl Into<String>,
        endpoint: impl Into<String>,
        input: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            custom_id: custom_id.into(),
            method: BATCH_REQUEST_METHOD.to_string(),
            url: endpoint.into(),
            body: BatchRequestBody {
                input: input.into(),
                model: model.into(),
            },
        }
    }
}

/// Body of the batch-creation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub input_file_id: String,
    pub endpoint: String,
    pub completion_window: String,
}

#[derive(Debug, Deserialize)]
struct ResultLine {
    custom_id: String,
    #[serde(default)]
    response: Option<ResultResponse>,
    #[serde(default)]
    error: Option<ResultLineError>,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    status_code: u16,
    #[serde(default)]
    body: Option<ResultResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResultResponseBody {
    #[serde(default)]
    data: Vec<EmbeddingData>,
    #[serde(default)]
    error: Option<ResultLineError>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ResultLineError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// One line of the downloaded result file, flattened to what reconciliation needs
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalResultItem {
    pub custom_id: String,
    pub embedding: Option<Vec<f32>>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub http_status: Option<u16>,
}

impl ExternalResultItem {
    /// Parse a single JSONL result line
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        let parsed: ResultLine = serde_json::from_str(line)?;

        let http_status = parsed.response.as_ref().map(|r| r.status_code);
        let body = parsed.response.and_then(|r| r.body);

        // Line-level errors take precedence over errors embedded in the response body
        let error = parsed
            .error
            .or_else(|| body.as_ref().and_then(|b| b.error.as_ref()).map(|e| ResultLineError {
                code: e.code.clone(),
                message: e.message.clone(),
            }));

        let embedding = body
            .and_then(|b| b.data.into_iter().next())
            .and_then(|d| d.embedding);

        Ok(Self {
            custom_id: parsed.custom_id,
            embedding,
            error_code: error.as_ref().and_then(|e| e.code.clone()),
            error_message: error.and_then(|e| e.message),
            http_status,
        })
    }

    /// The vector, if this item is a usable success
    pub fn successful_embedding(&self) -> Option<&[f32]> {
        if self.has_error() || self.http_status != Some(200) {
            return None;
        }
        self.embedding.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.error_code.is_some() || self.error_message.is_some()
    }

    /// Provider message for a failed item, or a synthesized one
    pub fn failure_message(&self) -> String {
        if let Some(message) = &self.error_message {
            return message.clone();
        }
        if let Some(code) = &self.error_code {
            return format!("embedding failed with error code {code}");
        }
        match self.http_status {
            Some(200) => "embedding data missing in successful response".to_string(),
            Some(status) => format!("embedding failed with status {status}"),
            None => "embedding failed with status unknown".to_string(),
        }
    }
}
