//! Job descriptors as produced by the queue trigger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of the row a job refers to; producers send either form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(id) => write!(f, "{id}"),
            RowId::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        RowId::Int(id)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        RowId::Text(id.to_string())
    }
}

/// One pending "embed this row" request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: i64,
    #[serde(rename = "id")]
    pub row_id: RowId,
    #[serde(rename = "schema")]
    pub schema_name: String,
    #[serde(rename = "table")]
    pub table_name: String,
    #[serde(rename = "contentFunction")]
    pub content_function_name: String,
    #[serde(rename = "embeddingColumn")]
    pub embedding_column_name: String,
}

impl Job {
    /// Correlation key sent to the batch provider as `custom_id`
    pub fn custom_id(&self) -> String {
        self.job_id.to_string()
    }

    /// `schema.table/row` label used in logs and failure reasons
    pub fn row_label(&self) -> String {
        format!("{}.{}/{}", self.schema_name, self.table_name, self.row_id)
    }
}

/// A job whose content was fetched and is ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedJob {
    pub job: Job,
    /// Trimmed, never empty
    pub content: String,
}

impl EnrichedJob {
    /// Returns `None` when the content is blank after trimming
    pub fn new(job: Job, content: &str) -> Option<Self> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            job,
            content: trimmed.to_string(),
        })
    }

    pub fn job_id(&self) -> i64 {
        self.job.job_id
    }
}
