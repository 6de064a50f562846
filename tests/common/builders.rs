//! Test data builders for jobs, batch descriptors and result lines

#![allow(dead_code)] // Each test binary uses a different subset

use embedding_batch::models::{BatchErrorDetail, BatchErrors, BatchStatus, EnrichedJob, ExternalBatchJob, Job, RowId};
use serde_json::json;

pub const TEST_BATCH_ID: &str = "batch_test";
pub const TEST_OUTPUT_FILE_ID: &str = "file-output";

/// Job against `public.documents` whose row id is derived from the job id
pub fn job(job_id: i64) -> Job {
    Job {
        job_id,
        row_id: RowId::Int(job_id + 100),
        schema_name: "public".to_string(),
        table_name: "documents".to_string(),
        content_function_name: "document_content".to_string(),
        embedding_column_name: "embedding".to_string(),
    }
}

pub fn jobs(ids: &[i64]) -> Vec<Job> {
    ids.iter().copied().map(job).collect()
}

pub fn enriched(job_id: i64, content: &str) -> EnrichedJob {
    EnrichedJob::new(job(job_id), content).expect("test content must not be blank")
}

pub fn batch(status: BatchStatus) -> ExternalBatchJob {
    ExternalBatchJob {
        id: TEST_BATCH_ID.to_string(),
        status,
        output_file_id: None,
        error_file_id: None,
        errors: None,
    }
}

pub fn completed_batch() -> ExternalBatchJob {
    ExternalBatchJob {
        output_file_id: Some(TEST_OUTPUT_FILE_ID.to_string()),
        ..batch(BatchStatus::Completed)
    }
}

pub fn failed_batch(message: &str) -> ExternalBatchJob {
    ExternalBatchJob {
        errors: Some(BatchErrors {
            data: vec![BatchErrorDetail {
                code: Some("invalid_request".to_string()),
                message: Some(message.to_string()),
                line: None,
            }],
        }),
        ..batch(BatchStatus::Failed)
    }
}

/// Deterministic embedding for a job so writes can be asserted
pub fn embedding_for(job_id: i64) -> Vec<f32> {
    vec![job_id as f32, 0.5, -0.25]
}

pub fn success_line(job_id: i64) -> String {
    json!({
        "id": format!("batch_req_{job_id}"),
        "custom_id": job_id.to_string(),
        "response": {
            "status_code": 200,
            "body": {
                "object": "list",
                "data": [{ "object": "embedding", "index": 0, "embedding": embedding_for(job_id) }],
                "model": "text-embedding-3-small"
            }
        },
        "error": null
    })
    .to_string()
}

pub fn error_line(job_id: i64, code: &str, message: &str) -> String {
    json!({
        "id": format!("batch_req_{job_id}"),
        "custom_id": job_id.to_string(),
        "response": null,
        "error": { "code": code, "message": message }
    })
    .to_string()
}

pub fn status_line(job_id: i64, status_code: u16) -> String {
    json!({
        "id": format!("batch_req_{job_id}"),
        "custom_id": job_id.to_string(),
        "response": { "status_code": status_code, "body": {} },
        "error": null
    })
    .to_string()
}

pub fn output_file(lines: &[String]) -> String {
    let mut output = lines.join("\n");
    output.push('\n');
    output
}
