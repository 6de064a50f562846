//! Recording mocks for the pipeline's collaborator traits
//!
//! Each mock keeps its state behind `Arc<Mutex<_>>` so tests can configure
//! behavior up front and inspect recorded calls after a run.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use embedding_batch::database::StoreError;
use embedding_batch::messaging::QueueError;
use embedding_batch::models::{BatchStatus, CreateBatchRequest, ExternalBatchJob, Job};
use embedding_batch::pipeline::{BatchProvider, Clock, ContentStore, FetchedContent, JobQueue};
use embedding_batch::provider::ProviderError;

use super::builders::{batch, TEST_BATCH_ID};

/// How the store answers a content lookup for one job
#[derive(Debug, Clone)]
pub enum ContentBehavior {
    Content(Option<String>),
    Missing,
    Error(String),
}

/// How the store answers a vector write for one job
#[derive(Debug, Clone)]
pub enum WriteBehavior {
    Affected(u64),
    Error(String),
}

#[derive(Debug, Default)]
pub struct MockStoreState {
    pub contents: HashMap<i64, ContentBehavior>,
    pub writes: HashMap<i64, WriteBehavior>,
    pub fetched: Vec<i64>,
    pub written: Vec<(i64, Vec<f32>)>,
    pub fetch_delay: Option<Duration>,
    pub write_delays: HashMap<i64, Duration>,
}

/// Content store keyed by job id; unknown jobs have no row
#[derive(Debug, Clone, Default)]
pub struct MockContentStore {
    state: Arc<Mutex<MockStoreState>>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(self, job_id: i64, content: &str) -> Self {
        self.set_content(job_id, ContentBehavior::Content(Some(content.to_string())))
    }

    pub fn set_content(self, job_id: i64, behavior: ContentBehavior) -> Self {
        self.state.lock().unwrap().contents.insert(job_id, behavior);
        self
    }

    pub fn set_write(self, job_id: i64, behavior: WriteBehavior) -> Self {
        self.state.lock().unwrap().writes.insert(job_id, behavior);
        self
    }

    /// Every content lookup sleeps this long before answering
    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().fetch_delay = Some(delay);
        self
    }

    /// The vector write for `job_id` sleeps this long before answering
    pub fn with_write_delay(self, job_id: i64, delay: Duration) -> Self {
        self.state.lock().unwrap().write_delays.insert(job_id, delay);
        self
    }

    pub fn fetched(&self) -> Vec<i64> {
        self.state.lock().unwrap().fetched.clone()
    }

    pub fn written(&self) -> Vec<(i64, Vec<f32>)> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn written_ids(&self) -> Vec<i64> {
        self.written().into_iter().map(|(id, _)| id).collect()
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn fetch_content(&self, job: &Job) -> Result<Option<FetchedContent>, StoreError> {
        let delay = self.state.lock().unwrap().fetch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.fetched.push(job.job_id);

        match state.contents.get(&job.job_id).cloned() {
            Some(ContentBehavior::Content(content)) => Ok(Some(FetchedContent {
                row_id: job.row_id.clone(),
                content,
            })),
            Some(ContentBehavior::Error(message)) => Err(StoreError::query("fetch_content", message)),
            Some(ContentBehavior::Missing) | None => Ok(None),
        }
    }

    async fn update_vector(&self, job: &Job, vector: &[f32]) -> Result<u64, StoreError> {
        let delay = self.state.lock().unwrap().write_delays.get(&job.job_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        match state.writes.get(&job.job_id).cloned() {
            Some(WriteBehavior::Error(message)) => Err(StoreError::query("update_vector", message)),
            Some(WriteBehavior::Affected(0)) => Ok(0),
            Some(WriteBehavior::Affected(rows)) => {
                state.written.push((job.job_id, vector.to_vec()));
                Ok(rows)
            }
            None => {
                state.written.push((job.job_id, vector.to_vec()));
                Ok(1)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MockQueueState {
    pub deleted: Vec<i64>,
    pub failing: HashSet<i64>,
    pub absent: HashSet<i64>,
}

/// Queue that records every delete attempt
#[derive(Debug, Clone, Default)]
pub struct MockJobQueue {
    state: Arc<Mutex<MockQueueState>>,
}

impl MockJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(self, job_id: i64) -> Self {
        self.state.lock().unwrap().failing.insert(job_id);
        self
    }

    pub fn absent(self, job_id: i64) -> Self {
        self.state.lock().unwrap().absent.insert(job_id);
        self
    }

    /// Every delete attempt, including failed ones
    pub fn deleted(&self) -> Vec<i64> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl JobQueue for MockJobQueue {
    async fn delete(&self, job_id: i64) -> Result<bool, QueueError> {
        let mut state = self.state.lock().unwrap();
        state.deleted.push(job_id);

        if state.failing.contains(&job_id) {
            return Err(QueueError::queue_operation(
                "embedding_jobs",
                "delete",
                "connection reset",
            ));
        }
        Ok(!state.absent.contains(&job_id))
    }
}

#[derive(Debug, Default)]
pub struct MockProviderState {
    pub uploaded_contents: Vec<String>,
    pub uploaded_paths: Vec<PathBuf>,
    pub created: Vec<CreateBatchRequest>,
    pub polled: Vec<String>,
    pub downloaded: Vec<String>,
    /// Successive `get_batch` answers; the last one repeats forever
    pub statuses: VecDeque<ExternalBatchJob>,
    pub output: String,
    pub fail_upload: Option<String>,
    pub fail_create: Option<String>,
    pub fail_poll: Option<String>,
    pub fail_download: Option<String>,
}

/// Batch provider with a scripted status sequence and output file
#[derive(Debug, Clone, Default)]
pub struct MockBatchProvider {
    state: Arc<Mutex<MockProviderState>>,
}

impl MockBatchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch goes `in_progress` once and then reaches `terminal`
    pub fn finishing_with(terminal: ExternalBatchJob, output: String) -> Self {
        Self::new()
            .with_statuses(vec![batch(BatchStatus::InProgress), terminal])
            .with_output(output)
    }

    pub fn with_statuses(self, statuses: Vec<ExternalBatchJob>) -> Self {
        self.state.lock().unwrap().statuses = statuses.into();
        self
    }

    pub fn with_output(self, output: String) -> Self {
        self.state.lock().unwrap().output = output;
        self
    }

    pub fn failing_upload(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_upload = Some(message.to_string());
        self
    }

    pub fn failing_create(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_create = Some(message.to_string());
        self
    }

    pub fn failing_poll(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_poll = Some(message.to_string());
        self
    }

    pub fn failing_download(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_download = Some(message.to_string());
        self
    }

    pub fn uploaded_contents(&self) -> Vec<String> {
        self.state.lock().unwrap().uploaded_contents.clone()
    }

    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().uploaded_paths.clone()
    }

    pub fn created(&self) -> Vec<CreateBatchRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.state.lock().unwrap().polled.len()
    }

    pub fn downloaded(&self) -> Vec<String> {
        self.state.lock().unwrap().downloaded.clone()
    }
}

#[async_trait]
impl BatchProvider for MockBatchProvider {
    async fn upload_file(&self, path: &Path) -> Result<String, ProviderError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let mut state = self.state.lock().unwrap();
        state.uploaded_contents.push(contents);
        state.uploaded_paths.push(path.to_path_buf());

        match &state.fail_upload {
            Some(message) => Err(ProviderError::api(413, message.clone())),
            None => Ok("file-input".to_string()),
        }
    }

    async fn create_batch(
        &self,
        request: &CreateBatchRequest,
    ) -> Result<ExternalBatchJob, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.created.push(request.clone());

        match &state.fail_create {
            Some(message) => Err(ProviderError::api(400, message.clone())),
            None => Ok(batch(BatchStatus::Validating)),
        }
    }

    async fn get_batch(&self, batch_id: &str) -> Result<ExternalBatchJob, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.polled.push(batch_id.to_string());

        if let Some(message) = &state.fail_poll {
            return Err(ProviderError::api(503, message.clone()));
        }
        if batch_id != TEST_BATCH_ID {
            return Err(ProviderError::api(404, format!("No batch {batch_id}")));
        }

        let next = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        };
        Ok(next.unwrap_or_else(|| batch(BatchStatus::InProgress)))
    }

    async fn download_file(&self, file_id: &str) -> Result<String, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.downloaded.push(file_id.to_string());

        match &state.fail_download {
            Some(message) => Err(ProviderError::api(500, message.clone())),
            None => Ok(state.output.clone()),
        }
    }
}

/// Clock that records requested sleeps and returns immediately
///
/// Optionally cancels a token once a given number of sleeps has happened,
/// standing in for an external deadline.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_after(sleeps: usize, token: CancellationToken) -> Self {
        Self {
            sleeps: Arc::default(),
            cancel_after: Some((sleeps, token)),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            sleeps.len()
        };

        if let Some((limit, token)) = &self.cancel_after {
            if count >= *limit {
                token.cancel();
            }
        }
        tokio::task::yield_now().await;
    }
}
