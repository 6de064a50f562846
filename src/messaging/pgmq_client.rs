//! # PostgreSQL Message Queue Client (pgmq-rs)
//!
//! [`JobQueue`] implementation that acknowledges embedding jobs by deleting
//! their pgmq messages. The job id is the pgmq message id.

use async_trait::async_trait;
use pgmq::PGMQueue;
use tracing::{debug, info, instrument};

use super::errors::QueueError;
use crate::pipeline::JobQueue;

#[derive(Debug, Clone)]
pub struct PgmqJobQueue {
    pgmq: PGMQueue,
    queue_name: String,
}

impl PgmqJobQueue {
    /// Create new pgmq client using existing connection pool (BYOP - Bring Your Own Pool)
    pub async fn new_with_pool(pool: sqlx::PgPool, queue_name: impl Into<String>) -> Self {
        let queue_name = queue_name.into();
        info!(queue = %queue_name, "Creating pgmq client with shared connection pool");

        let pgmq = PGMQueue::new_with_pool(pool).await;
        Self { pgmq, queue_name }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl JobQueue for PgmqJobQueue {
    #[instrument(skip(self), fields(queue = %self.queue_name))]
    async fn delete(&self, job_id: i64) -> Result<bool, QueueError> {
        let deleted = self
            .pgmq
            .delete(&self.queue_name, job_id)
            .await
            .map_err(|e| QueueError::queue_operation(&self.queue_name, "delete", e.to_string()))?;

        debug!(job_id, deleted, "Job delete acknowledged by pgmq");
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn test_shared_pool_client_keeps_queue_name() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/embeddings")
            .unwrap();

        let queue = PgmqJobQueue::new_with_pool(pool, "embedding_jobs").await;

        assert_eq!(queue.queue_name(), "embedding_jobs");
    }
}
