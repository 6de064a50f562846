//! # Messaging Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },
}

impl QueueError {
    /// Create a queue operation error
    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a database connection error
    pub fn database_connection(message: impl Into<String>) -> Self {
        Self::DatabaseConnection {
            message: message.into(),
        }
    }
}

/// Conversion from sqlx::Error to QueueError
impl From<sqlx::Error> for QueueError {
    fn from(err: sqlx::Error) -> Self {
        QueueError::database_connection(err.to_string())
    }
}

/// Conversion from pgmq::errors::PgmqError to QueueError
impl From<pgmq::errors::PgmqError> for QueueError {
    fn from(err: pgmq::errors::PgmqError) -> Self {
        QueueError::queue_operation("unknown", "pgmq", err.to_string())
    }
}
