//! # Relational Store Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database query error: {operation}: {message}")]
    Query { operation: String, message: String },

    /// Identifier failed validation or is not on the allow-list
    #[error("Rejected identifier '{identifier}': {reason}")]
    RejectedIdentifier { identifier: String, reason: String },

    #[error("Database connection error: {message}")]
    Connection { message: String },
}

impl StoreError {
    /// Create a database query error
    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn rejected_identifier(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RejectedIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Create a database connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

/// Conversion from sqlx::Error to StoreError
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::query("database", db_err.to_string()),
            sqlx::Error::PoolTimedOut => StoreError::connection("database pool timed out"),
            sqlx::Error::PoolClosed => StoreError::connection("database pool is closed"),
            sqlx::Error::ColumnDecode { index, source } => {
                StoreError::query("decode", format!("column {index}: {source}"))
            }
            _ => StoreError::connection(err.to_string()),
        }
    }
}
