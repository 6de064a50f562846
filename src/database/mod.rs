//! # Database Operations
//!
//! The relational store collaborator: a pooled PostgreSQL connection and the
//! [`PgContentStore`] that reads row content and writes vectors back.
//!
//! ```rust,no_run
//! use embedding_batch::config::DatabaseConfig;
//! use embedding_batch::database::{DatabaseConnection, IdentifierPolicy, PgContentStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatabaseConfig {
//!     url: "postgresql://localhost/app".to_string(),
//!     ..Default::default()
//! };
//! let db = DatabaseConnection::connect(&config).await?;
//! let store = PgContentStore::new(db.pool().clone(), IdentifierPolicy::permissive());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod content_store;
pub mod errors;
pub mod identifiers;

pub use connection::DatabaseConnection;
pub use content_store::PgContentStore;
pub use errors::StoreError;
pub use identifiers::{quote_ident, quote_qualified, IdentifierPolicy, QuotedTarget};
