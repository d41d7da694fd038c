//! Storage-specific error types
//!
//! Errors raised by the document store (connection, query, document decoding).

use thiserror::Error;

/// Errors that can occur while talking to the document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A document with the same natural key already exists
    #[error("Duplicate key in {collection}: {message}")]
    Duplicate {
        /// Collection the write targeted
        collection: &'static str,
        /// Database message describing the violated index
        message: String,
    },

    /// Query or connection failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document could not be encoded or decoded
    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Embedded migration failed
    #[error("Migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    /// Classify a sqlx error raised by a write on `collection`
    pub(crate) fn from_write(collection: &'static str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
                collection,
                message: db.message().to_string(),
            },
            _ => StoreError::Database(err),
        }
    }
}
