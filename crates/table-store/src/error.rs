use std::time::Duration;

use thiserror::Error;

use crate::{TableNumber, Version};

/// Errors that can occur when interacting with the table store.
#[derive(Debug, Error)]
pub enum TableStoreError {
    /// The stored version did not match the version the writer loaded.
    #[error(
        "Concurrency conflict for table {table_number}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        table_number: TableNumber,
        expected: Version,
        actual: Version,
    },

    /// No document exists for the table number.
    #[error("Table not found: {0}")]
    TableNotFound(TableNumber),

    /// A document already exists for the table number.
    #[error("Table already exists: {0}")]
    TableAlreadyExists(TableNumber),

    /// The store did not answer within the configured bound.
    #[error("Store operation '{operation}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The store refused the operation for a backend-specific reason.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for table store operations.
pub type Result<T> = std::result::Result<T, TableStoreError>;
