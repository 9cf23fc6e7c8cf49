use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the inventory table.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write was rejected because the stored version moved on.
    #[error("Concurrency conflict for record {key}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        key: String,
        expected: Version,
        actual: Version,
    },

    /// The key exists but holds a different kind of record.
    #[error("Record {key} is not of type {expected}")]
    UnexpectedRecord { key: String, expected: &'static str },

    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, StoreError>;
