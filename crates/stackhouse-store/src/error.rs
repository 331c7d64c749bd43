//! Error types for the storage layer.

use stackhouse_core::CoreError;
use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("record not found")]
    NotFound,

    /// A record with the same key already exists.
    #[error("record already exists")]
    AlreadyExists,

    /// The definition violates a naming rule shared with the runtime.
    #[error(transparent)]
    Naming(#[from] CoreError),

    /// The definition is structurally invalid.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
