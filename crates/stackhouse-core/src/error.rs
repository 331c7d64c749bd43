//! Common error types for stackhouse.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the stackhouse system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A derived container name exceeds the runtime's limit.
    #[error("container name '{name}' is {len} characters, exceeding the limit of {limit}")]
    NameTooLong {
        /// The offending derived name.
        name: String,
        /// Its length in characters.
        len: usize,
        /// The maximum permitted length.
        limit: usize,
    },

    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),
}
