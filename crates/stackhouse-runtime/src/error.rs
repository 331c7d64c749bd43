//! Error types for the runtime crate.

use stackhouse_core::CoreError;
use thiserror::Error;

/// Errors that can occur during container runtime operations.
///
/// Idempotent-equivalence conditions (already running, already gone, name
/// already taken) never surface here; they are absorbed by
/// [`Outcome::settle`](crate::Outcome::settle).
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The runtime daemon could not be reached.
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),

    /// The runtime rejected an operation.
    #[error("container runtime error: {}", format_failure(*status, message))]
    OperationFailed {
        /// Status code reported by the runtime, if any.
        status: Option<u16>,
        /// Message reported by the runtime.
        message: String,
    },

    /// The derived container name is not acceptable to the runtime.
    #[error(transparent)]
    Naming(#[from] CoreError),
}

impl RuntimeError {
    /// Check if this error is retriable.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Status code reported by the runtime, if the runtime answered at all.
    #[must_use]
    pub fn runtime_status(&self) -> Option<u16> {
        match self {
            Self::OperationFailed { status, .. } => *status,
            Self::Unavailable(_) | Self::Naming(_) => None,
        }
    }
}

fn format_failure(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("{message} (status {code})"),
        None => message.to_string(),
    }
}

/// A specialized Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
