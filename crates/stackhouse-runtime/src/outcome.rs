//! Tagged runtime outcomes and the idempotent-absorption policy.
//!
//! Every runtime call is first classified into an [`Outcome`]. Whether an
//! outcome counts as success depends on the [`Operation`] that produced it:
//! asking to stop a container that was never created is success, asking to
//! start one is not. [`Outcome::settle`] applies that table in one place so
//! the Docker client and the in-memory mock agree on it.

use crate::error::{Result, RuntimeError};

/// A runtime operation whose result is being settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a container.
    Create,
    /// Start a container.
    Start,
    /// Stop a container.
    Stop,
    /// Remove a container.
    Remove,
    /// Inspect a container.
    Inspect,
    /// Fetch container logs.
    Logs,
}

impl Operation {
    /// Check whether this operation treats `absorption` as success.
    #[must_use]
    pub const fn absorbs(self, absorption: Absorption) -> bool {
        matches!(
            (self, absorption),
            (Self::Create, Absorption::AlreadyExists)
                | (Self::Start | Self::Stop, Absorption::NotModified)
                | (
                    Self::Stop | Self::Remove | Self::Inspect | Self::Logs,
                    Absorption::NotFound
                )
        )
    }

    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Remove => "remove",
            Self::Inspect => "inspect",
            Self::Logs => "logs",
        }
    }
}

/// A runtime condition that may be equivalent to success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Absorption {
    /// The container name is already taken (409).
    AlreadyExists,
    /// The container is already in the requested state (304).
    NotModified,
    /// The container does not exist (404).
    NotFound,
}

impl Absorption {
    /// Status code the runtime uses for this condition.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::AlreadyExists => 409,
            Self::NotModified => 304,
            Self::NotFound => 404,
        }
    }
}

/// Classified result of a single runtime call.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The call succeeded.
    Done(T),
    /// A container with the name already exists.
    AlreadyExists(String),
    /// The container was already in the requested state.
    NotModified(String),
    /// No container with the name exists.
    NotFound(String),
    /// Any other failure.
    Failed(RuntimeError),
}

/// Result of settling an outcome that counts as success.
#[derive(Debug, PartialEq, Eq)]
pub enum Settled<T> {
    /// The call itself succeeded.
    Done(T),
    /// The call failed with a condition the operation absorbs.
    Absorbed(Absorption),
}

impl<T> Outcome<T> {
    /// Classify a runtime answer by its status code.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            409 => Self::AlreadyExists(message),
            304 => Self::NotModified(message),
            404 => Self::NotFound(message),
            _ => Self::Failed(RuntimeError::OperationFailed {
                status: Some(status),
                message,
            }),
        }
    }

    /// Apply the absorption policy for `op`.
    ///
    /// # Errors
    ///
    /// Returns the underlying failure, or an `OperationFailed` carrying the
    /// runtime's status code for conditions `op` does not absorb.
    pub fn settle(self, op: Operation) -> Result<Settled<T>> {
        let (absorption, message) = match self {
            Self::Done(value) => return Ok(Settled::Done(value)),
            Self::Failed(err) => return Err(err),
            Self::AlreadyExists(message) => (Absorption::AlreadyExists, message),
            Self::NotModified(message) => (Absorption::NotModified, message),
            Self::NotFound(message) => (Absorption::NotFound, message),
        };

        if op.absorbs(absorption) {
            tracing::debug!(op = op.as_str(), ?absorption, %message, "Absorbed idempotent runtime outcome");
            Ok(Settled::Absorbed(absorption))
        } else {
            Err(RuntimeError::OperationFailed {
                status: Some(absorption.status()),
                message,
            })
        }
    }
}
