//! Error types for the control plane.
//!
//! This module defines all errors that can occur while managing stack
//! definitions and driving their containers.

use stackhouse_core::{CoreError, ServiceId, StackId};
use stackhouse_runtime::RuntimeError;
use stackhouse_store::StoreError;
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur in control plane operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The requested stack was not found.
    #[error("stack not found: {0}")]
    StackNotFound(StackId),

    /// The requested service was not found in its stack.
    #[error("service {service_id} not found in stack {stack_id}")]
    ServiceNotFound {
        /// The stack that was searched.
        stack_id: StackId,
        /// The missing service.
        service_id: ServiceId,
    },

    /// A stack with this ID already exists.
    #[error("stack already exists: {0}")]
    DuplicateStack(StackId),

    /// A derived container name exceeds the runtime limit.
    #[error(transparent)]
    NameTooLong(CoreError),

    /// The stack definition breaks a structural rule.
    #[error("invalid stack definition: {0}")]
    InvalidDefinition(String),

    /// Container runtime error.
    #[error(transparent)]
    Runtime(RuntimeError),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Naming(e) => Self::NameTooLong(e),
            StoreError::InvalidDefinition(msg) => Self::InvalidDefinition(msg),
            other => Self::Store(other),
        }
    }
}

impl From<RuntimeError> for ControlError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Naming(e) => Self::NameTooLong(e),
            other => Self::Runtime(other),
        }
    }
}

impl ControlError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::StackNotFound(_) | Self::ServiceNotFound { .. } => 404,
            Self::DuplicateStack(_) => 409,
            Self::NameTooLong(_) | Self::InvalidDefinition(_) => 400,
            Self::Runtime(RuntimeError::Unavailable(_)) => 503,
            Self::Runtime(_) | Self::Store(_) => 500,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Runtime(e) => e.is_retriable(),
            Self::Store(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let stack_id = StackId::parse("shop").unwrap();
        let service_id = ServiceId::parse("web").unwrap();

        assert_eq!(
            ControlError::StackNotFound(stack_id.clone()).http_status_code(),
            404
        );
        assert_eq!(
            ControlError::ServiceNotFound {
                stack_id: stack_id.clone(),
                service_id
            }
            .http_status_code(),
            404
        );
        assert_eq!(
            ControlError::DuplicateStack(stack_id).http_status_code(),
            409
        );
        assert_eq!(
            ControlError::from(RuntimeError::Unavailable("down".into())).http_status_code(),
            503
        );
        assert_eq!(
            ControlError::from(RuntimeError::OperationFailed {
                status: Some(500),
                message: "boom".into()
            })
            .http_status_code(),
            500
        );
    }

    #[test]
    fn naming_errors_collapse() {
        let naming = CoreError::NameTooLong {
            name: "x".repeat(64),
            len: 64,
            limit: 63,
        };
        let from_store = ControlError::from(StoreError::Naming(naming.clone()));
        let from_runtime = ControlError::from(RuntimeError::Naming(naming));
        assert!(matches!(from_store, ControlError::NameTooLong(_)));
        assert!(matches!(from_runtime, ControlError::NameTooLong(_)));
        assert_eq!(from_store.http_status_code(), 400);
    }
}
