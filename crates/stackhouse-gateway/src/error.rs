//! API error types and responses.
//!
//! This module defines the standard error format for all API responses:
//!
//! ```text
//! { "error": { "code": "stack_not_found", "message": "..." } }
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use stackhouse_control::ControlError;
use stackhouse_runtime::RuntimeError;

use crate::validate::ValidationError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No `X-API-Key` header was sent.
    #[error("API key is required. Provide X-API-Key header.")]
    MissingApiKey,

    /// The `X-API-Key` header does not match a configured key.
    #[error("Invalid API key provided")]
    InvalidApiKey,

    /// The requested stack was not found.
    #[error("Stack '{0}' not found")]
    StackNotFound(String),

    /// The requested service was not found.
    #[error("Service '{service_id}' not found in stack '{stack_id}'")]
    ServiceNotFound {
        /// Stack that was searched.
        stack_id: String,
        /// Missing service.
        service_id: String,
    },

    /// No route matches the request.
    #[error("Endpoint {0} not found")]
    RouteNotFound(String),

    /// A stack with this ID already exists.
    #[error("Stack '{0}' already exists")]
    StackExists(String),

    /// The request body failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The query string could not be parsed.
    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    /// The request body exceeds the configured limit.
    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    /// The container runtime cannot be reached.
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// The container runtime rejected an operation.
    #[error("{0}")]
    Runtime(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingApiKey | Self::InvalidApiKey => StatusCode::UNAUTHORIZED,
            Self::StackNotFound(_) | Self::ServiceNotFound { .. } | Self::RouteNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::StackExists(_) => StatusCode::CONFLICT,
            Self::Validation(_) | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RuntimeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Runtime(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "missing_api_key",
            Self::InvalidApiKey => "invalid_api_key",
            Self::StackNotFound(_) => "stack_not_found",
            Self::ServiceNotFound { .. } => "service_not_found",
            Self::RouteNotFound(_) => "not_found",
            Self::StackExists(_) => "stack_already_exists",
            Self::Validation(e) => e.code(),
            Self::InvalidQuery(_) => "invalid_query",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::RuntimeUnavailable(_) => "runtime_unavailable",
            Self::Runtime(_) => "runtime_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::StackNotFound(id) => Self::StackNotFound(id.to_string()),
            ControlError::ServiceNotFound {
                stack_id,
                service_id,
            } => Self::ServiceNotFound {
                stack_id: stack_id.to_string(),
                service_id: service_id.to_string(),
            },
            ControlError::DuplicateStack(id) => Self::StackExists(id.to_string()),
            ControlError::NameTooLong(e) => {
                Self::Validation(ValidationError::ContainerNameTooLong(e.to_string()))
            }
            ControlError::InvalidDefinition(msg) => {
                Self::Validation(ValidationError::InvalidStackData(msg))
            }
            ControlError::Runtime(RuntimeError::Unavailable(msg)) => {
                tracing::warn!(error = %msg, "Container runtime unavailable");
                Self::RuntimeUnavailable(msg)
            }
            ControlError::Runtime(e) => {
                tracing::error!(error = %e, "Container runtime error");
                Self::Runtime(e.to_string())
            }
            ControlError::Store(e) => {
                tracing::error!(error = %e, "Store error");
                Self::Internal("storage error".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge(rejection.body_text());
        }
        Self::Validation(ValidationError::InvalidStackData(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidQuery(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackhouse_core::{ServiceId, StackId};

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::MissingApiKey.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::StackNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::StackExists("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::RuntimeUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::PayloadTooLarge("big".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(ApiError::InvalidQuery("tail".into()).code(), "invalid_query");
        assert_eq!(
            ApiError::Runtime("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_keeps_its_code() {
        let err = ApiError::from(ValidationError::DuplicateServiceId("dup".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "duplicate_service_id");
        assert_eq!(err.to_string(), "dup");
    }

    #[test]
    fn control_errors_map() {
        let stack_id = StackId::parse("shop").unwrap();
        let service_id = ServiceId::parse("web").unwrap();

        let err = ApiError::from(ControlError::ServiceNotFound {
            stack_id: stack_id.clone(),
            service_id,
        });
        assert_eq!(err.code(), "service_not_found");
        assert_eq!(err.to_string(), "Service 'web' not found in stack 'shop'");

        let err = ApiError::from(ControlError::DuplicateStack(stack_id));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = ApiError::from(ControlError::Runtime(RuntimeError::Unavailable(
            "socket closed".into(),
        )));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::from(ControlError::InvalidDefinition("no services".into()));
        assert_eq!(err.code(), "invalid_stack_data");
    }
}
