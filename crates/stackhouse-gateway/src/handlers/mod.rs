//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

pub mod health;
pub mod services;
pub mod stacks;

use stackhouse_core::{ServiceId, StackId};

use crate::error::ApiError;

/// Base path of the stack API.
pub const API_PREFIX: &str = "/api/v1/stacks";

/// Parse a stack ID from a path segment.
///
/// A malformed ID can never name a stored stack, so it is reported as not found.
pub(crate) fn parse_stack_id(raw: &str) -> Result<StackId, ApiError> {
    StackId::parse(raw).map_err(|_| ApiError::StackNotFound(raw.to_string()))
}

/// Parse a stack and service ID pair from path segments.
pub(crate) fn parse_service_path(
    stack_id: &str,
    service_id: &str,
) -> Result<(StackId, ServiceId), ApiError> {
    let stack = parse_stack_id(stack_id)?;
    let service = ServiceId::parse(service_id).map_err(|_| ApiError::ServiceNotFound {
        stack_id: stack_id.to_string(),
        service_id: service_id.to_string(),
    })?;
    Ok((stack, service))
}

/// Link to a stack resource.
pub(crate) fn stack_link(stack_id: &StackId) -> String {
    format!("{API_PREFIX}/{stack_id}")
}

/// Link to a service resource.
pub(crate) fn service_link(stack_id: &StackId, service_id: &ServiceId) -> String {
    format!("{API_PREFIX}/{stack_id}/services/{service_id}")
}

/// Link to a service's logs.
pub(crate) fn service_logs_link(stack_id: &StackId, service_id: &ServiceId) -> String {
    format!("{}/logs", service_link(stack_id, service_id))
}
