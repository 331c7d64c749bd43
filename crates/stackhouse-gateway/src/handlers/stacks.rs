//! Stack management endpoints.
//!
//! This module provides handlers for stack CRUD operations, stack-wide
//! lifecycle actions, status and logs.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use stackhouse_control::{ControlPlane, ServiceView, StackView};
use stackhouse_core::{ServiceId, StackId};
use stackhouse_store::StackSummary;

use crate::auth::ApiClient;
use crate::error::ApiError;
use crate::handlers::{parse_stack_id, service_link, service_logs_link, stack_link};
use crate::state::GatewayState;
use crate::validate;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Entry in the stack list.
#[derive(Debug, Serialize)]
pub struct StackListEntry {
    /// Stack summary.
    #[serde(flatten)]
    pub summary: StackSummary,
    /// Link to the stack.
    pub details: String,
}

impl From<StackSummary> for StackListEntry {
    fn from(summary: StackSummary) -> Self {
        let details = stack_link(&summary.id);
        Self { summary, details }
    }
}

/// Stack with live service status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackResponse {
    /// Stack ID.
    pub id: StackId,
    /// Display name.
    pub name: String,
    /// Services in declaration order.
    pub services: Vec<StackServiceEntry>,
    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last update timestamp.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A service as listed inside a stack.
#[derive(Debug, Serialize)]
pub struct StackServiceEntry {
    /// Service definition and live status.
    #[serde(flatten)]
    pub service: ServiceView,
    /// Link to the service.
    pub details: String,
    /// Link to the service logs.
    pub logs: String,
}

impl From<StackView> for StackResponse {
    fn from(view: StackView) -> Self {
        Self {
            services: view
                .services
                .into_iter()
                .map(|service| StackServiceEntry {
                    details: service_link(&service.stack_id, &service.id),
                    logs: service_logs_link(&service.stack_id, &service.id),
                    service,
                })
                .collect(),
            id: view.id,
            name: view.name,
            created_at: view.created_at,
            updated_at: view.updated_at,
        }
    }
}

/// Query parameters for log retrieval.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    /// Number of trailing lines per service.
    #[serde(default)]
    pub tail: Option<usize>,
}

/// Response for stack logs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackLogsResponse {
    /// Stack ID.
    pub stack_id: StackId,
    /// Log text keyed by service ID.
    pub logs: BTreeMap<ServiceId, String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List all stacks, newest first.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn list_stacks<C>(
    State(state): State<Arc<GatewayState<C>>>,
    _client: ApiClient,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let stacks = state.control.list_stacks().await?;
    let entries: Vec<StackListEntry> = stacks.into_iter().map(StackListEntry::from).collect();
    Ok(Json(entries))
}

/// Create a new stack.
///
/// # Errors
///
/// Returns an error if:
/// - The body fails validation
/// - A stack with the same ID already exists
/// - The store operation fails
pub async fn create_stack<C>(
    State(state): State<Arc<GatewayState<C>>>,
    client: ApiClient,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let Json(body) = body?;
    let def = validate::stack_definition(&body, None)?;
    let stack = state.control.create_stack(def).await?;

    tracing::info!(stack_id = %stack.id, client = %client.fingerprint, "Stack created");
    Ok((StatusCode::CREATED, Json(stack)))
}

/// Get a stack with the live status of each service.
///
/// # Errors
///
/// Returns an error if the stack is not found.
pub async fn get_stack<C>(
    State(state): State<Arc<GatewayState<C>>>,
    _client: ApiClient,
    Path(stack_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let stack_id = parse_stack_id(&stack_id)?;
    let view = state.control.get_stack(&stack_id).await?;
    Ok(Json(StackResponse::from(view)))
}

/// Replace a stack's definition.
///
/// The ID in the path wins over any ID in the body. Running containers are
/// left alone until the next lifecycle action.
///
/// # Errors
///
/// Returns an error if the stack is not found or the body fails validation.
pub async fn update_stack<C>(
    State(state): State<Arc<GatewayState<C>>>,
    client: ApiClient,
    Path(stack_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let stack_id = parse_stack_id(&stack_id)?;
    let Json(body) = body?;
    let def = validate::stack_definition(&body, Some(&stack_id))?;
    let stack = state.control.update_stack(&stack_id, def).await?;

    tracing::info!(stack_id = %stack.id, client = %client.fingerprint, "Stack updated");
    Ok(Json(stack))
}

/// Delete a stack and remove its containers.
///
/// # Errors
///
/// Returns an error if the stack is not found or the store operation fails.
pub async fn delete_stack<C>(
    State(state): State<Arc<GatewayState<C>>>,
    client: ApiClient,
    Path(stack_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let stack_id = parse_stack_id(&stack_id)?;
    state.control.delete_stack(&stack_id).await?;

    tracing::info!(stack_id = %stack_id, client = %client.fingerprint, "Stack deleted via API");
    Ok(StatusCode::NO_CONTENT)
}

/// Start every service in a stack.
///
/// # Errors
///
/// Returns an error if the stack is not found. Per-service failures are
/// reported in the body.
pub async fn start_stack<C>(
    State(state): State<Arc<GatewayState<C>>>,
    _client: ApiClient,
    Path(stack_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let stack_id = parse_stack_id(&stack_id)?;
    Ok(Json(state.control.start_stack(&stack_id).await?))
}

/// Stop every service in a stack.
///
/// # Errors
///
/// Returns an error if the stack is not found.
pub async fn stop_stack<C>(
    State(state): State<Arc<GatewayState<C>>>,
    _client: ApiClient,
    Path(stack_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let stack_id = parse_stack_id(&stack_id)?;
    Ok(Json(state.control.stop_stack(&stack_id).await?))
}

/// Stop, then start, every service in a stack.
///
/// # Errors
///
/// Returns an error if the stack is not found.
pub async fn restart_stack<C>(
    State(state): State<Arc<GatewayState<C>>>,
    _client: ApiClient,
    Path(stack_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let stack_id = parse_stack_id(&stack_id)?;
    Ok(Json(state.control.restart_stack(&stack_id).await?))
}

/// Live status of each service in a stack.
///
/// # Errors
///
/// Returns an error if the stack is not found.
pub async fn get_status<C>(
    State(state): State<Arc<GatewayState<C>>>,
    _client: ApiClient,
    Path(stack_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let stack_id = parse_stack_id(&stack_id)?;
    Ok(Json(state.control.stack_status(&stack_id).await?))
}

/// Recent logs of every service in a stack.
///
/// # Errors
///
/// Returns an error if the stack is not found. A service whose logs cannot
/// be read gets an error line instead.
pub async fn get_logs<C>(
    State(state): State<Arc<GatewayState<C>>>,
    _client: ApiClient,
    Path(stack_id): Path<String>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let stack_id = parse_stack_id(&stack_id)?;
    let Query(query) = query?;
    let logs = state.control.stack_logs(&stack_id, query.tail).await?;
    Ok(Json(StackLogsResponse { stack_id, logs }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn list_entry_flattens_summary() {
        let now = Utc::now();
        let entry = StackListEntry::from(StackSummary {
            id: StackId::parse("shop").unwrap(),
            name: "shop".into(),
            created_at: now,
            updated_at: now,
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], "shop");
        assert_eq!(json["details"], "/api/v1/stacks/shop");
        assert!(json.get("createdAt").is_some());
    }
}
