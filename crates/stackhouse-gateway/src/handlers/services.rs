//! Service endpoints.
//!
//! Single-service detail, logs and lifecycle actions. Unlike stack-wide
//! actions, a service action that fails is reported as an error response.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use stackhouse_control::{ControlPlane, ServiceView};
use stackhouse_core::{ServiceId, StackId};

use crate::auth::ApiClient;
use crate::error::ApiError;
use crate::handlers::stacks::LogQuery;
use crate::handlers::{parse_service_path, service_logs_link};
use crate::state::GatewayState;

/// Service detail response.
#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    /// Service definition and live status.
    #[serde(flatten)]
    pub service: ServiceView,
    /// Link to the service logs.
    pub logs: String,
}

impl From<ServiceView> for ServiceResponse {
    fn from(service: ServiceView) -> Self {
        Self {
            logs: service_logs_link(&service.stack_id, &service.id),
            service,
        }
    }
}

/// Response for service logs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLogsResponse {
    /// Stack ID.
    pub stack_id: StackId,
    /// Service ID.
    pub service_id: ServiceId,
    /// Trimmed, non-empty log lines.
    pub logs: Vec<String>,
}

/// Get one service with its live container status.
///
/// # Errors
///
/// Returns an error if the stack or service is not found.
pub async fn get_service<C>(
    State(state): State<Arc<GatewayState<C>>>,
    _client: ApiClient,
    Path((stack_id, service_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let (stack_id, service_id) = parse_service_path(&stack_id, &service_id)?;
    let view = state.control.get_service(&stack_id, &service_id).await?;
    Ok(Json(ServiceResponse::from(view)))
}

/// Recent log lines of one service.
///
/// # Errors
///
/// Returns an error if the stack or service is not found. A runtime failure
/// yields a single error line rather than an error response.
pub async fn get_logs<C>(
    State(state): State<Arc<GatewayState<C>>>,
    _client: ApiClient,
    Path((stack_id, service_id)): Path<(String, String)>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let (stack_id, service_id) = parse_service_path(&stack_id, &service_id)?;
    let Query(query) = query?;
    let logs = state
        .control
        .service_logs(&stack_id, &service_id, query.tail)
        .await?;
    Ok(Json(ServiceLogsResponse {
        stack_id,
        service_id,
        logs,
    }))
}

/// Create and start one service.
///
/// # Errors
///
/// Returns an error if the service is not found or the runtime fails.
pub async fn start_service<C>(
    State(state): State<Arc<GatewayState<C>>>,
    client: ApiClient,
    Path((stack_id, service_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let (stack_id, service_id) = parse_service_path(&stack_id, &service_id)?;
    let report = state.control.start_service(&stack_id, &service_id).await?;
    tracing::debug!(stack_id = %stack_id, service_id = %service_id, client = %client.fingerprint, "Service start requested");
    Ok(Json(report))
}

/// Stop one service.
///
/// # Errors
///
/// Returns an error if the service is not found or the runtime fails.
pub async fn stop_service<C>(
    State(state): State<Arc<GatewayState<C>>>,
    client: ApiClient,
    Path((stack_id, service_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let (stack_id, service_id) = parse_service_path(&stack_id, &service_id)?;
    let report = state.control.stop_service(&stack_id, &service_id).await?;
    tracing::debug!(stack_id = %stack_id, service_id = %service_id, client = %client.fingerprint, "Service stop requested");
    Ok(Json(report))
}

/// Stop, then create and start, one service.
///
/// # Errors
///
/// Returns an error if the service is not found or the runtime fails.
pub async fn restart_service<C>(
    State(state): State<Arc<GatewayState<C>>>,
    client: ApiClient,
    Path((stack_id, service_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ControlPlane + 'static,
{
    let (stack_id, service_id) = parse_service_path(&stack_id, &service_id)?;
    let report = state
        .control
        .restart_service(&stack_id, &service_id)
        .await?;
    tracing::debug!(stack_id = %stack_id, service_id = %service_id, client = %client.fingerprint, "Service restart requested");
    Ok(Json(report))
}
