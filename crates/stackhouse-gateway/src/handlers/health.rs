//! Health check, service descriptor and fallback endpoints.
//!
//! The health check and the fallback are public. The service descriptor
//! requires an API key like every other route.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use stackhouse_control::ControlPlane;

use crate::auth::ApiClient;
use crate::error::ApiError;
use crate::handlers::API_PREFIX;
use crate::state::GatewayState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Time of the check.
    pub timestamp: DateTime<Utc>,
    /// Service version.
    pub version: &'static str,
    /// Reachability of backing services.
    pub services: DependencyStatus,
}

/// Reachability of backing services.
#[derive(Debug, Serialize)]
pub struct DependencyStatus {
    /// Definition store.
    pub database: &'static str,
    /// Container runtime.
    pub runtime: &'static str,
}

const fn connection(up: bool) -> &'static str {
    if up {
        "connected"
    } else {
        "unavailable"
    }
}

/// Health check handler.
///
/// The gateway reports `healthy` as long as it can serve requests; an
/// unreachable runtime shows up under `services.runtime`.
///
/// # Example
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "healthy",
///   "timestamp": "2024-05-01T12:00:00Z",
///   "version": "0.1.0",
///   "services": { "database": "connected", "runtime": "connected" }
/// }
/// ```
pub async fn health<C>(State(state): State<Arc<GatewayState<C>>>) -> impl IntoResponse
where
    C: ControlPlane + 'static,
{
    let report = state.control.health().await;

    let response = HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        services: DependencyStatus {
            database: connection(report.database),
            runtime: connection(report.runtime),
        },
    };

    (StatusCode::OK, Json(response))
}

/// Service descriptor response.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    /// Service name.
    pub name: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Entry points.
    pub endpoints: RootEndpoints,
}

/// Entry points listed by the service descriptor.
#[derive(Debug, Serialize)]
pub struct RootEndpoints {
    /// Health check.
    pub health: &'static str,
    /// Stack collection.
    pub stacks: &'static str,
}

/// Service descriptor handler.
pub async fn root(_client: ApiClient) -> impl IntoResponse {
    Json(RootResponse {
        name: "stackhouse",
        version: env!("CARGO_PKG_VERSION"),
        description: "HTTP API for managing container stacks",
        endpoints: RootEndpoints {
            health: "/health",
            stacks: API_PREFIX,
        },
    })
}

/// Handler for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::RouteNotFound(format!("{method} {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_returns_ok() {
        let client = ApiClient {
            fingerprint: "0123456789ab".to_string(),
        };
        let response = root(client).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn fallback_is_not_found() {
        let err = not_found(Method::GET, Uri::from_static("/nope")).await;
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.to_string(), "Endpoint GET /nope not found");
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
