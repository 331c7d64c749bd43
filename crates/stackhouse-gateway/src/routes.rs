//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use stackhouse_control::ControlPlane;

use crate::handlers::{health, services, stacks};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Descriptor (API key)
/// - `GET /` - Service descriptor
///
/// ## Stacks (API key)
/// - `GET /api/v1/stacks` - List stacks
/// - `POST /api/v1/stacks` - Create stack
/// - `GET /api/v1/stacks/:stack_id` - Get stack
/// - `PUT /api/v1/stacks/:stack_id` - Replace stack definition
/// - `DELETE /api/v1/stacks/:stack_id` - Delete stack
/// - `POST /api/v1/stacks/:stack_id/start` - Start stack
/// - `POST /api/v1/stacks/:stack_id/stop` - Stop stack
/// - `POST /api/v1/stacks/:stack_id/restart` - Restart stack
/// - `GET /api/v1/stacks/:stack_id/status` - Stack status
/// - `GET /api/v1/stacks/:stack_id/logs` - Stack logs
///
/// ## Services (API key)
/// - `GET /api/v1/stacks/:stack_id/services/:service_id` - Get service
/// - `GET /api/v1/stacks/:stack_id/services/:service_id/logs` - Service logs
/// - `POST /api/v1/stacks/:stack_id/services/:service_id/start` - Start service
/// - `POST /api/v1/stacks/:stack_id/services/:service_id/stop` - Stop service
/// - `POST /api/v1/stacks/:stack_id/services/:service_id/restart` - Restart service
pub fn create_router<C>(state: GatewayState<C>) -> Router
where
    C: ControlPlane + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.server.cors_origins);
    let max_body_bytes = state.config.server.max_body_bytes;
    let request_timeout = state.config.server.request_timeout();

    let state = Arc::new(state);

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health::<C>))
        // Stacks
        .route(
            "/api/v1/stacks",
            get(stacks::list_stacks::<C>).post(stacks::create_stack::<C>),
        )
        .route(
            "/api/v1/stacks/:stack_id",
            get(stacks::get_stack::<C>)
                .put(stacks::update_stack::<C>)
                .delete(stacks::delete_stack::<C>),
        )
        .route(
            "/api/v1/stacks/:stack_id/start",
            post(stacks::start_stack::<C>),
        )
        .route(
            "/api/v1/stacks/:stack_id/stop",
            post(stacks::stop_stack::<C>),
        )
        .route(
            "/api/v1/stacks/:stack_id/restart",
            post(stacks::restart_stack::<C>),
        )
        .route(
            "/api/v1/stacks/:stack_id/status",
            get(stacks::get_status::<C>),
        )
        .route("/api/v1/stacks/:stack_id/logs", get(stacks::get_logs::<C>))
        // Services
        .route(
            "/api/v1/stacks/:stack_id/services/:service_id",
            get(services::get_service::<C>),
        )
        .route(
            "/api/v1/stacks/:stack_id/services/:service_id/logs",
            get(services::get_logs::<C>),
        )
        .route(
            "/api/v1/stacks/:stack_id/services/:service_id/start",
            post(services::start_service::<C>),
        )
        .route(
            "/api/v1/stacks/:stack_id/services/:service_id/stop",
            post(services::stop_service::<C>),
        )
        .route(
            "/api/v1/stacks/:stack_id/services/:service_id/restart",
            post(services::restart_service::<C>),
        )
        .fallback(health::not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Json extractors otherwise stop at axum's 2 MB default
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use stackhouse_control::ControlPlaneService;
    use stackhouse_runtime::MockRuntime;
    use stackhouse_store::RocksStore;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::GatewayConfig;

    fn router() -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let control = Arc::new(ControlPlaneService::with_defaults(
            store,
            Arc::new(MockRuntime::new()),
        ));
        let mut config = GatewayConfig::default();
        config.api.keys = vec!["secret".to_string()];
        (create_router(GatewayState::new(control, config)), dir)
    }

    #[test]
    fn cors_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "https://app.example.com".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _dir) = router();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn descriptor_requires_a_key() {
        let (app, _dir) = router();
        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::get("/")
                    .header("x-api-key", "secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn stacks_require_a_key() {
        let (app, _dir) = router();
        let response = app
            .oneshot(Request::get("/api/v1/stacks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (app, _dir) = router();
        let response = app
            .oneshot(Request::get("/api/v2/things").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
