//! Stackhouse Gateway - HTTP API for container stacks
//!
//! This is the main entry point for the gateway service. It wires the
//! RocksDB definition store and the Docker runtime into the control plane
//! and serves the HTTP API until SIGINT or SIGTERM.
//!
//! # Configuration
//!
//! Set `STACKHOUSE_CONFIG` to a JSON or YAML file to override defaults; individual
//! settings can then be overridden with `LISTEN_ADDR`, `DATA_DIR`,
//! `DOCKER_HOST`, `STACKHOUSE_API_KEYS` and `LOG_LEVEL`. `RUST_LOG` takes
//! precedence over the configured log level.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stackhouse_control::{ControlPlane, ControlPlaneService};
use stackhouse_gateway::{create_router, GatewayConfig, GatewayState};
use stackhouse_runtime::DockerRuntime;
use stackhouse_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration comes first so the log level can be applied
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Stackhouse Gateway");
    tracing::info!(
        listen_addr = %config.server.listen_addr,
        data_dir = %config.database.path.display(),
        runtime_endpoint = %config.runtime.endpoint,
        api_keys = config.api.keys.len(),
        "Gateway configuration loaded"
    );

    if config.api.keys.is_empty() {
        tracing::warn!("No API keys configured - every authenticated request will be rejected");
    }

    // Initialize RocksDB store
    tracing::info!(path = %config.database.path.display(), "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.database.path)?);

    // Connect to the container runtime
    let runtime = Arc::new(DockerRuntime::connect(config.runtime_config())?);
    tracing::info!(endpoint = %config.runtime.endpoint, "Container runtime client initialized");

    let control = Arc::new(ControlPlaneService::new(
        store,
        runtime,
        config.control_config(),
    ));

    let report = control.health().await;
    if report.runtime {
        tracing::info!("Container runtime reachable");
    } else {
        tracing::warn!("Container runtime not reachable - lifecycle calls will fail until it is");
    }

    // Build the router
    let listen_addr = config.server.listen_addr.clone();
    let app = create_router(GatewayState::new(control, config));
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway shut down");
    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
