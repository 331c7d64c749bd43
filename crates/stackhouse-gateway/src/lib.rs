//! HTTP gateway for stackhouse.
//!
//! This crate provides the public-facing API for managing stacks and their
//! services. It handles:
//!
//! - API key authentication
//! - Request body validation
//! - REST endpoints for stack definitions, lifecycle, status and logs
//! - Configuration loading
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients                              │
//! │                     (HTTP + X-API-Key)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    stackhouse-gateway                       │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  API key    │ │   Router    │ │    Validator        │    │
//! │  │  Extractor  │ │  + Handlers │ │                     │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                     ┌──────────────────┐
//!                     │  Control Plane   │
//!                     └──────────────────┘
//!                        │            │
//!                        ▼            ▼
//!                 ┌──────────┐  ┌──────────┐
//!                 │  Store   │  │ Runtime  │
//!                 │ (RocksDB)│  │ (Docker) │
//!                 └──────────┘  └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stackhouse_gateway::{GatewayConfig, GatewayState, create_router};
//! use stackhouse_control::ControlPlaneService;
//! use stackhouse_runtime::DockerRuntime;
//! use stackhouse_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::default();
//!
//! // Initialize dependencies
//! let store = Arc::new(RocksStore::open(&config.database.path)?);
//! let runtime = Arc::new(DockerRuntime::connect(config.runtime_config())?);
//! let control = Arc::new(ControlPlaneService::with_defaults(store, runtime));
//!
//! // Create router
//! let app = create_router(GatewayState::new(control, config));
//!
//! // Run server
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod validate;

pub use config::{ConfigError, GatewayConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;
pub use validate::ValidationError;

// Re-export key types for convenience
pub use auth::{ApiClient, ApiKeys};
