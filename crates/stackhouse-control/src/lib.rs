//! Control plane for stackhouse stack lifecycle management.
//!
//! This crate provides the business logic that sits between stored stack
//! definitions and the container runtime: it drives lifecycle operations
//! across every service of a stack and merges desired state with live
//! container status.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Gateway (HTTP)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ControlPlaneService                       │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │   Stack     │ │  Lifecycle  │ │    Status           │   │
//! │  │   CRUD      │ │  Orchestr.  │ │    Reconciler       │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                  ┌───────────┴───────────┐
//!                  ▼                       ▼
//!           ┌──────────┐            ┌──────────┐
//!           │  Store   │            │ Runtime  │
//!           │ (RocksDB)│            │ (Docker) │
//!           └──────────┘            └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use stackhouse_control::{ControlPlane, ControlPlaneService};
//! use stackhouse_core::StackId;
//! use stackhouse_runtime::{DockerRuntime, RuntimeConfig};
//! use stackhouse_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/stackhouse")?);
//! let runtime = Arc::new(DockerRuntime::connect(RuntimeConfig::default())?);
//! let control = ControlPlaneService::with_defaults(store, runtime);
//!
//! let report = control.start_stack(&StackId::parse("shop")?).await?;
//! for result in report.results {
//!     println!("{}: {}", result.service_id, result.success);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Failure semantics
//!
//! Stack-wide operations are best-effort: each service is attempted in
//! definition order and gets its own result. Single-service operations stop
//! at the first runtime error and return it. Nothing is retried.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod orchestrator;
pub mod reconcile;
pub mod service;
pub mod types;

pub use error::{ControlError, Result};
pub use service::{ControlPlane, ControlPlaneService, LOG_ERROR_PREFIX};
pub use types::{
    ControlConfig, HealthReport, LifecycleAction, RestartReport, ServiceActionReport,
    ServiceOutcome, ServiceState, ServiceStatusEntry, ServiceView, StackActionReport,
    StackStatusReport, StackView,
};
