//! Container runtime adapter for stackhouse.
//!
//! This crate provides the [`ContainerRuntime`] trait and the [`DockerRuntime`]
//! implementation that translates per-service lifecycle requests into Docker
//! Engine API calls. It handles:
//!
//! - Deriving the container name for every call (see [`stackhouse_core::naming`])
//! - Building create requests from stored container configuration
//! - Absorbing "already in the target state" answers so retries are harmless
//! - Synthesizing a `not-created` status for containers that do not exist
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Lifecycle Orchestrator / Reconciler              │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        DockerRuntime                             │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────────┐   │
//! │  │  Container  │ │   Outcome   │ │    Naming Scheme        │   │
//! │  │  Spec       │ │   Settling  │ │    (stack-service)      │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Docker Engine API                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Idempotent absorption
//!
//! | Operation | Absorbed as success            |
//! |-----------|--------------------------------|
//! | create    | name already in use (409)      |
//! | start     | already started (304)          |
//! | stop      | already stopped (304), absent (404) |
//! | remove    | absent (404)                   |
//! | inspect   | absent (404) → `not-created`   |
//! | logs      | absent (404) → `Container not found` |
//!
//! # Example
//!
//! ```no_run
//! use stackhouse_core::{ServiceId, StackId};
//! use stackhouse_runtime::{ContainerRuntime, DockerRuntime, RuntimeConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = DockerRuntime::connect(RuntimeConfig::default())?;
//!
//! let stack = StackId::parse("shop")?;
//! let service = ServiceId::parse("web")?;
//!
//! runtime.stop(&stack, &service).await?;
//! let status = runtime.inspect(&stack, &service).await?;
//! println!("{}: running={}", status.status, status.running);
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! For testing without a Docker daemon, enable the `test-utils` feature
//! and use the mock runtime:
//!
//! ```ignore
//! use stackhouse_runtime::{ContainerRuntime, MockRuntime};
//!
//! let runtime = MockRuntime::new();
//! runtime.create(&service).await?;
//! assert_eq!(runtime.container_count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod docker;
pub mod error;
pub mod outcome;
pub mod spec;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use docker::{ContainerRuntime, DockerRuntime, CONTAINER_NOT_FOUND_LOG};
pub use error::{Result, RuntimeError};
pub use outcome::{Absorption, Operation, Outcome, Settled};
pub use types::{ContainerHandle, ContainerStatus, LogOptions, RuntimeConfig, NOT_CREATED};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockRuntime;
