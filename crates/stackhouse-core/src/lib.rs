//! Core types and utilities for stackhouse.
//!
//! This crate provides the foundational types used throughout the stackhouse workspace:
//!
//! - **Identifiers**: Strongly-typed, syntax-checked IDs for stacks and services
//! - **Naming**: The deterministic mapping from a (stack, service) pair to a runtime container name
//! - **Container configuration**: Ports, environment, and volume bindings for a service
//! - **Error types**: Common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use stackhouse_core::{naming, ServiceId, StackId};
//!
//! let stack = StackId::parse("shop").unwrap();
//! let service = ServiceId::parse("web").unwrap();
//!
//! assert_eq!(naming::container_name(&stack, &service).unwrap(), "shop-web");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod container;
pub mod error;
pub mod ids;
pub mod naming;

pub use container::{ContainerConfig, PortMapping, VolumeBinding};
pub use error::{CoreError, Result};
pub use ids::{IdError, ServiceId, StackId, MAX_ID_LEN};
