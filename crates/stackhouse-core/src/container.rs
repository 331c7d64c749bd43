//! Container configuration attached to a service definition.
//!
//! Empty collections and absent host ports are skipped when serializing, so a
//! configuration read back from storage serializes identically to the one
//! that was written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ports, environment, and volume bindings for one service container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerConfig {
    /// Published container ports.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortMapping>,

    /// Environment variables passed to the container.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    /// Host directories bind-mounted into the container.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeBinding>,
}

impl ContainerConfig {
    /// Render the environment as `KEY=value` pairs.
    #[must_use]
    pub fn env_pairs(&self) -> Vec<String> {
        self.environment
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }
}

/// A container port, optionally bound to a host port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Port the process listens on inside the container.
    pub container_port: u16,

    /// Host port to publish on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
}

/// A host path mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBinding {
    /// Source directory on the host.
    pub host_path: String,
    /// Mount point inside the container.
    pub container_path: String,
}

impl VolumeBinding {
    /// Render as a `host:container` bind specification.
    #[must_use]
    pub fn bind_spec(&self) -> String {
        format!("{}:{}", self.host_path, self.container_path)
    }
}
