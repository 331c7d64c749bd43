//! Types for the runtime crate.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// State label reported for a container that does not exist.
pub const NOT_CREATED: &str = "not-created";

/// Reference to a container returned by a create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    /// Derived container name.
    pub name: String,
    /// Runtime-assigned ID, when known.
    pub id: Option<String>,
    /// Whether an existing container with this name was reused.
    pub reused: bool,
}

/// Live status of a service container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    /// Runtime state label (`running`, `exited`, `created`, ...).
    pub status: String,
    /// Whether the container process is running.
    pub running: bool,
    /// When the container was last started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the container last exited.
    pub finished_at: Option<DateTime<Utc>>,
    /// Exit code of the last run.
    pub exit_code: Option<i64>,
}

impl ContainerStatus {
    /// Synthetic status for a container that does not exist.
    #[must_use]
    pub fn not_created() -> Self {
        Self {
            status: NOT_CREATED.to_string(),
            running: false,
            started_at: None,
            finished_at: None,
            exit_code: None,
        }
    }

    /// Check whether this is the synthetic not-created status.
    #[must_use]
    pub fn is_not_created(&self) -> bool {
        self.status == NOT_CREATED
    }
}

/// Parse a runtime timestamp.
///
/// The runtime reports `0001-01-01T00:00:00Z` for "never"; that and anything
/// unparseable become `None`.
#[must_use]
pub fn parse_runtime_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw?).ok()?.with_timezone(&Utc);
    (parsed.year() > 1).then_some(parsed)
}

/// Options for a log retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    /// Number of trailing lines to return.
    pub tail: usize,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self { tail: 100 }
    }
}

/// Configuration for the Docker runtime client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Daemon endpoint: `unix:///path`, a bare socket path, or `tcp://host:port`.
    pub endpoint: String,
    /// Client request timeout in seconds.
    pub timeout_secs: u64,
    /// Grace period given to a container on stop, in seconds.
    pub stop_timeout_secs: i64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "unix:///var/run/docker.sock".to_string(),
            timeout_secs: 120,
            stop_timeout_secs: 10,
        }
    }
}
