//! Request and response types for the control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackhouse_core::{ContainerConfig, ServiceId, StackId};
use stackhouse_runtime::ContainerStatus;

/// Status label reported when a service's container could not be inspected.
pub const STATUS_ERROR: &str = "error";

/// State a service reached during a stack-wide operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Created if necessary and started.
    Started,
    /// Stopped.
    Stopped,
    /// Removed.
    Removed,
}

/// Per-service result of a stack-wide operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOutcome {
    /// The service this result is for.
    pub service_id: ServiceId,
    /// Whether the operation succeeded for this service.
    pub success: bool,
    /// State reached on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceState>,
    /// Failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceOutcome {
    /// A successful result.
    #[must_use]
    pub fn succeeded(service_id: ServiceId, status: ServiceState) -> Self {
        Self {
            service_id,
            success: true,
            status: Some(status),
            error: None,
        }
    }

    /// A failed result.
    #[must_use]
    pub fn failed(service_id: ServiceId, error: String) -> Self {
        Self {
            service_id,
            success: false,
            status: None,
            error: Some(error),
        }
    }
}

/// A lifecycle action on a stack or service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    /// Create if necessary, then start.
    Start,
    /// Stop.
    Stop,
    /// Stop, then start.
    Restart,
}

impl LifecycleAction {
    /// Past-tense verb used in messages.
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Restart => "restarted",
        }
    }
}

/// Result of starting or stopping a whole stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackActionReport {
    /// The stack acted on.
    pub stack_id: StackId,
    /// The action taken.
    pub action: LifecycleAction,
    /// One result per service, in definition order.
    pub results: Vec<ServiceOutcome>,
}

/// Result of restarting a whole stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartReport {
    /// The stack acted on.
    pub stack_id: StackId,
    /// Always [`LifecycleAction::Restart`].
    pub action: LifecycleAction,
    /// Results of the stop pass.
    pub stop_results: Vec<ServiceOutcome>,
    /// Results of the start pass.
    pub start_results: Vec<ServiceOutcome>,
}

/// Result of a single-service action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceActionReport {
    /// Owning stack.
    pub stack_id: StackId,
    /// The service acted on.
    pub service_id: ServiceId,
    /// The action taken.
    pub action: LifecycleAction,
    /// Always true; failures are reported as errors.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
}

/// Status row for one service of a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatusEntry {
    /// Service identifier.
    pub service_id: ServiceId,
    /// Service display name.
    pub service_name: String,
    /// `running`, the runtime state label, or `error`.
    pub status: String,
    /// Whether the container process is running.
    pub running: bool,
    /// When the container was last started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the container last exited.
    pub finished_at: Option<DateTime<Utc>>,
    /// Exit code of the last run.
    pub exit_code: Option<i64>,
    /// Inspection failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Live status of every service in a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackStatusReport {
    /// The stack.
    pub stack_id: StackId,
    /// Display name of the stack.
    pub stack_name: String,
    /// One row per service, in declaration order.
    pub services: Vec<ServiceStatusEntry>,
}

/// A service's stored definition merged with its live container status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceView {
    /// Service identifier.
    pub id: ServiceId,
    /// Owning stack.
    pub stack_id: StackId,
    /// Display name.
    pub name: String,
    /// Container image reference.
    pub image: String,
    /// Stored container configuration.
    pub container_config: ContainerConfig,
    /// `running`, the runtime state label, or `error`.
    pub status: String,
    /// Live container details, when inspection succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_details: Option<ContainerStatus>,
    /// Inspection failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceView {
    /// Flatten into a status row.
    #[must_use]
    pub fn status_entry(&self) -> ServiceStatusEntry {
        let details = self.container_details.as_ref();
        ServiceStatusEntry {
            service_id: self.id.clone(),
            service_name: self.name.clone(),
            status: self.status.clone(),
            running: details.is_some_and(|d| d.running),
            started_at: details.and_then(|d| d.started_at),
            finished_at: details.and_then(|d| d.finished_at),
            exit_code: details.and_then(|d| d.exit_code),
            error: self.error.clone(),
        }
    }
}

/// A stack with every service reconciled against the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackView {
    /// Stack identifier.
    pub id: StackId,
    /// Display name.
    pub name: String,
    /// Services in definition order.
    pub services: Vec<ServiceView>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Reachability of the control plane's dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// The definition store answered a read.
    pub database: bool,
    /// The container runtime answered a ping.
    pub runtime: bool,
}

/// Configuration for the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Log lines returned when the caller does not ask for a count.
    pub default_log_tail: usize,
    /// Upper bound on requested log lines.
    pub max_log_tail: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            default_log_tail: 100,
            max_log_tail: 10_000,
        }
    }
}

impl ControlConfig {
    /// Resolve a requested tail against the default and the cap.
    ///
    /// A tail of zero means "not specified".
    #[must_use]
    pub fn log_tail(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|&n| n > 0)
            .unwrap_or(self.default_log_tail)
            .min(self.max_log_tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serialization_omits_absent_fields() {
        let ok = ServiceOutcome::succeeded(ServiceId::parse("web").unwrap(), ServiceState::Started);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"serviceId": "web", "success": true, "status": "started"})
        );

        let failed = ServiceOutcome::failed(ServiceId::parse("db").unwrap(), "boom".into());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"serviceId": "db", "success": false, "error": "boom"})
        );
    }

    #[test]
    fn log_tail_is_clamped() {
        let config = ControlConfig::default();
        assert_eq!(config.log_tail(None), 100);
        assert_eq!(config.log_tail(Some(5)), 5);
        assert_eq!(config.log_tail(Some(0)), 100);
        assert_eq!(config.log_tail(Some(usize::MAX)), 10_000);
    }
}
