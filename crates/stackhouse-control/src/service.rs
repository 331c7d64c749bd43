//! Control plane service implementation.
//!
//! This module provides the `ControlPlane` trait and `ControlPlaneService`
//! implementation that ties the definition store to the container runtime.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use stackhouse_core::{ServiceId, StackId};
use stackhouse_runtime::{ContainerRuntime, LogOptions};
use stackhouse_store::{Service, Stack, StackDefinition, StackSummary, Store, StoreError};
use tracing::{info, warn};

use crate::error::{ControlError, Result};
use crate::orchestrator;
use crate::reconcile;
use crate::types::{
    ControlConfig, HealthReport, LifecycleAction, RestartReport, ServiceActionReport,
    ServiceView, StackActionReport, StackStatusReport, StackView,
};

/// Prefix of the line returned in place of logs that could not be fetched.
pub const LOG_ERROR_PREFIX: &str = "Error retrieving logs: ";

/// Trait defining the control plane operations.
///
/// This trait provides the complete API for managing stacks and their
/// services. Implementations handle persistence, runtime orchestration and
/// status reconciliation.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    // =========================================================================
    // Stack Definition Operations
    // =========================================================================

    /// List all stacks, newest first.
    async fn list_stacks(&self) -> Result<Vec<StackSummary>>;

    /// Get a stack with live status for every service.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::StackNotFound` if the stack doesn't exist.
    async fn get_stack(&self, stack_id: &StackId) -> Result<StackView>;

    /// Store a new stack definition. No containers are touched.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::DuplicateStack` if the ID is taken.
    async fn create_stack(&self, def: StackDefinition) -> Result<Stack>;

    /// Replace a stack's definition. Running containers are not touched.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::StackNotFound` if the stack doesn't exist.
    async fn update_stack(&self, stack_id: &StackId, def: StackDefinition) -> Result<Stack>;

    /// Delete a stack definition, then remove its containers on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::StackNotFound` if the stack doesn't exist.
    async fn delete_stack(&self, stack_id: &StackId) -> Result<()>;

    // =========================================================================
    // Stack Lifecycle Operations
    // =========================================================================

    /// Create and start every service of a stack.
    async fn start_stack(&self, stack_id: &StackId) -> Result<StackActionReport>;

    /// Stop every service of a stack.
    async fn stop_stack(&self, stack_id: &StackId) -> Result<StackActionReport>;

    /// Stop every service, then start every service.
    async fn restart_stack(&self, stack_id: &StackId) -> Result<RestartReport>;

    /// Per-service status rows.
    async fn stack_status(&self, stack_id: &StackId) -> Result<StackStatusReport>;

    /// Logs of every service, keyed by service ID.
    ///
    /// A service whose logs cannot be fetched gets an error line instead.
    async fn stack_logs(
        &self,
        stack_id: &StackId,
        tail: Option<usize>,
    ) -> Result<BTreeMap<ServiceId, String>>;

    // =========================================================================
    // Service Operations
    // =========================================================================

    /// Get one service with live status.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ServiceNotFound` if the service doesn't exist.
    async fn get_service(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<ServiceView>;

    /// Trimmed, non-empty log lines of one service.
    async fn service_logs(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
        tail: Option<usize>,
    ) -> Result<Vec<String>>;

    /// Create and start one service.
    async fn start_service(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
    ) -> Result<ServiceActionReport>;

    /// Stop one service.
    async fn stop_service(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
    ) -> Result<ServiceActionReport>;

    /// Stop, create and start one service.
    async fn restart_service(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
    ) -> Result<ServiceActionReport>;

    // =========================================================================
    // Operational
    // =========================================================================

    /// Probe the store and the runtime.
    async fn health(&self) -> HealthReport;
}

/// The main control plane service implementation.
pub struct ControlPlaneService<S: Store, R: ContainerRuntime> {
    store: Arc<S>,
    runtime: Arc<R>,
    config: ControlConfig,
}

impl<S: Store, R: ContainerRuntime> ControlPlaneService<S, R> {
    /// Create a new control plane service.
    #[must_use]
    pub fn new(store: Arc<S>, runtime: Arc<R>, config: ControlConfig) -> Self {
        Self {
            store,
            runtime,
            config,
        }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(store: Arc<S>, runtime: Arc<R>) -> Self {
        Self::new(store, runtime, ControlConfig::default())
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the runtime.
    #[must_use]
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ControlConfig {
        &self.config
    }

    fn load_stack(&self, stack_id: &StackId) -> Result<Stack> {
        self.store
            .get_stack(stack_id)?
            .ok_or_else(|| ControlError::StackNotFound(stack_id.clone()))
    }

    fn load_service(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<Service> {
        if let Some(service) = self.store.get_service(stack_id, service_id)? {
            return Ok(service);
        }
        // Missing stack wins over missing service
        self.load_stack(stack_id)?;
        Err(ControlError::ServiceNotFound {
            stack_id: stack_id.clone(),
            service_id: service_id.clone(),
        })
    }

    async fn fetch_logs(&self, service: &Service, tail: Option<usize>) -> String {
        let options = LogOptions {
            tail: self.config.log_tail(tail),
        };
        match self
            .runtime
            .logs(&service.stack_id, &service.id, &options)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(stack_id = %service.stack_id, service_id = %service.id, error = %e, "Failed to fetch logs");
                format!("{LOG_ERROR_PREFIX}{e}")
            }
        }
    }

    fn service_report(
        stack_id: &StackId,
        service_id: &ServiceId,
        action: LifecycleAction,
    ) -> ServiceActionReport {
        ServiceActionReport {
            stack_id: stack_id.clone(),
            service_id: service_id.clone(),
            action,
            success: true,
            message: format!("Service {} successfully", action.past_tense()),
        }
    }
}

#[async_trait]
impl<S: Store + 'static, R: ContainerRuntime + 'static> ControlPlane for ControlPlaneService<S, R> {
    // =========================================================================
    // Stack Definition Operations
    // =========================================================================

    async fn list_stacks(&self) -> Result<Vec<StackSummary>> {
        Ok(self.store.list_stacks()?)
    }

    async fn get_stack(&self, stack_id: &StackId) -> Result<StackView> {
        let stack = self.load_stack(stack_id)?;
        Ok(reconcile::reconcile_stack(self.runtime.as_ref(), &stack).await)
    }

    async fn create_stack(&self, def: StackDefinition) -> Result<Stack> {
        match self.store.create_stack(&def) {
            Ok(stack) => Ok(stack),
            Err(StoreError::AlreadyExists) => Err(ControlError::DuplicateStack(def.id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_stack(&self, stack_id: &StackId, def: StackDefinition) -> Result<Stack> {
        match self.store.update_stack(stack_id, &def) {
            Ok(stack) => Ok(stack),
            Err(StoreError::NotFound) => Err(ControlError::StackNotFound(stack_id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_stack(&self, stack_id: &StackId) -> Result<()> {
        let stack = self.load_stack(stack_id)?;

        if !self.store.delete_stack(stack_id)? {
            return Err(ControlError::StackNotFound(stack_id.clone()));
        }

        let results = orchestrator::remove_stack(self.runtime.as_ref(), &stack).await;
        let leftover = results.iter().filter(|r| !r.success).count();
        if leftover > 0 {
            warn!(stack_id = %stack_id, leftover, "Stack deleted but some containers could not be removed");
        }

        info!(stack_id = %stack_id, "Stack deleted");
        Ok(())
    }

    // =========================================================================
    // Stack Lifecycle Operations
    // =========================================================================

    async fn start_stack(&self, stack_id: &StackId) -> Result<StackActionReport> {
        let stack = self.load_stack(stack_id)?;
        let results = orchestrator::start_stack(self.runtime.as_ref(), &stack).await;
        Ok(StackActionReport {
            stack_id: stack.id,
            action: LifecycleAction::Start,
            results,
        })
    }

    async fn stop_stack(&self, stack_id: &StackId) -> Result<StackActionReport> {
        let stack = self.load_stack(stack_id)?;
        let results = orchestrator::stop_stack(self.runtime.as_ref(), &stack).await;
        Ok(StackActionReport {
            stack_id: stack.id,
            action: LifecycleAction::Stop,
            results,
        })
    }

    async fn restart_stack(&self, stack_id: &StackId) -> Result<RestartReport> {
        let stack = self.load_stack(stack_id)?;
        let (stop_results, start_results) =
            orchestrator::restart_stack(self.runtime.as_ref(), &stack).await;
        Ok(RestartReport {
            stack_id: stack.id,
            action: LifecycleAction::Restart,
            stop_results,
            start_results,
        })
    }

    async fn stack_status(&self, stack_id: &StackId) -> Result<StackStatusReport> {
        let stack = self.load_stack(stack_id)?;
        let services = reconcile::stack_status(self.runtime.as_ref(), &stack).await;
        Ok(StackStatusReport {
            stack_id: stack.id,
            stack_name: stack.name,
            services,
        })
    }

    async fn stack_logs(
        &self,
        stack_id: &StackId,
        tail: Option<usize>,
    ) -> Result<BTreeMap<ServiceId, String>> {
        let stack = self.load_stack(stack_id)?;
        let mut logs = BTreeMap::new();
        for service in &stack.services {
            logs.insert(service.id.clone(), self.fetch_logs(service, tail).await);
        }
        Ok(logs)
    }

    // =========================================================================
    // Service Operations
    // =========================================================================

    async fn get_service(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<ServiceView> {
        let service = self.load_service(stack_id, service_id)?;
        Ok(reconcile::reconcile_service(self.runtime.as_ref(), &service).await)
    }

    async fn service_logs(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
        tail: Option<usize>,
    ) -> Result<Vec<String>> {
        let service = self.load_service(stack_id, service_id)?;
        let text = self.fetch_logs(&service, tail).await;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    async fn start_service(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
    ) -> Result<ServiceActionReport> {
        let service = self.load_service(stack_id, service_id)?;
        orchestrator::start_service(self.runtime.as_ref(), &service).await?;
        info!(stack_id = %stack_id, service_id = %service_id, "Service started");
        Ok(Self::service_report(stack_id, service_id, LifecycleAction::Start))
    }

    async fn stop_service(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
    ) -> Result<ServiceActionReport> {
        let service = self.load_service(stack_id, service_id)?;
        orchestrator::stop_service(self.runtime.as_ref(), &service).await?;
        info!(stack_id = %stack_id, service_id = %service_id, "Service stopped");
        Ok(Self::service_report(stack_id, service_id, LifecycleAction::Stop))
    }

    async fn restart_service(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
    ) -> Result<ServiceActionReport> {
        let service = self.load_service(stack_id, service_id)?;
        orchestrator::restart_service(self.runtime.as_ref(), &service).await?;
        info!(stack_id = %stack_id, service_id = %service_id, "Service restarted");
        Ok(Self::service_report(stack_id, service_id, LifecycleAction::Restart))
    }

    // =========================================================================
    // Operational
    // =========================================================================

    async fn health(&self) -> HealthReport {
        HealthReport {
            database: self.store.list_stacks().is_ok(),
            runtime: self.runtime.ping().await.is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackhouse_core::ContainerConfig;
    use stackhouse_runtime::{MockRuntime, Operation};
    use stackhouse_store::{RocksStore, ServiceDefinition};
    use tempfile::TempDir;

    type TestService = ControlPlaneService<RocksStore, MockRuntime>;

    fn setup() -> (TestService, Arc<MockRuntime>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let runtime = Arc::new(MockRuntime::new());
        let service = ControlPlaneService::with_defaults(store, Arc::clone(&runtime));
        (service, runtime, dir)
    }

    fn definition(id: &str, services: &[&str]) -> StackDefinition {
        StackDefinition {
            id: StackId::parse(id).unwrap(),
            name: id.to_string(),
            services: services
                .iter()
                .map(|s| ServiceDefinition {
                    id: ServiceId::parse(s).unwrap(),
                    name: (*s).to_string(),
                    image: "nginx:latest".to_string(),
                    container_config: ContainerConfig::default(),
                })
                .collect(),
        }
    }

    fn sid(s: &str) -> ServiceId {
        ServiceId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn create_does_not_touch_runtime() {
        let (control, runtime, _dir) = setup();
        control.create_stack(definition("shop", &["web"])).await.unwrap();
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn create_duplicate_is_rejected() {
        let (control, _runtime, _dir) = setup();
        control.create_stack(definition("shop", &["web"])).await.unwrap();
        let err = control
            .create_stack(definition("shop", &["web"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::DuplicateStack(_)));
    }

    #[tokio::test]
    async fn invalid_definition_is_reported() {
        let (control, _runtime, _dir) = setup();
        let err = control
            .create_stack(definition("shop", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidDefinition(_)));
        assert_eq!(err.http_status_code(), 400);
    }

    #[tokio::test]
    async fn update_missing_stack_is_not_found() {
        let (control, _runtime, _dir) = setup();
        let def = definition("ghost", &["web"]);
        let err = control.update_stack(&def.id.clone(), def).await.unwrap_err();
        assert!(matches!(err, ControlError::StackNotFound(_)));
    }

    #[tokio::test]
    async fn start_stack_reports_every_service() {
        let (control, runtime, _dir) = setup();
        let stack = control
            .create_stack(definition("shop", &["web", "api", "db"]))
            .await
            .unwrap();
        runtime.fail_with_status(Operation::Start, "shop", "api", 500, "boom");

        let report = control.start_stack(&stack.id).await.unwrap();
        assert_eq!(report.action, LifecycleAction::Start);
        let flags: Vec<_> = report.results.iter().map(|r| r.success).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[tokio::test]
    async fn get_stack_merges_live_status() {
        let (control, _runtime, _dir) = setup();
        let stack = control
            .create_stack(definition("shop", &["web", "db"]))
            .await
            .unwrap();
        control.start_service(&stack.id, &sid("web")).await.unwrap();

        let view = control.get_stack(&stack.id).await.unwrap();
        assert_eq!(view.services[0].status, "running");
        assert_eq!(view.services[1].status, "not-created");
    }

    #[tokio::test]
    async fn delete_removes_definition_and_containers() {
        let (control, runtime, _dir) = setup();
        let stack = control
            .create_stack(definition("shop", &["web", "db"]))
            .await
            .unwrap();
        control.start_stack(&stack.id).await.unwrap();
        assert_eq!(runtime.container_count(), 2);

        control.delete_stack(&stack.id).await.unwrap();
        assert_eq!(runtime.container_count(), 0);
        assert!(matches!(
            control.get_stack(&stack.id).await,
            Err(ControlError::StackNotFound(_))
        ));
        assert!(matches!(
            control.delete_stack(&stack.id).await,
            Err(ControlError::StackNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_succeeds_when_runtime_is_down() {
        let (control, runtime, _dir) = setup();
        let stack = control
            .create_stack(definition("shop", &["web"]))
            .await
            .unwrap();
        runtime.set_unavailable(true);

        control.delete_stack(&stack.id).await.unwrap();
        assert!(control.store().get_stack(&stack.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn restart_stack_returns_both_passes() {
        let (control, _runtime, _dir) = setup();
        let stack = control
            .create_stack(definition("shop", &["web", "db"]))
            .await
            .unwrap();

        let report = control.restart_stack(&stack.id).await.unwrap();
        assert_eq!(report.stop_results.len(), 2);
        assert_eq!(report.start_results.len(), 2);
        assert!(report.stop_results.iter().all(|r| r.success));
        assert!(report.start_results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn service_actions() {
        let (control, runtime, _dir) = setup();
        let stack = control
            .create_stack(definition("shop", &["web"]))
            .await
            .unwrap();

        let report = control.start_service(&stack.id, &sid("web")).await.unwrap();
        assert_eq!(report.message, "Service started successfully");

        let report = control.restart_service(&stack.id, &sid("web")).await.unwrap();
        assert_eq!(report.action, LifecycleAction::Restart);
        assert!(runtime.status_of("shop", "web").unwrap().running);

        let report = control.stop_service(&stack.id, &sid("web")).await.unwrap();
        assert_eq!(report.message, "Service stopped successfully");

        let err = control
            .start_service(&stack.id, &sid("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::ServiceNotFound { .. }));
    }

    #[tokio::test]
    async fn service_lookup_distinguishes_missing_stack() {
        let (control, _runtime, _dir) = setup();
        control
            .create_stack(definition("shop", &["web", "db"]))
            .await
            .unwrap();

        let view = control.get_service(&StackId::parse("shop").unwrap(), &sid("db")).await.unwrap();
        assert_eq!(view.id, sid("db"));

        let err = control
            .get_service(&StackId::parse("shop").unwrap(), &sid("cache"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::ServiceNotFound { .. }));

        let err = control
            .get_service(&StackId::parse("blog").unwrap(), &sid("web"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::StackNotFound(_)));
    }

    #[tokio::test]
    async fn service_start_failure_propagates() {
        let (control, runtime, _dir) = setup();
        let stack = control
            .create_stack(definition("shop", &["web"]))
            .await
            .unwrap();
        runtime.fail_unavailable(Operation::Create, "shop", "web");

        let err = control.start_service(&stack.id, &sid("web")).await.unwrap_err();
        assert_eq!(err.http_status_code(), 503);
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn logs_are_trimmed_and_errors_inlined() {
        let (control, runtime, _dir) = setup();
        let stack = control
            .create_stack(definition("shop", &["web", "db"]))
            .await
            .unwrap();
        control.start_stack(&stack.id).await.unwrap();
        runtime.push_log("shop", "web", "  hello  ");
        runtime.push_log("shop", "web", "");
        runtime.push_log("shop", "web", "world");
        runtime.fail_with_status(Operation::Logs, "shop", "db", 500, "log driver none");

        let lines = control
            .service_logs(&stack.id, &sid("web"), None)
            .await
            .unwrap();
        assert_eq!(lines, vec!["hello", "world"]);

        let all = control.stack_logs(&stack.id, Some(1)).await.unwrap();
        assert_eq!(all[&sid("web")], "world\n");
        assert!(all[&sid("db")].starts_with(LOG_ERROR_PREFIX));
    }

    #[tokio::test]
    async fn stack_status_carries_name_and_rows() {
        let (control, _runtime, _dir) = setup();
        let stack = control
            .create_stack(definition("shop", &["web", "db"]))
            .await
            .unwrap();
        control.start_service(&stack.id, &sid("web")).await.unwrap();

        let report = control.stack_status(&stack.id).await.unwrap();
        assert_eq!(report.stack_name, "shop");
        assert_eq!(report.services.len(), 2);
        assert_eq!(report.services[0].status, "running");
        assert!(report.services[0].running);
        assert_eq!(report.services[1].status, "not-created");
    }

    #[tokio::test]
    async fn health_reflects_runtime() {
        let (control, runtime, _dir) = setup();
        assert_eq!(
            control.health().await,
            HealthReport {
                database: true,
                runtime: true
            }
        );
        runtime.set_unavailable(true);
        assert!(!control.health().await.runtime);
    }
}
