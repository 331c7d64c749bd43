//! Status reconciliation.
//!
//! Merges stored desired state with live container inspection. Definition
//! fields always come from the store and status always comes from the
//! runtime. An inspection failure degrades only the service it belongs to.

use stackhouse_runtime::{ContainerRuntime, ContainerStatus};
use stackhouse_store::{Service, Stack};
use tracing::warn;

use crate::types::{ServiceStatusEntry, ServiceView, StackView, STATUS_ERROR};

/// Label for a successfully inspected container.
#[must_use]
pub fn status_label(status: &ContainerStatus) -> String {
    if status.running {
        "running".to_string()
    } else {
        status.status.clone()
    }
}

/// Reconcile one service against its container.
pub async fn reconcile_service<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    service: &Service,
) -> ServiceView {
    let (status, container_details, error) =
        match runtime.inspect(&service.stack_id, &service.id).await {
            Ok(details) => (status_label(&details), Some(details), None),
            Err(e) => {
                warn!(
                    stack_id = %service.stack_id,
                    service_id = %service.id,
                    error = %e,
                    "Failed to inspect service container"
                );
                (STATUS_ERROR.to_string(), None, Some(e.to_string()))
            }
        };

    ServiceView {
        id: service.id.clone(),
        stack_id: service.stack_id.clone(),
        name: service.name.clone(),
        image: service.image.clone(),
        container_config: service.container_config.clone(),
        status,
        container_details,
        error,
    }
}

/// Reconcile every service of a stack, in definition order.
pub async fn reconcile_stack<R: ContainerRuntime + ?Sized>(runtime: &R, stack: &Stack) -> StackView {
    let mut services = Vec::with_capacity(stack.services.len());
    for service in &stack.services {
        services.push(reconcile_service(runtime, service).await);
    }

    StackView {
        id: stack.id.clone(),
        name: stack.name.clone(),
        services,
        created_at: stack.created_at,
        updated_at: stack.updated_at,
    }
}

/// Per-service status rows for a stack.
pub async fn stack_status<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    stack: &Stack,
) -> Vec<ServiceStatusEntry> {
    reconcile_stack(runtime, stack)
        .await
        .services
        .iter()
        .map(ServiceView::status_entry)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stackhouse_core::{ContainerConfig, ServiceId, StackId};
    use stackhouse_runtime::{MockRuntime, Operation};

    use crate::orchestrator;

    fn stack(services: &[&str]) -> Stack {
        let stack_id = StackId::parse("shop").unwrap();
        Stack {
            id: stack_id.clone(),
            name: "shop".into(),
            services: services
                .iter()
                .map(|id| Service {
                    stack_id: stack_id.clone(),
                    id: ServiceId::parse(id).unwrap(),
                    name: format!("{id}-name"),
                    image: format!("{id}:1.0"),
                    container_config: ContainerConfig::default(),
                })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn never_started_stack_is_not_created() {
        let runtime = MockRuntime::new();
        let view = reconcile_stack(&runtime, &stack(&["web", "db"])).await;

        assert_eq!(view.services.len(), 2);
        for service in &view.services {
            assert_eq!(service.status, "not-created");
            assert!(service.error.is_none());
        }
        assert_eq!(view.services[0].name, "web-name");
        assert_eq!(view.services[0].image, "web:1.0");
    }

    #[tokio::test]
    async fn externally_removed_container_reads_not_created() {
        let runtime = MockRuntime::new();
        let stack = stack(&["web"]);
        orchestrator::start_stack(&runtime, &stack).await;
        assert_eq!(reconcile_stack(&runtime, &stack).await.services[0].status, "running");

        runtime.forget("shop", "web");

        let view = reconcile_stack(&runtime, &stack).await;
        assert_eq!(view.services[0].status, "not-created");
        assert!(!view.services[0].container_details.as_ref().unwrap().running);
    }

    #[tokio::test]
    async fn inspect_failure_degrades_only_that_service() {
        let runtime = MockRuntime::new();
        let stack = stack(&["web", "db"]);
        orchestrator::start_stack(&runtime, &stack).await;
        runtime.fail_with_status(Operation::Inspect, "shop", "db", 500, "daemon hiccup");

        let rows = stack_status(&runtime, &stack).await;
        assert_eq!(rows[0].status, "running");
        assert!(rows[0].running);
        assert_eq!(rows[1].status, STATUS_ERROR);
        assert!(rows[1].error.as_deref().unwrap().contains("daemon hiccup"));
        assert_eq!(rows[1].service_name, "db-name");
    }

    #[tokio::test]
    async fn stopped_container_reports_runtime_label() {
        let runtime = MockRuntime::new();
        let stack = stack(&["web"]);
        orchestrator::start_stack(&runtime, &stack).await;
        orchestrator::stop_stack(&runtime, &stack).await;

        let view = reconcile_service(&runtime, &stack.services[0]).await;
        assert_eq!(view.status, "exited");
        assert_eq!(view.container_details.unwrap().exit_code, Some(0));
    }
}
