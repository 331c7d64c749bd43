//! Stack and service lifecycle orchestration.
//!
//! Stack-wide operations walk the services strictly in definition order, one
//! at a time, and never stop early: each service gets its own
//! [`ServiceOutcome`] and a failure on one does not prevent the attempt on
//! the next. Single-service operations are fail-fast and propagate the first
//! runtime error.

use stackhouse_runtime::ContainerRuntime;
use stackhouse_store::{Service, Stack};
use tracing::{info, warn};

use crate::error::Result;
use crate::types::{ServiceOutcome, ServiceState};

/// Create (if needed) and start every service of a stack.
pub async fn start_stack<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    stack: &Stack,
) -> Vec<ServiceOutcome> {
    let mut results = Vec::with_capacity(stack.services.len());
    for service in &stack.services {
        let outcome = match start_service(runtime, service).await {
            Ok(()) => ServiceOutcome::succeeded(service.id.clone(), ServiceState::Started),
            Err(e) => {
                warn!(stack_id = %stack.id, service_id = %service.id, error = %e, "Failed to start service");
                ServiceOutcome::failed(service.id.clone(), e.to_string())
            }
        };
        results.push(outcome);
    }
    log_summary(stack, "start", &results);
    results
}

/// Stop every service of a stack.
pub async fn stop_stack<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    stack: &Stack,
) -> Vec<ServiceOutcome> {
    let mut results = Vec::with_capacity(stack.services.len());
    for service in &stack.services {
        let outcome = match stop_service(runtime, service).await {
            Ok(()) => ServiceOutcome::succeeded(service.id.clone(), ServiceState::Stopped),
            Err(e) => {
                warn!(stack_id = %stack.id, service_id = %service.id, error = %e, "Failed to stop service");
                ServiceOutcome::failed(service.id.clone(), e.to_string())
            }
        };
        results.push(outcome);
    }
    log_summary(stack, "stop", &results);
    results
}

/// Stop the whole stack, then start the whole stack.
///
/// Returns the stop results and the start results.
pub async fn restart_stack<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    stack: &Stack,
) -> (Vec<ServiceOutcome>, Vec<ServiceOutcome>) {
    let stopped = stop_stack(runtime, stack).await;
    let started = start_stack(runtime, stack).await;
    (stopped, started)
}

/// Remove the container of every service of a stack.
pub async fn remove_stack<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    stack: &Stack,
) -> Vec<ServiceOutcome> {
    let mut results = Vec::with_capacity(stack.services.len());
    for service in &stack.services {
        let outcome = match runtime.remove(&service.stack_id, &service.id).await {
            Ok(()) => ServiceOutcome::succeeded(service.id.clone(), ServiceState::Removed),
            Err(e) => {
                warn!(stack_id = %stack.id, service_id = %service.id, error = %e, "Failed to remove service container");
                ServiceOutcome::failed(service.id.clone(), e.to_string())
            }
        };
        results.push(outcome);
    }
    log_summary(stack, "remove", &results);
    results
}

/// Create (if needed) and start one service.
///
/// # Errors
///
/// Returns the first runtime error; a failed create skips the start.
pub async fn start_service<R: ContainerRuntime + ?Sized>(runtime: &R, service: &Service) -> Result<()> {
    runtime.create(service).await?;
    runtime.start(&service.stack_id, &service.id).await?;
    Ok(())
}

/// Stop one service.
///
/// # Errors
///
/// Returns the runtime error if the stop fails.
pub async fn stop_service<R: ContainerRuntime + ?Sized>(runtime: &R, service: &Service) -> Result<()> {
    runtime.stop(&service.stack_id, &service.id).await?;
    Ok(())
}

/// Stop, create (if needed) and start one service.
///
/// # Errors
///
/// Returns the first runtime error; later steps are skipped.
pub async fn restart_service<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    service: &Service,
) -> Result<()> {
    stop_service(runtime, service).await?;
    start_service(runtime, service).await
}

fn log_summary(stack: &Stack, action: &str, results: &[ServiceOutcome]) {
    let failed = results.iter().filter(|r| !r.success).count();
    info!(
        stack_id = %stack.id,
        action,
        services = results.len(),
        failed,
        "Stack operation finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stackhouse_core::{ContainerConfig, ServiceId, StackId};
    use stackhouse_runtime::{MockRuntime, Operation};

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
                    name: (*id).to_string(),
                    image: format!("{id}:latest"),
                    container_config: ContainerConfig::default(),
                })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn partial_failure_does_not_stop_later_services() {
        let runtime = MockRuntime::new();
        runtime.fail_with_status(Operation::Start, "shop", "api", 500, "port already allocated");
        let stack = stack(&["web", "api", "db"]);

        let results = start_stack(&runtime, &stack).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].error.as_deref().unwrap().contains("port already allocated"));
        assert!(results[2].success);
        assert!(runtime.status_of("shop", "web").unwrap().running);
        assert!(runtime.status_of("shop", "db").unwrap().running);
    }

    #[tokio::test]
    async fn results_follow_definition_order() {
        let runtime = MockRuntime::new();
        let stack = stack(&["zeta", "alpha", "mid"]);

        let results = stop_stack(&runtime, &stack).await;
        let order: Vec<_> = results.iter().map(|r| r.service_id.as_str()).collect();
        assert_eq!(order, vec!["zeta", "alpha", "mid"]);
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn restart_stops_everything_before_starting_anything() {
        let runtime = MockRuntime::new();
        let stack = stack(&["web", "db"]);
        start_stack(&runtime, &stack).await;
        let before = runtime.calls().len();

        let (stopped, started) = restart_stack(&runtime, &stack).await;
        assert!(stopped.iter().all(|r| r.success));
        assert!(started.iter().all(|r| r.success));

        let ops: Vec<_> = runtime.calls()[before..]
            .iter()
            .map(|(op, name)| (*op, name.clone()))
            .collect();
        assert_eq!(
            ops,
            vec![
                (Operation::Stop, "shop-web".to_string()),
                (Operation::Stop, "shop-db".to_string()),
                (Operation::Create, "shop-web".to_string()),
                (Operation::Start, "shop-web".to_string()),
                (Operation::Create, "shop-db".to_string()),
                (Operation::Start, "shop-db".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn restart_finishes_stop_pass_when_a_stop_fails() {
        let runtime = MockRuntime::new();
        let stack = stack(&["web", "db"]);
        start_stack(&runtime, &stack).await;
        runtime.fail_with_status(Operation::Stop, "shop", "web", 500, "cannot kill container");
        let before = runtime.calls().len();

        let (stopped, started) = restart_stack(&runtime, &stack).await;

        assert_eq!(stopped.len(), 2);
        assert!(!stopped[0].success);
        assert!(stopped[0].error.as_deref().unwrap().contains("cannot kill container"));
        assert!(stopped[1].success);
        assert_eq!(started.len(), 2);
        assert!(started.iter().all(|r| r.success));

        let ops: Vec<_> = runtime.calls()[before..]
            .iter()
            .map(|(op, name)| (*op, name.clone()))
            .collect();
        assert_eq!(
            ops,
            vec![
                (Operation::Stop, "shop-web".to_string()),
                (Operation::Stop, "shop-db".to_string()),
                (Operation::Create, "shop-web".to_string()),
                (Operation::Start, "shop-web".to_string()),
                (Operation::Create, "shop-db".to_string()),
                (Operation::Start, "shop-db".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let runtime = MockRuntime::new();
        let stack = stack(&["web"]);

        let first = start_stack(&runtime, &stack).await;
        let second = start_stack(&runtime, &stack).await;
        assert!(first[0].success && second[0].success);
        assert_eq!(runtime.container_count(), 1);
    }

    #[tokio::test]
    async fn single_service_start_fails_fast() {
        let runtime = MockRuntime::new();
        runtime.fail_with_status(Operation::Create, "shop", "web", 500, "no such image");
        let stack = stack(&["web"]);

        let err = start_service(&runtime, &stack.services[0]).await.unwrap_err();
        assert_eq!(err.http_status_code(), 500);
        assert!(!runtime
            .calls()
            .iter()
            .any(|(op, _)| *op == Operation::Start));
    }

    #[tokio::test]
    async fn remove_of_never_created_stack_succeeds() {
        let runtime = MockRuntime::new();
        let results = remove_stack(&runtime, &stack(&["web", "db"])).await;
        assert!(results.iter().all(|r| r.success && r.status == Some(ServiceState::Removed)));
    }
}
