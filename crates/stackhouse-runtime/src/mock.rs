//! In-memory runtime for tests.
//!
//! [`MockRuntime`] keeps containers in a map and reports missing, running and
//! stopped containers with the same tagged outcomes the Docker client
//! produces, so the absorption policy is exercised exactly as in production.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use stackhouse_core::{naming, ServiceId, StackId};
use stackhouse_store::Service;

use crate::docker::{ContainerRuntime, CONTAINER_NOT_FOUND_LOG};
use crate::outcome::{Operation, Outcome, Settled};
use crate::types::{ContainerHandle, ContainerStatus, LogOptions};
use crate::{Result, RuntimeError};

/// A mock runtime that stores containers in memory.
#[derive(Default)]
pub struct MockRuntime {
    containers: Mutex<HashMap<String, MockContainer>>,
    failures: Mutex<HashMap<(Operation, String), InjectedFailure>>,
    calls: Mutex<Vec<(Operation, String)>>,
    unavailable: Mutex<bool>,
    next_id: Mutex<u64>,
}

struct MockContainer {
    id: String,
    image: String,
    status: ContainerStatus,
    logs: Vec<String>,
}

#[derive(Clone)]
enum InjectedFailure {
    Status(u16, String),
    Unavailable(String),
}

impl MockRuntime {
    /// Create a new mock runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail with a runtime status for one service until cleared.
    pub fn fail_with_status(
        &self,
        op: Operation,
        stack_id: &str,
        service_id: &str,
        status: u16,
        message: &str,
    ) {
        self.failures.lock().insert(
            (op, container_key(stack_id, service_id)),
            InjectedFailure::Status(status, message.to_string()),
        );
    }

    /// Make `op` fail as if the daemon were unreachable, for one service.
    pub fn fail_unavailable(&self, op: Operation, stack_id: &str, service_id: &str) {
        self.failures.lock().insert(
            (op, container_key(stack_id, service_id)),
            InjectedFailure::Unavailable("connection refused".to_string()),
        );
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Make every call fail as if the daemon were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    /// Remove a container behind the caller's back.
    pub fn forget(&self, stack_id: &str, service_id: &str) {
        self.containers
            .lock()
            .remove(&container_key(stack_id, service_id));
    }

    /// Append a log line to an existing container.
    pub fn push_log(&self, stack_id: &str, service_id: &str, line: &str) {
        if let Some(c) = self
            .containers
            .lock()
            .get_mut(&container_key(stack_id, service_id))
        {
            c.logs.push(line.to_string());
        }
    }

    /// Get the number of existing containers.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.lock().len()
    }

    /// Get the status of a container, if it exists.
    #[must_use]
    pub fn status_of(&self, stack_id: &str, service_id: &str) -> Option<ContainerStatus> {
        self.containers
            .lock()
            .get(&container_key(stack_id, service_id))
            .map(|c| c.status.clone())
    }

    /// Get the image a container was created from.
    #[must_use]
    pub fn image_of(&self, stack_id: &str, service_id: &str) -> Option<String> {
        self.containers
            .lock()
            .get(&container_key(stack_id, service_id))
            .map(|c| c.image.clone())
    }

    /// Every call made so far, in order, as `(operation, container name)`.
    #[must_use]
    pub fn calls(&self) -> Vec<(Operation, String)> {
        self.calls.lock().clone()
    }

    /// Run one simulated runtime call and settle it like the Docker client does.
    fn run<T>(
        &self,
        op: Operation,
        name: &str,
        apply: impl FnOnce(&mut HashMap<String, MockContainer>) -> Outcome<T>,
    ) -> Result<Settled<T>> {
        self.calls.lock().push((op, name.to_string()));

        if *self.unavailable.lock() {
            return Err(RuntimeError::Unavailable("mock runtime is down".to_string()));
        }

        let injected = self.failures.lock().get(&(op, name.to_string())).cloned();
        let outcome = match injected {
            Some(InjectedFailure::Status(status, message)) => Outcome::from_status(status, message),
            Some(InjectedFailure::Unavailable(message)) => {
                Outcome::Failed(RuntimeError::Unavailable(message))
            }
            None => apply(&mut self.containers.lock()),
        };

        outcome.settle(op)
    }
}

fn container_key(stack_id: &str, service_id: &str) -> String {
    format!("{stack_id}{}{service_id}", naming::SEPARATOR)
}

fn no_such_container(name: &str) -> String {
    format!("No such container: {name}")
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn create(&self, service: &Service) -> Result<ContainerHandle> {
        let name = naming::container_name(&service.stack_id, &service.id)?;
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            format!("mock-{next:012}")
        };

        let settled = self.run(Operation::Create, &name, |containers| {
            if containers.contains_key(&name) {
                return Outcome::AlreadyExists(format!("Conflict. The container name \"/{name}\" is already in use"));
            }
            let mut status = ContainerStatus::not_created();
            status.status = "created".to_string();
            containers.insert(
                name.clone(),
                MockContainer {
                    id: id.clone(),
                    image: service.image.clone(),
                    status,
                    logs: Vec::new(),
                },
            );
            Outcome::Done(id.clone())
        })?;

        Ok(match settled {
            Settled::Done(id) => ContainerHandle {
                name,
                id: Some(id),
                reused: false,
            },
            Settled::Absorbed(_) => {
                let id = self.containers.lock().get(&name).map(|c| c.id.clone());
                ContainerHandle {
                    name,
                    id,
                    reused: true,
                }
            }
        })
    }

    async fn start(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<()> {
        let name = naming::container_name(stack_id, service_id)?;
        self.run(Operation::Start, &name, |containers| {
            match containers.get_mut(&name) {
                None => Outcome::NotFound(no_such_container(&name)),
                Some(c) if c.status.running => Outcome::NotModified("container already started".into()),
                Some(c) => {
                    c.status.status = "running".to_string();
                    c.status.running = true;
                    c.status.started_at = Some(Utc::now());
                    c.status.exit_code = None;
                    Outcome::Done(())
                }
            }
        })?;
        Ok(())
    }

    async fn stop(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<()> {
        let name = naming::container_name(stack_id, service_id)?;
        self.run(Operation::Stop, &name, |containers| {
            match containers.get_mut(&name) {
                None => Outcome::NotFound(no_such_container(&name)),
                Some(c) if !c.status.running => Outcome::NotModified("container already stopped".into()),
                Some(c) => {
                    c.status.status = "exited".to_string();
                    c.status.running = false;
                    c.status.finished_at = Some(Utc::now());
                    c.status.exit_code = Some(0);
                    Outcome::Done(())
                }
            }
        })?;
        Ok(())
    }

    async fn remove(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<()> {
        let name = naming::container_name(stack_id, service_id)?;
        self.run(Operation::Remove, &name, |containers| {
            match containers.remove(&name) {
                Some(_) => Outcome::Done(()),
                None => Outcome::NotFound(no_such_container(&name)),
            }
        })?;
        Ok(())
    }

    async fn inspect(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
    ) -> Result<ContainerStatus> {
        let name = naming::container_name(stack_id, service_id)?;
        let settled = self.run(Operation::Inspect, &name, |containers| {
            match containers.get(&name) {
                Some(c) => Outcome::Done(c.status.clone()),
                None => Outcome::NotFound(no_such_container(&name)),
            }
        })?;
        Ok(match settled {
            Settled::Done(status) => status,
            Settled::Absorbed(_) => ContainerStatus::not_created(),
        })
    }

    async fn logs(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
        options: &LogOptions,
    ) -> Result<String> {
        let name = naming::container_name(stack_id, service_id)?;
        let settled = self.run(Operation::Logs, &name, |containers| {
            match containers.get(&name) {
                Some(c) => {
                    let skip = c.logs.len().saturating_sub(options.tail);
                    let text: String = c.logs[skip..].iter().map(|l| format!("{l}\n")).collect();
                    Outcome::Done(text)
                }
                None => Outcome::NotFound(no_such_container(&name)),
            }
        })?;
        Ok(match settled {
            Settled::Done(text) => text,
            Settled::Absorbed(_) => CONTAINER_NOT_FOUND_LOG.to_string(),
        })
    }

    async fn ping(&self) -> Result<()> {
        if *self.unavailable.lock() {
            return Err(RuntimeError::Unavailable("mock runtime is down".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackhouse_core::ContainerConfig;

    fn service(stack: &str, id: &str) -> Service {
        Service {
            stack_id: StackId::parse(stack).unwrap(),
            id: ServiceId::parse(id).unwrap(),
            name: id.to_string(),
            image: "nginx:latest".to_string(),
            container_config: ContainerConfig::default(),
        }
    }

    fn ids(stack: &str, service: &str) -> (StackId, ServiceId) {
        (
            StackId::parse(stack).unwrap(),
            ServiceId::parse(service).unwrap(),
        )
    }

    #[tokio::test]
    async fn stop_never_created_is_success() {
        let runtime = MockRuntime::new();
        let (stack, svc) = ids("shop", "web");
        runtime.stop(&stack, &svc).await.unwrap();
        runtime.remove(&stack, &svc).await.unwrap();
        assert_eq!(runtime.container_count(), 0);
    }

    #[tokio::test]
    async fn start_never_created_fails() {
        let runtime = MockRuntime::new();
        let (stack, svc) = ids("shop", "web");
        let err = runtime.start(&stack, &svc).await.unwrap_err();
        assert_eq!(err.runtime_status(), Some(404));
    }

    #[tokio::test]
    async fn repeated_calls_are_idempotent() {
        let runtime = MockRuntime::new();
        let web = service("shop", "web");
        let (stack, svc) = ids("shop", "web");

        let first = runtime.create(&web).await.unwrap();
        let second = runtime.create(&web).await.unwrap();
        assert!(!first.reused);
        assert!(second.reused);
        assert_eq!(first.id, second.id);

        runtime.start(&stack, &svc).await.unwrap();
        runtime.start(&stack, &svc).await.unwrap();
        assert!(runtime.status_of("shop", "web").unwrap().running);

        runtime.stop(&stack, &svc).await.unwrap();
        runtime.stop(&stack, &svc).await.unwrap();
        assert_eq!(runtime.status_of("shop", "web").unwrap().status, "exited");
    }

    #[tokio::test]
    async fn inspect_and_logs_of_missing_container() {
        let runtime = MockRuntime::new();
        let (stack, svc) = ids("shop", "web");
        let status = runtime.inspect(&stack, &svc).await.unwrap();
        assert!(status.is_not_created());

        let logs = runtime
            .logs(&stack, &svc, &LogOptions::default())
            .await
            .unwrap();
        assert_eq!(logs, CONTAINER_NOT_FOUND_LOG);
    }

    #[tokio::test]
    async fn logs_honour_tail() {
        let runtime = MockRuntime::new();
        runtime.create(&service("shop", "web")).await.unwrap();
        for i in 0..5 {
            runtime.push_log("shop", "web", &format!("line {i}"));
        }
        let (stack, svc) = ids("shop", "web");
        let logs = runtime
            .logs(&stack, &svc, &LogOptions { tail: 2 })
            .await
            .unwrap();
        assert_eq!(logs, "line 3\nline 4\n");
    }

    #[tokio::test]
    async fn injected_failures_surface() {
        let runtime = MockRuntime::new();
        runtime.fail_with_status(Operation::Create, "shop", "web", 500, "disk full");
        let err = runtime.create(&service("shop", "web")).await.unwrap_err();
        assert_eq!(err.runtime_status(), Some(500));

        runtime.clear_failures();
        runtime.set_unavailable(true);
        let err = runtime.create(&service("shop", "web")).await.unwrap_err();
        assert!(err.is_retriable());
        assert!(runtime.ping().await.is_err());
    }
}
