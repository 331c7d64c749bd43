//! Docker runtime implementation.
//!
//! This module provides the [`ContainerRuntime`] trait and the
//! [`DockerRuntime`] that drives a Docker Engine daemon through `bollard`.
//! Containers are addressed by their derived name only; nothing about them
//! is persisted.

use async_trait::async_trait;
use bollard::container::{
    CreateContainerOptions, InspectContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::Docker;
use futures::TryStreamExt;
use tracing::{debug, info};

use stackhouse_core::{naming, ServiceId, StackId};
use stackhouse_store::Service;

use crate::outcome::{Operation, Outcome, Settled};
use crate::spec::build_container_config;
use crate::types::{parse_runtime_time, ContainerHandle, ContainerStatus, LogOptions, RuntimeConfig};
use crate::{Result, RuntimeError};

/// Line returned in place of logs for a container that does not exist.
pub const CONTAINER_NOT_FOUND_LOG: &str = "Container not found";

/// The `ContainerRuntime` trait defines per-service container operations.
///
/// Every operation is idempotent under retry: repeating a call that already
/// took effect succeeds without further change.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create the container for a service.
    ///
    /// If a container with the derived name already exists it is reused as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is too long or the runtime rejects the request.
    async fn create(&self, service: &Service) -> Result<ContainerHandle>;

    /// Start a service's container. Already running is success.
    ///
    /// # Errors
    ///
    /// Returns an error if the container does not exist or cannot be started.
    async fn start(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<()>;

    /// Stop a service's container. Already stopped or absent is success.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime fails to stop the container.
    async fn stop(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<()>;

    /// Force-remove a service's container. Absent is success.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime fails to remove the container.
    async fn remove(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<()>;

    /// Inspect a service's container.
    ///
    /// An absent container yields [`ContainerStatus::not_created`].
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    async fn inspect(&self, stack_id: &StackId, service_id: &ServiceId)
        -> Result<ContainerStatus>;

    /// Fetch the trailing stdout and stderr lines of a service's container.
    ///
    /// An absent container yields [`CONTAINER_NOT_FOUND_LOG`].
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    async fn logs(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
        options: &LogOptions,
    ) -> Result<String>;

    /// Check that the runtime daemon answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable.
    async fn ping(&self) -> Result<()>;
}

/// Docker Engine implementation of [`ContainerRuntime`].
pub struct DockerRuntime {
    docker: Docker,
    config: RuntimeConfig,
}

impl DockerRuntime {
    /// Connect to the daemon at the configured endpoint.
    ///
    /// `unix://` endpoints and bare paths use the local socket, `tcp://` and
    /// `http://` endpoints use plain HTTP. The connection is lazy; use
    /// [`ContainerRuntime::ping`] to probe it.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be parsed into a client.
    pub fn connect(config: RuntimeConfig) -> Result<Self> {
        let endpoint = config.endpoint.as_str();
        let version = bollard::API_DEFAULT_VERSION;

        let docker = if let Some(path) = endpoint.strip_prefix("unix://") {
            Docker::connect_with_unix(path, config.timeout_secs, version)
        } else if endpoint.starts_with('/') {
            Docker::connect_with_unix(endpoint, config.timeout_secs, version)
        } else if let Some(addr) = endpoint.strip_prefix("tcp://") {
            Docker::connect_with_http(&format!("http://{addr}"), config.timeout_secs, version)
        } else {
            Docker::connect_with_http(endpoint, config.timeout_secs, version)
        }
        .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;

        info!(endpoint, "Docker runtime client configured");
        Ok(Self { docker, config })
    }

    /// Get a reference to the runtime config.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

/// Classify a bollard result into an [`Outcome`].
fn classify<T>(result: std::result::Result<T, DockerError>) -> Outcome<T> {
    match result {
        Ok(value) => Outcome::Done(value),
        Err(DockerError::DockerResponseServerError {
            status_code,
            message,
        }) => Outcome::from_status(status_code, message),
        Err(
            e @ (DockerError::IOError { .. }
            | DockerError::RequestTimeoutError
            | DockerError::SocketNotFoundError(_)
            | DockerError::HyperResponseError { .. }),
        ) => Outcome::Failed(RuntimeError::Unavailable(e.to_string())),
        Err(e) => Outcome::Failed(RuntimeError::OperationFailed {
            status: None,
            message: e.to_string(),
        }),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create(&self, service: &Service) -> Result<ContainerHandle> {
        let name = naming::container_name(&service.stack_id, &service.id)?;
        let options = CreateContainerOptions {
            name: name.clone(),
            platform: None,
        };
        let config = build_container_config(service);

        let result = self.docker.create_container(Some(options), config).await;
        match classify(result).settle(Operation::Create)? {
            Settled::Done(response) => {
                info!(container = %name, image = %service.image, "Container created");
                Ok(ContainerHandle {
                    name,
                    id: Some(response.id),
                    reused: false,
                })
            }
            Settled::Absorbed(_) => {
                debug!(container = %name, "Reusing existing container");
                Ok(ContainerHandle {
                    name,
                    id: None,
                    reused: true,
                })
            }
        }
    }

    async fn start(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<()> {
        let name = naming::container_name(stack_id, service_id)?;
        let result = self
            .docker
            .start_container(&name, None::<StartContainerOptions<String>>)
            .await;
        if let Settled::Done(()) = classify(result).settle(Operation::Start)? {
            info!(container = %name, "Container started");
        }
        Ok(())
    }

    async fn stop(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<()> {
        let name = naming::container_name(stack_id, service_id)?;
        let options = StopContainerOptions {
            t: self.config.stop_timeout_secs,
        };
        let result = self.docker.stop_container(&name, Some(options)).await;
        if let Settled::Done(()) = classify(result).settle(Operation::Stop)? {
            info!(container = %name, "Container stopped");
        }
        Ok(())
    }

    async fn remove(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<()> {
        let name = naming::container_name(stack_id, service_id)?;
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        let result = self.docker.remove_container(&name, Some(options)).await;
        if let Settled::Done(()) = classify(result).settle(Operation::Remove)? {
            info!(container = %name, "Container removed");
        }
        Ok(())
    }

    async fn inspect(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
    ) -> Result<ContainerStatus> {
        let name = naming::container_name(stack_id, service_id)?;
        let result = self
            .docker
            .inspect_container(&name, None::<InspectContainerOptions>)
            .await;

        let response = match classify(result).settle(Operation::Inspect)? {
            Settled::Done(response) => response,
            Settled::Absorbed(_) => return Ok(ContainerStatus::not_created()),
        };

        let state = response.state.unwrap_or_default();
        Ok(ContainerStatus {
            status: state
                .status
                .map_or_else(|| "unknown".to_string(), |s| s.to_string()),
            running: state.running.unwrap_or(false),
            started_at: parse_runtime_time(state.started_at.as_deref()),
            finished_at: parse_runtime_time(state.finished_at.as_deref()),
            exit_code: state.exit_code,
        })
    }

    async fn logs(
        &self,
        stack_id: &StackId,
        service_id: &ServiceId,
        options: &LogOptions,
    ) -> Result<String> {
        let name = naming::container_name(stack_id, service_id)?;
        let request = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            timestamps: true,
            tail: options.tail.to_string(),
            ..Default::default()
        };

        let result: std::result::Result<Vec<LogOutput>, DockerError> =
            self.docker.logs(&name, Some(request)).try_collect().await;

        match classify(result).settle(Operation::Logs)? {
            Settled::Done(frames) => Ok(frames.iter().map(ToString::to_string).collect()),
            Settled::Absorbed(_) => Ok(CONTAINER_NOT_FOUND_LOG.to_string()),
        }
    }

    async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))
    }
}
