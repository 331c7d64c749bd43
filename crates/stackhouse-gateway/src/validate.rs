//! Request body validation.
//!
//! Stack bodies arrive as loosely typed JSON and are checked field by field
//! before being turned into a [`StackDefinition`], so every rejection
//! carries a precise error code.
//!
//! ```text
//! body ──► stack id/name ──► services[] ──► id/name, image, containerConfig
//!                                             │
//!                                             ▼
//!                                     StackDefinition
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use stackhouse_core::ids::check_identifier;
use stackhouse_core::{naming, ContainerConfig, PortMapping, ServiceId, StackId, VolumeBinding};
use stackhouse_store::{ServiceDefinition, StackDefinition};
use thiserror::Error;

/// Image references: `name(/name)*(:tag)?`.
static IMAGE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9]+([._-][a-z0-9]+)*(/[a-z0-9]+([._-][a-z0-9]+)*)*(:[a-z0-9_][a-z0-9_.-]{0,127})?$",
    )
    .expect("Invalid image reference regex")
});

/// A rejected request body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Stack ID or name is missing or malformed.
    #[error("{0}")]
    InvalidStackName(String),

    /// Service ID or name is missing or malformed.
    #[error("{0}")]
    InvalidServiceName(String),

    /// `<stack>-<service>` exceeds the container name limit.
    #[error("{0}")]
    ContainerNameTooLong(String),

    /// Image reference is missing or malformed.
    #[error("{0}")]
    InvalidDockerImage(String),

    /// Stack body is not an object or has no services.
    #[error("{0}")]
    InvalidStackData(String),

    /// A service entry is not an object.
    #[error("{0}")]
    InvalidServiceData(String),

    /// Two services share an ID.
    #[error("{0}")]
    DuplicateServiceId(String),

    /// Two services share a name.
    #[error("{0}")]
    DuplicateServiceName(String),

    /// Ports, environment or volumes are malformed.
    #[error("{0}")]
    InvalidContainerConfig(String),
}

impl ValidationError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidStackName(_) => "invalid_stack_name",
            Self::InvalidServiceName(_) => "invalid_service_name",
            Self::ContainerNameTooLong(_) => "container_name_too_long",
            Self::InvalidDockerImage(_) => "invalid_docker_image",
            Self::InvalidStackData(_) => "invalid_stack_data",
            Self::InvalidServiceData(_) => "invalid_service_data",
            Self::DuplicateServiceId(_) => "duplicate_service_id",
            Self::DuplicateServiceName(_) => "duplicate_service_name",
            Self::InvalidContainerConfig(_) => "invalid_container_config",
        }
    }
}

type Result<T> = std::result::Result<T, ValidationError>;

/// Validate a stack body and build the definition it describes.
///
/// When `stack_id` is given (updates), it replaces whatever ID the body
/// carries.
///
/// # Errors
///
/// Returns the first `ValidationError` encountered.
pub fn stack_definition(body: &Value, stack_id: Option<&StackId>) -> Result<StackDefinition> {
    let obj = body
        .as_object()
        .ok_or_else(|| ValidationError::InvalidStackData("Stack data must be an object".into()))?;

    let id = match stack_id {
        Some(id) => id.clone(),
        None => {
            let raw = stack_identifier(obj.get("id"), "Stack ID")?;
            StackId::parse(raw).map_err(|e| ValidationError::InvalidStackName(e.to_string()))?
        }
    };
    let name = stack_identifier(obj.get("name"), "Stack name")?.to_string();

    let services = match obj.get("services") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => {
            return Err(ValidationError::InvalidStackData(
                "Stack must contain at least one service".into(),
            ))
        }
    };

    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    let mut definitions = Vec::with_capacity(services.len());

    for item in services {
        let service = service_definition(item, &id)?;
        if !ids.insert(service.id.clone()) {
            return Err(ValidationError::DuplicateServiceId(format!(
                "Duplicate service ID: '{}'",
                service.id
            )));
        }
        if !names.insert(service.name.clone()) {
            return Err(ValidationError::DuplicateServiceName(format!(
                "Duplicate service name: '{}'",
                service.name
            )));
        }
        definitions.push(service);
    }

    Ok(StackDefinition {
        id,
        name,
        services: definitions,
    })
}

fn service_definition(value: &Value, stack_id: &StackId) -> Result<ServiceDefinition> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::InvalidServiceData("Each service must be an object".into()))?;

    let raw_id = service_identifier(obj.get("id"), "Service ID", stack_id)?;
    let id = ServiceId::parse(raw_id).map_err(|e| ValidationError::InvalidServiceName(e.to_string()))?;
    let name = service_identifier(obj.get("name"), "Service name", stack_id)?.to_string();
    let image = image(obj.get("image"))?.to_string();

    let container_config = match obj.get("containerConfig") {
        None | Some(Value::Null) => ContainerConfig::default(),
        Some(Value::Object(config)) => container_config(config)?,
        Some(_) => {
            return Err(ValidationError::InvalidContainerConfig(
                "containerConfig must be an object".into(),
            ))
        }
    };

    Ok(ServiceDefinition {
        id,
        name,
        image,
        container_config,
    })
}

fn stack_identifier<'a>(value: Option<&'a Value>, what: &str) -> Result<&'a str> {
    let s = value
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::InvalidStackName(format!("{what} is required and must be a string")))?;
    check_identifier(s).map_err(|e| ValidationError::InvalidStackName(format!("{what}: {e}")))?;
    Ok(s)
}

fn service_identifier<'a>(value: Option<&'a Value>, what: &str, stack_id: &StackId) -> Result<&'a str> {
    let s = value.and_then(Value::as_str).ok_or_else(|| {
        ValidationError::InvalidServiceName(format!("{what} is required and must be a string"))
    })?;
    check_identifier(s).map_err(|e| ValidationError::InvalidServiceName(format!("{what}: {e}")))?;
    naming::check_fits(stack_id.as_str(), s)
        .map_err(|e| ValidationError::ContainerNameTooLong(e.to_string()))?;
    Ok(s)
}

/// Check an image reference against the accepted format.
///
/// # Errors
///
/// Returns `ValidationError::InvalidDockerImage` when the value is missing,
/// not a string, or malformed.
pub fn image(value: Option<&Value>) -> Result<&str> {
    let s = value.and_then(Value::as_str).ok_or_else(|| {
        ValidationError::InvalidDockerImage("Docker image is required and must be a string".into())
    })?;
    if !IMAGE_REFERENCE.is_match(s) {
        return Err(ValidationError::InvalidDockerImage(format!(
            "Invalid Docker image format: '{s}'"
        )));
    }
    Ok(s)
}

fn container_config(obj: &Map<String, Value>) -> Result<ContainerConfig> {
    let mut config = ContainerConfig::default();

    match obj.get("ports") {
        None | Some(Value::Null) => {}
        Some(Value::Array(ports)) => {
            for port in ports {
                config.ports.push(port_mapping(port)?);
            }
        }
        Some(_) => return Err(invalid_config("Ports configuration must be an array")),
    }

    match obj.get("environment") {
        None | Some(Value::Null) => {}
        Some(Value::Object(vars)) => config.environment = environment(vars)?,
        Some(_) => return Err(invalid_config("Environment configuration must be an object")),
    }

    match obj.get("volumes") {
        None | Some(Value::Null) => {}
        Some(Value::Array(volumes)) => {
            for volume in volumes {
                config.volumes.push(volume_binding(volume)?);
            }
        }
        Some(_) => return Err(invalid_config("Volumes configuration must be an array")),
    }

    Ok(config)
}

fn port_mapping(value: &Value) -> Result<PortMapping> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid_config("Each port configuration must be an object"))?;

    let container_port = obj
        .get("containerPort")
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid_config("containerPort is required and must be a number"))?;
    let container_port = port_number(container_port)
        .ok_or_else(|| invalid_config("containerPort must be between 1 and 65535"))?;

    let host_port = match obj.get("hostPort") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let port = v
                .as_u64()
                .and_then(port_number)
                .ok_or_else(|| invalid_config("hostPort must be a number between 1 and 65535"))?;
            Some(port)
        }
    };

    Ok(PortMapping {
        container_port,
        host_port,
    })
}

fn port_number(n: u64) -> Option<u16> {
    u16::try_from(n).ok().filter(|p| *p != 0)
}

fn environment(vars: &Map<String, Value>) -> Result<BTreeMap<String, String>> {
    vars.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(invalid_config(&format!(
                        "Environment variable '{key}' must be a string, number or boolean"
                    )))
                }
            };
            Ok((key.clone(), value))
        })
        .collect()
}

fn volume_binding(value: &Value) -> Result<VolumeBinding> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid_config("Each volume configuration must be an object"))?;

    let field = |name: &str| {
        obj.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .ok_or_else(|| invalid_config(&format!("{name} is required and must be a string")))
    };

    Ok(VolumeBinding {
        host_path: field("hostPath")?,
        container_path: field("containerPath")?,
    })
}

fn invalid_config(message: &str) -> ValidationError {
    ValidationError::InvalidContainerConfig(message.to_string())
}
