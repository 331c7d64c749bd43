//! Domain types stored in the database.
//!
//! A [`StackDefinition`] is what callers write; a [`Stack`] is what the store
//! returns, with the owning stack id stamped onto every service and the
//! bookkeeping timestamps filled in.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackhouse_core::{naming, ContainerConfig, ServiceId, StackId};

use crate::error::{Result, StoreError};

/// Desired state for a stack as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackDefinition {
    /// Stack identifier.
    pub id: StackId,
    /// Display name.
    pub name: String,
    /// Services in declaration order.
    pub services: Vec<ServiceDefinition>,
}

/// Desired state for one service within a stack definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    /// Service identifier, unique within the stack.
    pub id: ServiceId,
    /// Display name, unique within the stack.
    pub name: String,
    /// Container image reference.
    pub image: String,
    /// Container configuration.
    #[serde(default)]
    pub container_config: ContainerConfig,
}

impl StackDefinition {
    /// Check the integrity rules enforced at write time.
    ///
    /// `stack_id` is the identifier the definition will be stored under,
    /// which for updates may differ from `self.id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidDefinition` for an empty or duplicated
    /// service set and `StoreError::Naming` if a derived container name is
    /// too long.
    pub fn check(&self, stack_id: &StackId) -> Result<()> {
        if self.services.is_empty() {
            return Err(StoreError::InvalidDefinition(
                "a stack must declare at least one service".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for service in &self.services {
            if !ids.insert(&service.id) {
                return Err(StoreError::InvalidDefinition(format!(
                    "duplicate service id '{}'",
                    service.id
                )));
            }
            if !names.insert(service.name.as_str()) {
                return Err(StoreError::InvalidDefinition(format!(
                    "duplicate service name '{}'",
                    service.name
                )));
            }
            naming::container_name(stack_id, &service.id)?;
        }
        Ok(())
    }
}

/// A stack record with its services, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    /// Stack identifier.
    pub id: StackId,
    /// Display name.
    pub name: String,
    /// Services in declaration order.
    pub services: Vec<Service>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Stack {
    /// Look up a service by identifier.
    #[must_use]
    pub fn service(&self, service_id: &ServiceId) -> Option<&Service> {
        self.services.iter().find(|s| &s.id == service_id)
    }

    /// Reconstruct the definition this stack was written from.
    #[must_use]
    pub fn definition(&self) -> StackDefinition {
        StackDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            services: self
                .services
                .iter()
                .map(|s| ServiceDefinition {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    image: s.image.clone(),
                    container_config: s.container_config.clone(),
                })
                .collect(),
        }
    }

    /// Summary view used for listings.
    #[must_use]
    pub fn summary(&self) -> StackSummary {
        StackSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A service record owned by a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Owning stack.
    pub stack_id: StackId,
    /// Service identifier.
    pub id: ServiceId,
    /// Display name.
    pub name: String,
    /// Container image reference.
    pub image: String,
    /// Container configuration.
    pub container_config: ContainerConfig,
}

impl Service {
    /// Stamp a definition with its owning stack.
    #[must_use]
    pub fn from_definition(stack_id: &StackId, def: &ServiceDefinition) -> Self {
        Self {
            stack_id: stack_id.clone(),
            id: def.id.clone(),
            name: def.name.clone(),
            image: def.image.clone(),
            container_config: def.container_config.clone(),
        }
    }
}

/// Listing view of a stack without its services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSummary {
    /// Stack identifier.
    pub id: StackId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Stack row persisted in the `stacks` column family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StackRecord {
    pub id: StackId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str, name: &str) -> ServiceDefinition {
        ServiceDefinition {
            id: ServiceId::parse(id).unwrap(),
            name: name.to_string(),
            image: "nginx:latest".to_string(),
            container_config: ContainerConfig::default(),
        }
    }

    fn definition(services: Vec<ServiceDefinition>) -> StackDefinition {
        StackDefinition {
            id: StackId::parse("shop").unwrap(),
            name: "shop".to_string(),
            services,
        }
    }

    #[test]
    fn check_accepts_valid() {
        let def = definition(vec![service("web", "web"), service("db", "db")]);
        assert!(def.check(&def.id).is_ok());
    }

    #[test]
    fn check_rejects_empty() {
        let def = definition(vec![]);
        assert!(matches!(
            def.check(&def.id),
            Err(StoreError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn check_rejects_duplicates() {
        let dup_id = definition(vec![service("web", "a"), service("web", "b")]);
        assert!(dup_id.check(&dup_id.id).is_err());

        let dup_name = definition(vec![service("web", "same"), service("db", "same")]);
        assert!(dup_name.check(&dup_name.id).is_err());
    }

    #[test]
    fn definition_roundtrips_through_stack() {
        let def = definition(vec![service("web", "web")]);
        let now = Utc::now();
        let stack = Stack {
            id: def.id.clone(),
            name: def.name.clone(),
            services: def
                .services
                .iter()
                .map(|s| Service::from_definition(&def.id, s))
                .collect(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(stack.definition(), def);
    }
}
