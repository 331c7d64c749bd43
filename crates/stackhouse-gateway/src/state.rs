//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use stackhouse_control::ControlPlane;

use crate::auth::ApiKeys;
use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers.
pub struct GatewayState<C>
where
    C: ControlPlane,
{
    /// The control plane for stack operations.
    pub control: Arc<C>,
    /// Accepted API keys.
    pub api_keys: Arc<ApiKeys>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<C> GatewayState<C>
where
    C: ControlPlane,
{
    /// Create a new gateway state.
    ///
    /// The accepted API keys are taken from `config.api.keys`.
    #[must_use]
    pub fn new(control: Arc<C>, config: GatewayConfig) -> Self {
        let api_keys = Arc::new(ApiKeys::new(&config.api.keys));
        Self {
            control,
            api_keys,
            config,
        }
    }
}

impl<C> Clone for GatewayState<C>
where
    C: ControlPlane,
{
    fn clone(&self) -> Self {
        Self {
            control: Arc::clone(&self.control),
            api_keys: Arc::clone(&self.api_keys),
            config: self.config.clone(),
        }
    }
}
