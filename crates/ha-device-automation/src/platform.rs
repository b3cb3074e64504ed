//! Device trigger platforms
//!
//! An integration that offers device triggers implements
//! [`DeviceTriggerPlatform`] and registers it in the [`PlatformRegistry`]
//! under its domain. Every platform has a static schema; platforms whose
//! validity depends on live device state additionally expose a
//! [`TriggerConfigValidator`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::TriggerConfig;
use crate::context::DeviceAutomationContext;
use crate::error::{DeviceAutomationError, DeviceAutomationResult, InvalidDeviceAutomationConfig};
use crate::schema::TriggerSchema;

/// Identifies the trigger within its automation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerData {
    /// User-assigned trigger id, or the index when none was given
    pub id: String,
    /// Position of the trigger in the automation's trigger list
    pub idx: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Information about the automation a trigger is attached for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerInfo {
    /// Domain of the component attaching the trigger (e.g. "automation")
    pub domain: String,
    /// Name of the automation
    pub name: String,
    /// Whether the trigger is attached while Home Assistant is starting
    #[serde(default)]
    pub home_assistant_start: bool,
    #[serde(default)]
    pub variables: Map<String, Value>,
    pub trigger_data: TriggerData,
}

/// Future returned by a trigger action
pub type TriggerActionFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callback run when a trigger fires, with the run variables
pub type TriggerAction = Arc<dyn Fn(Value) -> TriggerActionFuture + Send + Sync>;

/// Wrap an async closure as a [`TriggerAction`]
pub fn trigger_action<F, Fut>(action: F) -> TriggerAction
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |variables| Box::pin(action(variables)) as TriggerActionFuture)
}

/// Undoes a trigger attachment when consumed
pub struct DetachHandle(Box<dyn FnOnce() + Send + Sync>);

impl DetachHandle {
    pub fn new<F>(detach: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self(Box::new(detach))
    }

    /// Stop listening
    pub fn detach(self) {
        (self.0)()
    }
}

impl fmt::Debug for DetachHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DetachHandle")
    }
}

/// Extra options a trigger type accepts, as a JSON Schema fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_fields: Option<Value>,
}

/// Validation that needs the integration to be loaded
#[async_trait]
pub trait TriggerConfigValidator: Send + Sync {
    async fn validate_trigger_config(
        &self,
        ctx: &DeviceAutomationContext,
        config: TriggerConfig,
    ) -> DeviceAutomationResult<TriggerConfig>;
}

/// An integration's device trigger implementation
#[async_trait]
pub trait DeviceTriggerPlatform: Send + Sync {
    /// Schema applied when the platform has no dynamic validator
    fn trigger_schema(&self) -> &TriggerSchema;

    /// Dynamic validator, if validity depends on the loaded integration
    fn config_validator(&self) -> Option<&dyn TriggerConfigValidator> {
        None
    }

    /// Start listening; `action` runs whenever the trigger fires
    async fn attach_trigger(
        &self,
        ctx: &DeviceAutomationContext,
        config: TriggerConfig,
        action: TriggerAction,
        trigger_info: TriggerInfo,
    ) -> DeviceAutomationResult<DetachHandle>;

    async fn get_trigger_capabilities(
        &self,
        _ctx: &DeviceAutomationContext,
        _config: &TriggerConfig,
    ) -> DeviceAutomationResult<TriggerCapabilities> {
        Ok(TriggerCapabilities::default())
    }

    /// Triggers the device supports, as ready-to-use configs
    async fn get_triggers(
        &self,
        _ctx: &DeviceAutomationContext,
        _device_id: &str,
    ) -> DeviceAutomationResult<Vec<TriggerConfig>> {
        Ok(Vec::new())
    }
}

/// Registry of integrations and their device trigger platforms
#[derive(Default)]
pub struct PlatformRegistry {
    /// domain -> trigger platform (None: integration without device triggers)
    integrations: DashMap<String, Option<Arc<dyn DeviceTriggerPlatform>>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an integration that has no device trigger platform
    pub fn register_integration(&self, domain: impl Into<String>) {
        let domain = domain.into();
        debug!(domain = %domain, "Registering integration");
        self.integrations.entry(domain).or_insert(None);
    }

    /// Register (or replace) the device trigger platform of an integration
    pub fn register_trigger_platform(
        &self,
        domain: impl Into<String>,
        platform: Arc<dyn DeviceTriggerPlatform>,
    ) {
        let domain = domain.into();
        debug!(domain = %domain, "Registering device trigger platform");
        self.integrations.insert(domain, Some(platform));
    }

    /// Resolve the device trigger platform for `domain`
    pub fn get_trigger_platform(
        &self,
        domain: &str,
    ) -> DeviceAutomationResult<Arc<dyn DeviceTriggerPlatform>> {
        let platform = self
            .integrations
            .get(domain)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                InvalidDeviceAutomationConfig::new(format!("Integration '{}' not found", domain))
            })?;

        platform.ok_or_else(|| {
            DeviceAutomationError::from(InvalidDeviceAutomationConfig::new(format!(
                "Integration '{}' does not support device automation triggers",
                domain
            )))
        })
    }
}
