//! Device Automation
//!
//! Device triggers let automations fire on something a device reports, such
//! as a remote button press. The trigger config names the integration
//! (`domain`) and the device (`device_id`); this crate finds that
//! integration's trigger platform and forwards validation and attachment to
//! it.
//!
//! # Key Types
//!
//! - [`TriggerConfig`] - Raw device trigger configuration
//! - [`DeviceTriggerPlatform`] - Implemented by integrations offering device triggers
//! - [`PlatformRegistry`] - Resolves a domain to its trigger platform
//! - [`DeviceAutomationContext`] - Registries passed into every operation
//!
//! # Operations
//!
//! - [`validate_trigger_config`] - Validate a config at automation load time
//! - [`attach_trigger`] - Start listening, returning a [`DetachHandle`]
//! - [`get_trigger_capabilities`] - Extra fields a trigger accepts
//! - [`get_device_triggers`] - Triggers available for a device

pub mod config;
pub mod context;
pub mod error;
pub mod platform;
pub mod schema;
pub mod trigger;

pub use config::{
    TriggerConfig, CONF_DEVICE_ID, CONF_DOMAIN, CONF_METADATA, CONF_PLATFORM, CONF_TYPE,
    DEVICE_PLATFORM,
};
pub use context::DeviceAutomationContext;
pub use error::{
    DeviceAutomationError, DeviceAutomationResult, InvalidDeviceAutomationConfig,
    DEFAULT_INVALID_TRIGGER_MESSAGE,
};
pub use platform::{
    trigger_action, DetachHandle, DeviceTriggerPlatform, PlatformRegistry, TriggerAction,
    TriggerActionFuture, TriggerCapabilities, TriggerConfigValidator, TriggerData, TriggerInfo,
};
pub use schema::{device_trigger_base_schema, TriggerSchema};
pub use trigger::{
    attach_trigger, get_device_triggers, get_trigger_capabilities, validate_trigger_config,
};
