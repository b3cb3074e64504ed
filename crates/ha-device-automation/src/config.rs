//! Device trigger configuration
//!
//! A trigger config is the raw mapping an automation declares under
//! `triggers:`. Only `domain` and `device_id` are interpreted here; every
//! other key belongs to the integration and is carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DeviceAutomationError, DeviceAutomationResult, InvalidDeviceAutomationConfig};

pub const CONF_PLATFORM: &str = "platform";
pub const CONF_DOMAIN: &str = "domain";
pub const CONF_DEVICE_ID: &str = "device_id";
pub const CONF_TYPE: &str = "type";
pub const CONF_METADATA: &str = "metadata";

/// Value of `platform` for device triggers
pub const DEVICE_PLATFORM: &str = "device";

/// A device trigger configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerConfig(Map<String, Value>);

impl TriggerConfig {
    /// Start a device trigger config for `domain` and `device_id`
    pub fn device(domain: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self::default()
            .with(CONF_PLATFORM, DEVICE_PLATFORM)
            .with(CONF_DOMAIN, Value::String(domain.into()))
            .with(CONF_DEVICE_ID, Value::String(device_id.into()))
    }

    /// Build from a JSON value, which must be an object
    pub fn from_value(value: Value) -> DeviceAutomationResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DeviceAutomationError::invalid(format!(
                "expected a dictionary, got {}",
                other
            ))),
        }
    }

    /// Parse a single trigger from automation YAML
    pub fn from_yaml(source: &str) -> DeviceAutomationResult<Self> {
        let value: Value = serde_yaml::from_str(source)?;
        Self::from_value(value)
    }

    /// Set a key, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Integration domain the trigger belongs to.
    ///
    /// A domain that is not a string names no integration.
    pub fn domain(&self) -> DeviceAutomationResult<&str> {
        match self.required(CONF_DOMAIN)? {
            Value::String(domain) => Ok(domain.as_str()),
            other => Err(InvalidDeviceAutomationConfig::new(format!(
                "Integration '{}' not found",
                other
            ))
            .into()),
        }
    }

    /// Registered device the trigger watches.
    ///
    /// A device id that is not a string matches no device.
    pub fn device_id(&self) -> DeviceAutomationResult<&str> {
        match self.required(CONF_DEVICE_ID)? {
            Value::String(device_id) => Ok(device_id.as_str()),
            _ => Err(InvalidDeviceAutomationConfig::default().into()),
        }
    }

    fn required(&self, key: &'static str) -> DeviceAutomationResult<&Value> {
        self.0
            .get(key)
            .ok_or(DeviceAutomationError::MissingKey { key })
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for TriggerConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
