//! Static trigger schemas
//!
//! Every device trigger must satisfy the base schema: `platform: device`, a
//! string `domain` and a string `device_id`. Integrations extend it with their
//! own JSON Schema fragment (typically an `enum` of supported trigger types).
//! Validation keeps unknown keys and drops `metadata`, which the frontend
//! attaches to listed triggers.

use std::fmt;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde_json::{json, Value};

use crate::config::{TriggerConfig, CONF_METADATA, DEVICE_PLATFORM};
use crate::error::{DeviceAutomationError, DeviceAutomationResult};

/// JSON Schema shared by all device triggers
pub fn device_trigger_base_schema() -> Value {
    json!({
        "type": "object",
        "required": ["platform", "domain", "device_id"],
        "properties": {
            "platform": { "const": DEVICE_PLATFORM },
            "domain": { "type": "string" },
            "device_id": { "type": "string" },
            "metadata": { "type": "object" }
        }
    })
}

/// A compiled trigger schema
#[derive(Clone)]
pub struct TriggerSchema {
    schema: Value,
    compiled: Arc<JSONSchema>,
}

impl TriggerSchema {
    /// Compile `schema` exactly as given
    pub fn new(schema: Value) -> DeviceAutomationResult<Self> {
        let compiled = JSONSchema::compile(&schema)
            .map_err(|err| DeviceAutomationError::Schema(err.to_string()))?;
        Ok(Self {
            schema,
            compiled: Arc::new(compiled),
        })
    }

    /// The base device trigger schema on its own
    pub fn base() -> DeviceAutomationResult<Self> {
        Self::new(device_trigger_base_schema())
    }

    /// The base schema combined with integration-specific rules
    pub fn extend(extra: Value) -> DeviceAutomationResult<Self> {
        Self::new(json!({ "allOf": [device_trigger_base_schema(), extra] }))
    }

    /// Validate `config`, returning the normalised config
    pub fn validate(&self, config: TriggerConfig) -> DeviceAutomationResult<TriggerConfig> {
        let instance = config.into_value();

        let errors: Vec<String> = match self.compiled.validate(&instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{} @ {}", err, path)
                    }
                })
                .collect(),
        };
        if !errors.is_empty() {
            return Err(DeviceAutomationError::invalid(errors.join(", ")));
        }

        let mut config = TriggerConfig::from_value(instance)?;
        config.remove(CONF_METADATA);
        Ok(config)
    }
}

impl fmt::Debug for TriggerSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerSchema")
            .field("schema", &self.schema)
            .finish()
    }
}
