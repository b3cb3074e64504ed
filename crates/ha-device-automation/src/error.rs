//! Error types for device automations

use thiserror::Error;

/// Message used when an invalid device trigger carries no explanation
pub const DEFAULT_INVALID_TRIGGER_MESSAGE: &str = "Invalid trigger configuration";

/// A device automation config refers to a device, config entry or
/// integration that cannot serve it.
///
/// Raised while resolving platforms, while looking up the device and its
/// config entries, and by platforms' own validators. Trigger validation turns
/// it into [`DeviceAutomationError::Invalid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", .message.as_deref().unwrap_or("invalid device automation config"))]
pub struct InvalidDeviceAutomationConfig {
    pub message: Option<String>,
}

impl InvalidDeviceAutomationConfig {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Device automation errors
#[derive(Debug, Error)]
pub enum DeviceAutomationError {
    #[error(transparent)]
    InvalidConfig(#[from] InvalidDeviceAutomationConfig),

    /// A trigger config failed validation
    #[error("{message}")]
    Invalid { message: String },

    #[error("required key not provided: {key}")]
    MissingKey { key: &'static str },

    #[error("invalid trigger schema: {0}")]
    Schema(String),

    #[error("invalid trigger YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Failure inside an integration's platform code
    #[error(transparent)]
    Platform(#[from] anyhow::Error),
}

impl DeviceAutomationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Map the internal invalid-config condition onto the validation error
    /// exposed to config loading. Other errors are returned as they are.
    pub fn into_validation_error(self) -> Self {
        match self {
            Self::InvalidConfig(err) => Self::Invalid {
                message: err
                    .message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| DEFAULT_INVALID_TRIGGER_MESSAGE.to_string()),
            },
            other => other,
        }
    }
}

/// Result type for device automation operations
pub type DeviceAutomationResult<T> = Result<T, DeviceAutomationError>;
