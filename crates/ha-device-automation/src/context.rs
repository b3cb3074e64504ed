//! Shared collaborators for device automation operations

use std::sync::Arc;

use ha_config_entries::ConfigEntries;
use ha_registries::DeviceRegistry;

use crate::platform::PlatformRegistry;

/// Registries a device automation operation reads from.
///
/// Passed explicitly into every operation and into platform callbacks.
#[derive(Clone)]
pub struct DeviceAutomationContext {
    pub devices: Arc<DeviceRegistry>,
    pub config_entries: Arc<ConfigEntries>,
    pub platforms: Arc<PlatformRegistry>,
}

impl DeviceAutomationContext {
    pub fn new(
        devices: Arc<DeviceRegistry>,
        config_entries: Arc<ConfigEntries>,
        platforms: Arc<PlatformRegistry>,
    ) -> Self {
        Self {
            devices,
            config_entries,
            platforms,
        }
    }
}
