//! Device Registry
//!
//! Tracks devices and the config entries that provide them. A device keeps
//! its config entry ids in the order they were attached; consumers such as
//! device automations rely on that order when they look for the entry
//! belonging to a given integration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::storage::{Storable, Storage, StorageResult};

/// Storage key for device registry
pub const STORAGE_KEY: &str = "core.device_registry";
/// Current storage version
pub const STORAGE_VERSION: u32 = 1;
/// Current minor version
pub const STORAGE_MINOR_VERSION: u32 = 12;

/// A registered device entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Internal UUID
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Associated config entries, in attachment order
    #[serde(default)]
    pub config_entries: Vec<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl DeviceEntry {
    /// Create a new device entry without config entries
    pub fn new(name: Option<&str>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.map(str::to_string),
            config_entries: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach a config entry; attaching the same entry twice keeps the
    /// original position
    pub fn with_config_entry(mut self, config_entry_id: impl Into<String>) -> Self {
        let config_entry_id = config_entry_id.into();
        if !self.config_entries.contains(&config_entry_id) {
            self.config_entries.push(config_entry_id);
        }
        self
    }
}

/// Device registry data for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRegistryData {
    pub devices: Vec<DeviceEntry>,
}

impl Storable for DeviceRegistryData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
    const MINOR_VERSION: u32 = STORAGE_MINOR_VERSION;
}

/// Device Registry
///
/// Entries are handed out as `Arc<DeviceEntry>`; replacing a device swaps
/// the `Arc`, so readers keep a consistent snapshot.
pub struct DeviceRegistry {
    storage: Arc<Storage>,

    /// device_id -> DeviceEntry
    devices: DashMap<String, Arc<DeviceEntry>>,
}

impl DeviceRegistry {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            devices: DashMap::new(),
        }
    }

    /// Load from storage
    pub async fn load(&self) -> StorageResult<()> {
        if let Some(data) = self.storage.load::<DeviceRegistryData>().await? {
            info!("Loading {} devices from storage", data.devices.len());
            for entry in data.devices {
                self.devices.insert(entry.id.clone(), Arc::new(entry));
            }
        }
        Ok(())
    }

    /// Save to storage
    pub async fn save(&self) -> StorageResult<()> {
        let mut devices: Vec<DeviceEntry> =
            self.devices.iter().map(|r| (**r.value()).clone()).collect();
        devices.sort_by_key(|d| d.created_at);

        self.storage.save(&DeviceRegistryData { devices }).await?;
        debug!("Saved {} devices to storage", self.devices.len());
        Ok(())
    }

    /// Get device by ID
    pub fn get(&self, device_id: &str) -> Option<Arc<DeviceEntry>> {
        self.devices.get(device_id).map(|r| Arc::clone(r.value()))
    }

    /// Insert a device, replacing any device with the same id
    pub fn insert(&self, entry: DeviceEntry) -> Arc<DeviceEntry> {
        let entry = Arc::new(entry);
        if self
            .devices
            .insert(entry.id.clone(), Arc::clone(&entry))
            .is_none()
        {
            info!("Registered new device: {:?} ({})", entry.name, entry.id);
        }
        entry
    }

    /// Remove a device
    pub fn remove(&self, device_id: &str) -> Option<Arc<DeviceEntry>> {
        let (_, entry) = self.devices.remove(device_id)?;
        info!("Removed device: {}", device_id);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
