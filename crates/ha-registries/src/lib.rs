//! Home Assistant Registries
//!
//! Persistent registries shared by integrations and automations. Currently
//! this is the device registry, persisted as versioned JSON in the
//! `.storage/` directory.

pub mod device_registry;
pub mod storage;

pub use device_registry::{DeviceEntry, DeviceRegistry, DeviceRegistryData};
pub use storage::{Storable, Storage, StorageError, StorageFile, StorageResult};
