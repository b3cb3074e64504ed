//! Config Entries Manager
//!
//! Owns all config entries, drives their setup lifecycle and tracks
//! which integration domains are still being set up so that callers can wait
//! for an entry to become ready.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use ha_registries::{Storable, Storage, StorageResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::entry::{ConfigEntry, ConfigEntryState};
use crate::state_machine::InvalidTransition;

/// Storage key for config entries
pub const STORAGE_KEY: &str = "core.config_entries";
/// Current storage version
pub const STORAGE_VERSION: u32 = 1;
/// Current minor version
pub const STORAGE_MINOR_VERSION: u32 = 5;

/// Config entries errors
#[derive(Debug, Error)]
pub enum ConfigEntriesError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Setup failed: {0}")]
    SetupFailed(String),

    #[error(transparent)]
    InvalidState(#[from] InvalidTransition),

    #[error("Storage error: {0}")]
    Storage(#[from] ha_registries::StorageError),
}

pub type ConfigEntriesResult<T> = Result<T, ConfigEntriesError>;

/// Config entries data for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigEntriesData {
    pub entries: Vec<ConfigEntry>,
}

impl Storable for ConfigEntriesData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
    const MINOR_VERSION: u32 = STORAGE_MINOR_VERSION;
}

/// Setup handler function type
pub type SetupHandler = Arc<dyn Fn(&ConfigEntry) -> Result<(), String> + Send + Sync + 'static>;

/// Config Entries Manager
pub struct ConfigEntries {
    storage: Arc<Storage>,

    /// entry_id -> ConfigEntry
    entries: DashMap<String, ConfigEntry>,

    /// domain -> entry_ids
    by_domain: DashMap<String, HashSet<String>>,

    /// Serialises entry setup
    setup_lock: Mutex<()>,

    setup_handlers: DashMap<String, SetupHandler>,

    /// domain -> "setup finished" flag; present once setup of the domain started
    domain_setup: DashMap<String, watch::Sender<bool>>,
}

impl ConfigEntries {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            entries: DashMap::new(),
            by_domain: DashMap::new(),
            setup_lock: Mutex::new(()),
            setup_handlers: DashMap::new(),
            domain_setup: DashMap::new(),
        }
    }

    /// Load entries from storage
    pub async fn load(&self) -> StorageResult<()> {
        if let Some(data) = self.storage.load::<ConfigEntriesData>().await? {
            info!("Loading {} config entries from storage", data.entries.len());
            for entry in data.entries {
                self.index_entry(entry);
            }
        }
        Ok(())
    }

    /// Save entries to storage
    pub async fn save(&self) -> StorageResult<()> {
        let mut entries: Vec<ConfigEntry> =
            self.entries.iter().map(|r| r.value().clone()).collect();
        entries.sort_by_key(|e| e.created_at);

        self.storage.save(&ConfigEntriesData { entries }).await?;
        debug!("Saved {} config entries to storage", self.entries.len());
        Ok(())
    }

    fn index_entry(&self, entry: ConfigEntry) {
        self.by_domain
            .entry(entry.domain.clone())
            .or_default()
            .insert(entry.entry_id.clone());
        self.entries.insert(entry.entry_id.clone(), entry);
    }

    /// Get an entry by ID
    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|r| r.value().clone())
    }

    /// Get all entries for a domain, oldest first
    pub fn get_by_domain(&self, domain: &str) -> Vec<ConfigEntry> {
        let ids: Vec<String> = self
            .by_domain
            .get(domain)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        let mut entries: Vec<ConfigEntry> = ids.iter().filter_map(|id| self.get(id)).collect();
        entries.sort_by_key(|e| e.created_at);
        entries
    }

    /// Add a new config entry
    pub async fn add(&self, entry: ConfigEntry) -> ConfigEntriesResult<ConfigEntry> {
        self.index_entry(entry.clone());
        self.save().await?;

        info!(
            "Added config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry.entry_id
        );
        Ok(entry)
    }

    /// Move an entry to a new lifecycle state
    pub fn set_state(
        &self,
        entry_id: &str,
        state: ConfigEntryState,
        reason: Option<String>,
    ) -> ConfigEntriesResult<()> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
        entry.try_set_state(state, reason)?;
        debug!(entry_id, ?state, "Config entry state changed");
        Ok(())
    }

    /// Register a setup handler for a domain
    pub fn register_setup_handler(&self, domain: &str, handler: SetupHandler) {
        self.setup_handlers.insert(domain.to_string(), handler);
        debug!("Registered setup handler for domain: {}", domain);
    }

    /// Set up a single entry (calls the integration's setup handler)
    pub async fn setup(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if entry.is_disabled() {
            debug!("Skipping setup for disabled entry: {}", entry_id);
            return Ok(());
        }
        if entry.is_loaded() {
            return Ok(());
        }

        self.set_state(entry_id, ConfigEntryState::SetupInProgress, None)?;

        let handler = self
            .setup_handlers
            .get(&entry.domain)
            .map(|r| Arc::clone(r.value()));
        match handler.map(|handler| handler(&entry)).unwrap_or(Ok(())) {
            Ok(()) => {
                self.set_state(entry_id, ConfigEntryState::Loaded, None)?;
                info!("Setup completed for entry: {} ({})", entry.title, entry_id);
                Ok(())
            }
            Err(reason) => {
                warn!("Setup failed for entry {}: {}", entry_id, reason);
                self.set_state(entry_id, ConfigEntryState::SetupError, Some(reason.clone()))?;
                Err(ConfigEntriesError::SetupFailed(reason))
            }
        }
    }

    /// Mark a domain as being set up; `wait_component` blocks until
    /// `finish_domain_setup` is called for it.
    pub fn begin_domain_setup(&self, domain: &str) {
        self.domain_setup
            .entry(domain.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .send_replace(false);
        debug!(domain, "Domain setup started");
    }

    /// Mark a domain's setup as complete and wake waiters
    pub fn finish_domain_setup(&self, domain: &str) {
        if let Some(done) = self.domain_setup.get(domain) {
            done.send_replace(true);
        }
        debug!(domain, "Domain setup finished");
    }

    /// Whether setup of `domain` has started and not yet finished
    pub fn is_domain_setup_pending(&self, domain: &str) -> bool {
        self.domain_setup
            .get(domain)
            .map(|done| !*done.borrow())
            .unwrap_or(false)
    }

    /// Set up every entry of a domain, signalling completion to waiters.
    ///
    /// Completion is signalled even if a setup handler panics or the returned
    /// future is dropped before it finishes.
    pub async fn setup_domain(&self, domain: &str) -> Vec<ConfigEntriesResult<()>> {
        self.begin_domain_setup(domain);
        let _finished = DomainSetupGuard {
            entries: self,
            domain,
        };

        let mut results = Vec::new();
        for entry in self.get_by_domain(domain) {
            results.push(self.setup(&entry.entry_id).await);
        }
        results
    }

    /// Set up all entries, domain by domain
    pub async fn setup_all(&self) -> Vec<ConfigEntriesResult<()>> {
        let mut domains: Vec<String> = self.by_domain.iter().map(|r| r.key().clone()).collect();
        domains.sort();

        let mut results = Vec::new();
        for domain in domains {
            results.extend(self.setup_domain(&domain).await);
        }
        results
    }

    /// Wait for the entry's integration to finish setting up, then report
    /// whether the entry is loaded.
    ///
    /// Entries whose domain is not being set up are answered immediately; an
    /// entry that failed setup (or was never set up) returns `false`.
    pub async fn wait_component(&self, entry: &ConfigEntry) -> bool {
        let pending = self.domain_setup.get(&entry.domain).map(|tx| tx.subscribe());
        if let Some(mut done) = pending {
            if done.wait_for(|finished| *finished).await.is_err() {
                debug!(domain = %entry.domain, "Domain setup tracker dropped while waiting");
            }
        }

        self.get(&entry.entry_id)
            .map(|current| current.is_loaded())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Finishes a domain's setup when dropped
struct DomainSetupGuard<'a> {
    entries: &'a ConfigEntries,
    domain: &'a str,
}

impl Drop for DomainSetupGuard<'_> {
    fn drop(&mut self) {
        self.entries.finish_domain_setup(self.domain);
    }
}
