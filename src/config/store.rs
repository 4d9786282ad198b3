//! Settings persistence seam
//!
//! The controller never reads global settings. It receives a [`Settings`] built
//! over any [`SettingsStore`]: the JSON file in production, [`MemoryStore`] in tests.

use crate::config::models::{AppConfig, UserPreferences};
use crate::error::{HandsOffError, Result, StringError};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Durable key/value storage for [`AppConfig`]
pub trait SettingsStore {
    /// Read the stored configuration, returning defaults when nothing is stored yet
    fn load(&self) -> Result<AppConfig>;

    /// Persist the configuration
    fn save(&self, config: &AppConfig) -> Result<()>;
}

/// In-memory store, survives only as long as the value itself
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: Mutex<AppConfig>,
    save_count: Mutex<usize>,
    fail_saves: Mutex<bool>,
}

impl MemoryStore {
    /// Store pre-populated with a configuration
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config: Mutex::new(config),
            ..Self::default()
        }
    }

    /// Snapshot of what is currently stored
    pub fn stored(&self) -> AppConfig {
        self.config.lock().clone()
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        *self.save_count.lock()
    }

    /// Make subsequent saves fail, to exercise the "keep going in memory" path
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<AppConfig> {
        Ok(self.config.lock().clone())
    }

    fn save(&self, config: &AppConfig) -> Result<()> {
        if *self.fail_saves.lock() {
            return Err(HandsOffError::ConfigError(StringError::new(
                "memory store is read-only",
            )));
        }
        *self.config.lock() = config.clone();
        *self.save_count.lock() += 1;
        Ok(())
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for &S {
    fn load(&self) -> Result<AppConfig> {
        (**self).load()
    }

    fn save(&self, config: &AppConfig) -> Result<()> {
        (**self).save(config)
    }
}

/// Loaded configuration plus the store it came from
///
/// Reads are served from memory. Writes go through to the store immediately;
/// a failed write is logged and the in-memory value is kept.
#[derive(Debug)]
pub struct Settings<S: SettingsStore> {
    store: S,
    config: AppConfig,
}

impl<S: SettingsStore> Settings<S> {
    /// Load settings from the store, falling back to defaults if it can't be read
    pub fn load(store: S) -> Self {
        let config = store.load().unwrap_or_else(|e| {
            warn!("Failed to load settings, using defaults: {}", e);
            AppConfig::default()
        });
        Self { store, config }
    }

    /// Instance id of the controlled device, empty when none is selected
    pub fn controlled_device_id(&self) -> &str {
        &self.config.controlled_device_id
    }

    /// Replace the controlled device id and persist it
    pub fn set_controlled_device_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.config.controlled_device_id == id {
            return;
        }
        debug!("Controlled device id: {:?} -> {:?}", self.config.controlled_device_id, id);
        self.config.controlled_device_id = id;
        self.persist();
    }

    /// User preferences
    pub fn preferences(&self) -> &UserPreferences {
        &self.config.preferences
    }

    /// Replace preferences and persist them
    pub fn set_preferences(&mut self, preferences: UserPreferences) {
        self.config.preferences = preferences;
        self.persist();
    }

    /// Full configuration as currently held in memory
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write the in-memory configuration to the store
    pub fn save(&self) -> Result<()> {
        self.store.save(&self.config)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(
                "Failed to save settings: {}. Continuing with in-memory settings. \
                 Changes will be lost on application restart.",
                e
            );
        }
    }
}
