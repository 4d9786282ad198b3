//! JSON file settings store
//!
//! Loads and saves configuration at %APPDATA%\HandsOff\config.json with atomic
//! writes to prevent corruption.

use crate::config::models::AppConfig;
use crate::config::store::SettingsStore;
use crate::error::{HandsOffError, Result, StringError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration manager backed by a JSON file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Manager for the default location, %APPDATA%\HandsOff\config.json
    pub fn new() -> Self {
        Self::with_path(Self::get_config_path())
    }

    /// Manager for an explicit file location
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the default configuration file
    ///
    /// Returns: %APPDATA%\HandsOff\config.json
    pub fn get_config_path() -> PathBuf {
        Self::get_app_dir().join("config.json")
    }

    /// Get the application data directory, %APPDATA%\HandsOff
    pub fn get_app_dir() -> PathBuf {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("HandsOff")
    }

    /// Path this manager reads and writes
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn config_dir(&self) -> Result<&Path> {
        self.path
            .parent()
            .ok_or_else(|| HandsOffError::ConfigError(StringError::new("Invalid config path")))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for ConfigManager {
    /// Load configuration from disk
    ///
    /// If the file doesn't exist or is corrupt, returns default configuration.
    fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            info!("Configuration file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let json = std::fs::read_to_string(&self.path)?;

        match serde_json::from_str(&json) {
            Ok(config) => {
                info!("Configuration loaded from {}", self.path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to parse configuration, using defaults: {}", e);
                Ok(AppConfig::default())
            }
        }
    }

    /// Save configuration to disk with atomic write (temp file, then rename)
    fn save(&self, config: &AppConfig) -> Result<()> {
        let config_dir = self.config_dir()?;
        std::fs::create_dir_all(config_dir)?;

        let temp_path = config_dir.join("config.json.tmp");
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&temp_path, json)?;
        std::fs::rename(temp_path, &self.path)?;

        info!("Configuration saved successfully");
        Ok(())
    }
}
