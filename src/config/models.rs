//! Configuration data models

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lower bound for the device backend timeout
pub const MIN_QUERY_TIMEOUT_MS: u64 = 500;
/// Upper bound for the device backend timeout
pub const MAX_QUERY_TIMEOUT_MS: u64 = 60_000;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Instance id of the controlled device, empty when none is selected
    pub controlled_device_id: String,
    /// User preferences
    pub preferences: UserPreferences,
}

/// User preferences and settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Whether to show tray notifications (tutorial, missing device, failures)
    pub show_notifications: bool,
    /// How long a single device query or state change may take, in milliseconds
    pub query_timeout_ms: u64,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            show_notifications: true,
            query_timeout_ms: 5000,
        }
    }
}

impl UserPreferences {
    /// Backend timeout, clamped to a sane range so a hand-edited file can't disable it
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(
            self.query_timeout_ms
                .clamp(MIN_QUERY_TIMEOUT_MS, MAX_QUERY_TIMEOUT_MS),
        )
    }
}
