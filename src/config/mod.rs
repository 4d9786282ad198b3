//! Configuration management module
//!
//! Persists the controlled device and user preferences. Storage sits behind the
//! [`SettingsStore`] trait so the device logic can be tested without touching
//! %APPDATA%. The production store writes %APPDATA%\HandsOff\config.json with
//! atomic writes to prevent corruption.

pub mod manager;
pub mod models;
pub mod store;

pub use manager::ConfigManager;
pub use models::{AppConfig, UserPreferences};
pub use store::{MemoryStore, Settings, SettingsStore};
