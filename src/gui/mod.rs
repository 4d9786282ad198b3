//! Notification-area presentation
//!
//! Binary-only: the tray icon, its menu, toasts and the About dialog. All
//! decisions are made by `DeviceController`; this layer only renders them.

#[cfg_attr(not(windows), allow(dead_code))]
pub mod icons;

#[cfg(windows)]
pub mod tray;

#[cfg(windows)]
pub use tray::TrayApp;
