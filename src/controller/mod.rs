//! Tray-facing controller
//!
//! The tray never calls the device layer directly. It drives a
//! [`DeviceController`], which owns the backend and the controlled device
//! selection, and gets back plain data to render: a [`DeviceMenu`], an
//! [`IconState`] and the [`Notice`]s worth showing.
//!
//! # Event Flow
//!
//! ```text
//! right-click → refresh_devices → DeviceMenu → device submenu
//! menu pick   → pick_device     → Vec<Notice> → toasts
//! left click  → primary_click   → ClickReport → icon + toasts
//! ```
//!
//! # Failure streak
//!
//! Consecutive failed toggles are counted. From [`FAILURE_WARNING_THRESHOLD`]
//! onward the icon shows [`IconState::Warning`] until a toggle succeeds or
//! the user picks a device.

pub mod device_controller;
pub mod notice;

pub use device_controller::{
    ClickOutcome, ClickReport, DeviceController, DeviceMenu, DeviceMenuItem,
    FAILURE_WARNING_THRESHOLD, IconState,
};
pub use notice::Notice;
