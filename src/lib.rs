//! `HandsOff` - touchscreen on/off switch for the Windows notification area
//!
//! One click on the tray icon disables the controlled touchscreen, another
//! click enables it again. The right-click menu lists every Human Interface
//! Device so the controlled device can be chosen by hand when autodetection
//! picks the wrong one (or none).
//!
//! The crate is split so everything except the OS seam runs anywhere:
//! [`device`] talks to the device tree only through `DeviceBackend`,
//! [`config`] persists through `SettingsStore`, and [`controller`] ties them
//! together for the tray.
//!
//! # Requirements
//!
//! - Windows 10 or Windows 11
//! - Administrator rights to change device state

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{HandsOffError, Result};
