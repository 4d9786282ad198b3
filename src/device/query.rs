//! HID enumeration
//!
//! Fails soft: a broken query yields an empty list alongside the error so the
//! tray can keep running and say why the menu is empty.

use crate::device::{Device, DeviceBackend, DeviceList, HID_CLASS_GUID};
use crate::error::HandsOffError;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Result of one enumeration request
#[derive(Debug, Default)]
pub struct EnumerationSnapshot {
    /// Devices in the order the OS returned them
    pub devices: DeviceList,
    /// Set when the query failed; `devices` is then empty
    pub error: Option<HandsOffError>,
}

impl EnumerationSnapshot {
    /// Whether the query completed
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Lists Human Interface Devices from the OS device tree
pub struct DeviceQuery<B: DeviceBackend> {
    backend: B,
}

impl<B: DeviceBackend> DeviceQuery<B> {
    /// Query over a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Fresh snapshot of all HID-class devices
    pub fn list_devices(&self) -> EnumerationSnapshot {
        match self.backend.enumerate(HID_CLASS_GUID) {
            Ok(records) => {
                let mut seen = HashSet::with_capacity(records.len());
                let devices: DeviceList = records
                    .into_iter()
                    .filter(|r| !r.instance_id.trim().is_empty())
                    .filter(|r| seen.insert(r.instance_id.clone()))
                    .map(Device::from)
                    .collect();
                debug!("Enumerated {} HID device(s)", devices.len());
                EnumerationSnapshot {
                    devices,
                    error: None,
                }
            }
            Err(e) => {
                warn!("HID enumeration failed: {}", e);
                EnumerationSnapshot {
                    devices: DeviceList::new(),
                    error: Some(e),
                }
            }
        }
    }
}
