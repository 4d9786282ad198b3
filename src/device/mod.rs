//! Device control subsystem
//!
//! Enumerates Human Interface Devices, picks the one device the user controls,
//! reads its live enabled state and flips it through the OS device manager.
//!
//! # Architecture
//!
//! - [`DeviceBackend`]: the only place OS-specific query syntax lives. On Windows
//!   it is `WindowsDeviceBackend` (WMI for reads, SetupAPI for state changes);
//!   tests use [`MemoryBackend`].
//! - [`DeviceWorker`]: owns a backend on its own thread and bounds every call
//!   with a timeout so a hung device stack can't freeze the tray.
//! - [`DeviceQuery`], [`DeviceStatusProbe`], [`DeviceToggle`]: thin, fail-soft
//!   operations over a backend.
//! - [`ControlledDeviceSelector`]: the `NoDevice` / `Selected(id)` state machine.
//!
//! # Flow
//!
//! ```text
//! menu opens → DeviceQuery::list_devices → ControlledDeviceSelector::reconcile
//! icon click → DeviceToggle::toggle → DeviceStatusProbe::is_enabled → icon
//! ```
//!
//! Nothing here caches device state: enabled flags can change outside this
//! process, so every call goes back to the OS.

pub mod memory;
pub mod query;
pub mod selector;
pub mod status;
pub mod toggle;
pub mod worker;

#[cfg(windows)]
pub mod windows_api;

pub use memory::MemoryBackend;
pub use query::{DeviceQuery, EnumerationSnapshot};
pub use selector::{ControlledDeviceSelector, Reconciliation, Selection};
pub use status::DeviceStatusProbe;
pub use toggle::{DeviceToggle, HardwareIdMatch, ToggleAttempt};
pub use worker::DeviceWorker;

#[cfg(windows)]
pub use windows_api::WindowsDeviceBackend;

use crate::error::Result;
use std::cmp::Ordering;

/// Setup class GUID of Human Interface Devices (touchscreens, mice, keyboards)
pub const HID_CLASS_GUID: &str = "{745a17a0-74d3-11d0-b6fe-00a0c90f57da}";

/// Value of `Win32_PnPEntity.Status` for a started, working device
pub const STATUS_OK: &str = "OK";

/// A device as the OS backend reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Opaque OS device instance id
    pub instance_id: String,
    /// Friendly name
    pub display_name: String,
    /// Whether the OS reports the device as working (enabled)
    pub status_ok: bool,
}

/// A selectable device: instance id plus display name
///
/// Ordered by case-sensitive display name, which is only used for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    instance_id: String,
    display_name: String,
}

impl Device {
    /// Create a device value
    pub fn new(instance_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            display_name: display_name.into(),
        }
    }

    /// Opaque OS device instance id
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Friendly name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        Self::new(record.instance_id, record.display_name)
    }
}

impl Ord for Device {
    fn cmp(&self, other: &Self) -> Ordering {
        self.display_name
            .cmp(&other.display_name)
            .then_with(|| self.instance_id.cmp(&other.instance_id))
    }
}

impl PartialOrd for Device {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One enumeration snapshot, in the order the OS returned it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceList(Vec<Device>);

impl DeviceList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Devices in snapshot order
    pub fn iter(&self) -> std::slice::Iter<'_, Device> {
        self.0.iter()
    }

    /// Look up a device by exact instance id
    pub fn find(&self, instance_id: &str) -> Option<&Device> {
        self.0.iter().find(|d| d.instance_id == instance_id)
    }

    /// Whether a device with this exact instance id is present
    pub fn contains_id(&self, instance_id: &str) -> bool {
        self.find(instance_id).is_some()
    }

    /// A new list ordered by display name
    pub fn sorted_by_name(&self) -> Self {
        let mut devices = self.0.clone();
        devices.sort();
        Self(devices)
    }
}

impl From<Vec<Device>> for DeviceList {
    fn from(devices: Vec<Device>) -> Self {
        Self(devices)
    }
}

impl FromIterator<Device> for DeviceList {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a Device;
    type IntoIter = std::slice::Iter<'a, Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Capability interface over the OS device manager
///
/// Implementations translate these calls into the platform's native query and
/// state-change APIs. Errors are reported, never panicked; callers decide how
/// to degrade.
pub trait DeviceBackend {
    /// All present devices of the given setup class
    fn enumerate(&self, class_guid: &str) -> Result<Vec<DeviceRecord>>;

    /// The device whose instance id equals `instance_id`, if any
    fn find_by_instance_id(&self, instance_id: &str) -> Result<Option<DeviceRecord>>;

    /// Enable or disable the first device accepted by `matcher`
    ///
    /// Returns `DeviceNotFound` when nothing matches and `PermissionDenied`
    /// when the process lacks the rights to change device state.
    fn set_enabled(&self, matcher: &HardwareIdMatch, enabled: bool) -> Result<()>;
}

impl<B: DeviceBackend + ?Sized> DeviceBackend for &B {
    fn enumerate(&self, class_guid: &str) -> Result<Vec<DeviceRecord>> {
        (**self).enumerate(class_guid)
    }

    fn find_by_instance_id(&self, instance_id: &str) -> Result<Option<DeviceRecord>> {
        (**self).find_by_instance_id(instance_id)
    }

    fn set_enabled(&self, matcher: &HardwareIdMatch, enabled: bool) -> Result<()> {
        (**self).set_enabled(matcher, enabled)
    }
}

impl<B: DeviceBackend + ?Sized> DeviceBackend for Box<B> {
    fn enumerate(&self, class_guid: &str) -> Result<Vec<DeviceRecord>> {
        (**self).enumerate(class_guid)
    }

    fn find_by_instance_id(&self, instance_id: &str) -> Result<Option<DeviceRecord>> {
        (**self).find_by_instance_id(instance_id)
    }

    fn set_enabled(&self, matcher: &HardwareIdMatch, enabled: bool) -> Result<()> {
        (**self).set_enabled(matcher, enabled)
    }
}
