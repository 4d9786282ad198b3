//! In-process device tree
//!
//! Behaves like the Windows backend (class filter, case-insensitive id lookup,
//! exact match first for state changes) without touching real hardware. Clones
//! share the same tree, so a test can keep a handle while a worker thread owns
//! another.

use crate::device::toggle::HardwareIdMatch;
use crate::device::{DeviceBackend, DeviceRecord, HID_CLASS_GUID};
use crate::error::{HandsOffError, Result, StringError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct MemoryDevice {
    record: DeviceRecord,
    class_guid: String,
    hardware_ids: Vec<String>,
}

#[derive(Debug, Default)]
struct TreeState {
    devices: Vec<MemoryDevice>,
    fail_queries: bool,
    deny_changes: bool,
    delay: Option<Duration>,
    query_count: usize,
    state_change_count: usize,
}

/// Device backend over an in-memory device tree
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<TreeState>>,
}

impl MemoryBackend {
    /// Empty device tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a HID-class device
    pub fn add_device(&self, instance_id: &str, display_name: &str, enabled: bool) {
        self.add_device_with_hardware_ids(instance_id, display_name, enabled, &[]);
    }

    /// Add a HID-class device that also exposes the given hardware ids
    pub fn add_device_with_hardware_ids(
        &self,
        instance_id: &str,
        display_name: &str,
        enabled: bool,
        hardware_ids: &[&str],
    ) {
        self.push(MemoryDevice {
            record: DeviceRecord {
                instance_id: instance_id.to_string(),
                display_name: display_name.to_string(),
                status_ok: enabled,
            },
            class_guid: HID_CLASS_GUID.to_string(),
            hardware_ids: hardware_ids.iter().map(ToString::to_string).collect(),
        });
    }

    /// Add a device of another setup class
    pub fn add_device_in_class(
        &self,
        instance_id: &str,
        display_name: &str,
        enabled: bool,
        class_guid: &str,
    ) {
        self.push(MemoryDevice {
            record: DeviceRecord {
                instance_id: instance_id.to_string(),
                display_name: display_name.to_string(),
                status_ok: enabled,
            },
            class_guid: class_guid.to_string(),
            hardware_ids: Vec::new(),
        });
    }

    fn push(&self, device: MemoryDevice) {
        self.state.lock().devices.push(device);
    }

    /// Unplug a device
    pub fn remove_device(&self, instance_id: &str) {
        self.state
            .lock()
            .devices
            .retain(|d| d.record.instance_id != instance_id);
    }

    /// Change a device's state behind the application's back
    pub fn set_device_enabled(&self, instance_id: &str, enabled: bool) {
        let mut state = self.state.lock();
        for device in &mut state.devices {
            if device.record.instance_id == instance_id {
                device.record.status_ok = enabled;
            }
        }
    }

    /// Current state of a device, `false` when absent
    pub fn is_device_enabled(&self, instance_id: &str) -> bool {
        self.state
            .lock()
            .devices
            .iter()
            .find(|d| d.record.instance_id == instance_id)
            .is_some_and(|d| d.record.status_ok)
    }

    /// Make every query fail
    pub fn set_fail_queries(&self, fail: bool) {
        self.state.lock().fail_queries = fail;
    }

    /// Make every state change fail with `PermissionDenied`
    pub fn set_deny_changes(&self, deny: bool) {
        self.state.lock().deny_changes = deny;
    }

    /// Delay every call, to simulate a hung device stack
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    /// Number of enumeration and lookup queries served
    pub fn query_count(&self) -> usize {
        self.state.lock().query_count
    }

    /// Number of state changes applied
    pub fn state_change_count(&self) -> usize {
        self.state.lock().state_change_count
    }

    fn stall(&self) {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }

    fn begin_query(&self) -> Result<parking_lot::MutexGuard<'_, TreeState>> {
        self.stall();
        let mut state = self.state.lock();
        state.query_count += 1;
        if state.fail_queries {
            return Err(HandsOffError::QueryFailed(StringError::new(
                "device tree unavailable",
            )));
        }
        Ok(state)
    }
}

impl DeviceBackend for MemoryBackend {
    fn enumerate(&self, class_guid: &str) -> Result<Vec<DeviceRecord>> {
        let state = self.begin_query()?;
        Ok(state
            .devices
            .iter()
            .filter(|d| d.class_guid.eq_ignore_ascii_case(class_guid))
            .map(|d| d.record.clone())
            .collect())
    }

    fn find_by_instance_id(&self, instance_id: &str) -> Result<Option<DeviceRecord>> {
        let state = self.begin_query()?;
        Ok(state
            .devices
            .iter()
            .find(|d| d.record.instance_id.eq_ignore_ascii_case(instance_id))
            .map(|d| d.record.clone()))
    }

    fn set_enabled(&self, matcher: &HardwareIdMatch, enabled: bool) -> Result<()> {
        self.stall();
        let mut state = self.state.lock();
        if state.deny_changes {
            return Err(HandsOffError::PermissionDenied(
                "the requested operation requires elevation".to_string(),
            ));
        }

        let hid = |d: &MemoryDevice| d.class_guid.eq_ignore_ascii_case(HID_CLASS_GUID);
        let index = state
            .devices
            .iter()
            .position(|d| hid(d) && matcher.is_exact(&d.record.instance_id))
            .or_else(|| {
                state.devices.iter().position(|d| {
                    hid(d)
                        && (matcher.matches(&d.record.instance_id)
                            || matcher.matches_any(d.hardware_ids.iter().map(String::as_str)))
                })
            })
            .ok_or_else(|| HandsOffError::DeviceNotFound(matcher.fragment().to_string()))?;

        state.devices[index].record.status_ok = enabled;
        state.state_change_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_tree() {
        let backend = MemoryBackend::new();
        let other = backend.clone();

        other.add_device("HID\\A", "A", true);
        assert!(backend.is_device_enabled("HID\\A"));

        backend.set_device_enabled("HID\\A", false);
        assert!(!other.is_device_enabled("HID\\A"));
    }

    #[test]
    fn test_lookup_ignores_case() {
        let backend = MemoryBackend::new();
        backend.add_device("HID\\VID_04F3", "Touch", true);

        let found = backend.find_by_instance_id("hid\\vid_04f3").unwrap();
        assert_eq!(found.map(|r| r.display_name), Some("Touch".to_string()));
    }

    #[test]
    fn test_state_change_touches_first_match_only() {
        let backend = MemoryBackend::new();
        backend.add_device("HID\\VID_1&COL01", "First", true);
        backend.add_device("HID\\VID_1&COL02", "Second", true);

        let matcher = HardwareIdMatch::new("VID_1").unwrap();
        backend.set_enabled(&matcher, false).unwrap();

        assert!(!backend.is_device_enabled("HID\\VID_1&COL01"));
        assert!(backend.is_device_enabled("HID\\VID_1&COL02"));
        assert_eq!(backend.state_change_count(), 1);
    }

    #[test]
    fn test_removed_device_is_gone() {
        let backend = MemoryBackend::new();
        backend.add_device("HID\\A", "A", true);
        backend.remove_device("HID\\A");

        assert!(backend.enumerate(HID_CLASS_GUID).unwrap().is_empty());
    }
}
