//! Live enabled/disabled probe
//!
//! Unknown reads as disabled: the tray can only show on or off, and "off" never
//! surprises the user with a touchscreen that is unexpectedly live.

use crate::device::DeviceBackend;
use crate::error::Result;
use tracing::{debug, warn};

/// Reads whether a device is currently enabled
pub struct DeviceStatusProbe<B: DeviceBackend> {
    backend: B,
}

impl<B: DeviceBackend> DeviceStatusProbe<B> {
    /// Probe over a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Whether the device is enabled; `false` for a blank id, a missing device or a failed query
    pub fn is_enabled(&self, instance_id: &str) -> bool {
        match self.probe(instance_id) {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!("Failed to query status of {}: {}", instance_id, e);
                false
            }
        }
    }

    /// Like [`is_enabled`](Self::is_enabled) but surfaces query failures
    pub fn probe(&self, instance_id: &str) -> Result<bool> {
        if instance_id.trim().is_empty() {
            return Ok(false);
        }

        match self.backend.find_by_instance_id(instance_id)? {
            Some(record) => Ok(record.status_ok),
            None => {
                debug!("Device {} is not present", instance_id);
                Ok(false)
            }
        }
    }
}

/// Escape a value for use inside a single-quoted WQL string literal
///
/// Instance ids contain backslash path separators, which WQL treats as the
/// escape character.
pub fn escape_wql_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            _ => escaped.push(c),
        }
    }
    escaped
}
