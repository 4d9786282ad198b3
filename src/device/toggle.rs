//! Enabling and disabling the controlled device
//!
//! State changes go through the device manager, which identifies devices by
//! hardware id rather than by the WMI instance id used everywhere else. The two
//! formats don't line up character for character, so the target is located with
//! [`HardwareIdMatch`]: a case-insensitive substring test of the instance-id
//! fragment against each candidate id. Keep it loose; an exact comparison
//! misses devices whose ids are formatted differently by the two APIs.
//!
//! Backends look for an exact instance-id match first and fall back to the
//! substring test only when none exists, so `HID\VID_1\1` never selects
//! `HID\VID_1\10`.

use crate::device::DeviceBackend;
use crate::device::status::DeviceStatusProbe;
use crate::error::{HandsOffError, Result};
use tracing::{debug, error, info};

/// Matching policy between an instance-id fragment and device-manager ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareIdMatch {
    fragment: String,
}

impl HardwareIdMatch {
    /// Policy for `fragment`, or `None` when the fragment is blank
    ///
    /// A blank fragment would be a substring of every id.
    pub fn new(fragment: &str) -> Option<Self> {
        let fragment = canonicalize(fragment);
        (!fragment.is_empty()).then_some(Self { fragment })
    }

    /// Canonical (trimmed, upper-case) fragment
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Whether `candidate` contains the fragment, ignoring case
    pub fn matches(&self, candidate: &str) -> bool {
        canonicalize(candidate).contains(&self.fragment)
    }

    /// Whether `candidate` is the fragment itself, ignoring case
    pub fn is_exact(&self, candidate: &str) -> bool {
        canonicalize(candidate) == self.fragment
    }

    /// Whether any of `candidates` matches
    pub fn matches_any<'a, I>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates.into_iter().any(|c| self.matches(c))
    }
}

fn canonicalize(id: &str) -> String {
    id.trim().to_uppercase()
}

/// Result of a toggle: what was asked for and whether the OS accepted it
#[derive(Debug)]
pub struct ToggleAttempt {
    /// The state the toggle tried to reach
    pub intended: bool,
    /// What the device manager reported
    pub outcome: Result<()>,
}

/// Issues enable/disable commands for a device
pub struct DeviceToggle<B: DeviceBackend> {
    backend: B,
}

impl<B: DeviceBackend> DeviceToggle<B> {
    /// Toggle over a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Enable or disable the device identified by `instance_id`
    ///
    /// A blank id means "no device selected" and succeeds without doing anything.
    pub fn set_enabled(&self, instance_id: &str, enabled: bool) -> Result<()> {
        let Some(matcher) = HardwareIdMatch::new(instance_id) else {
            debug!("No controlled device, skipping state change");
            return Ok(());
        };

        info!(
            "{} device {}",
            if enabled { "Enabling" } else { "Disabling" },
            instance_id
        );

        match self.backend.set_enabled(&matcher, enabled) {
            Ok(()) => Ok(()),
            Err(e) => {
                match &e {
                    HandsOffError::DeviceNotFound(_) => {
                        error!("Device {} not found in device manager", instance_id);
                    }
                    HandsOffError::PermissionDenied(_) => {
                        error!("Not allowed to change state of {}: {}", instance_id, e);
                    }
                    _ => error!("Failed to change state of {}: {}", instance_id, e),
                }
                Err(e)
            }
        }
    }

    /// Read the current state, command the opposite, report both
    ///
    /// The outcome is informational: callers refresh the icon by probing again.
    pub fn toggle(&self, instance_id: &str) -> ToggleAttempt {
        let current = DeviceStatusProbe::new(&self.backend).is_enabled(instance_id);
        let intended = !current;
        let outcome = self.set_enabled(instance_id, intended);
        ToggleAttempt { intended, outcome }
    }

    /// Toggle and return the intended new state, whether or not it took effect
    pub fn toggle_device(&self, instance_id: &str) -> bool {
        self.toggle(instance_id).intended
    }
}
