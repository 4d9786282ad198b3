//! Controlled device selection
//!
//! A live state machine over `NoDevice` / `Selected(id)`, re-evaluated against
//! every fresh enumeration:
//!
//! - `NoDevice` → `Selected`: the first device whose name looks like a touchscreen
//! - `Selected(id)` → `NoDevice`: `id` is missing from the snapshot (stale);
//!   autodetection runs again on the next enumeration
//! - any → `Selected(new)`: explicit user pick, trusted without validation
//!
//! The selected id is persisted through [`Settings`] on every transition.

use crate::config::{Settings, SettingsStore};
use crate::device::{Device, DeviceList};
use crate::error::HandsOffError;
use tracing::{info, warn};

/// Current selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No controlled device
    NoDevice,
    /// Controlled device instance id
    Selected(String),
}

/// What a reconcile pass changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Selection is unchanged
    Unchanged,
    /// Nothing was selected and a touchscreen was found
    AutoDetected(String),
    /// The selected device is no longer present; selection cleared
    Cleared {
        /// The id that no longer resolves
        stale: String,
    },
}

impl Reconciliation {
    /// `StaleSelection` when the pass cleared a vanished device
    pub fn stale_error(&self) -> Option<HandsOffError> {
        match self {
            Self::Cleared { stale } => Some(HandsOffError::StaleSelection(stale.clone())),
            Self::Unchanged | Self::AutoDetected(_) => None,
        }
    }
}

/// Whether a device name looks like a touchscreen
///
/// Contains "touch" and either "screen" or "display", ignoring case.
pub fn looks_like_touchscreen(display_name: &str) -> bool {
    let name = display_name.to_lowercase();
    name.contains("touch") && (name.contains("screen") || name.contains("display"))
}

/// First device in snapshot order that looks like a touchscreen
pub fn detect_default(devices: &DeviceList) -> Option<&Device> {
    devices
        .iter()
        .find(|d| looks_like_touchscreen(d.display_name()))
}

/// Owns "the one device the user controls"
pub struct ControlledDeviceSelector<S: SettingsStore> {
    settings: Settings<S>,
}

impl<S: SettingsStore> ControlledDeviceSelector<S> {
    /// Selector starting from the persisted id
    pub fn new(settings: Settings<S>) -> Self {
        Self { settings }
    }

    /// Current selection; a blank persisted id is `NoDevice`
    pub fn selection(&self) -> Selection {
        match self.controlled_id() {
            Some(id) => Selection::Selected(id.to_string()),
            None => Selection::NoDevice,
        }
    }

    /// Controlled device id, if any
    pub fn controlled_id(&self) -> Option<&str> {
        let id = self.settings.controlled_device_id();
        (!id.trim().is_empty()).then_some(id)
    }

    /// Re-evaluate the selection against a fresh enumeration
    ///
    /// Only pass snapshots from queries that succeeded; an empty list from a
    /// failed query would otherwise clear a perfectly good selection.
    pub fn reconcile(&mut self, devices: &DeviceList) -> Reconciliation {
        match self.selection() {
            Selection::NoDevice => match detect_default(devices) {
                Some(device) => {
                    info!(
                        "Auto-detected controlled device: {} ({})",
                        device.display_name(),
                        device.instance_id()
                    );
                    let id = device.instance_id().to_string();
                    self.settings.set_controlled_device_id(id.clone());
                    Reconciliation::AutoDetected(id)
                }
                None => Reconciliation::Unchanged,
            },
            Selection::Selected(id) => {
                if devices.contains_id(&id) {
                    Reconciliation::Unchanged
                } else {
                    warn!("Controlled device {} is no longer present", id);
                    self.settings.set_controlled_device_id(String::new());
                    Reconciliation::Cleared { stale: id }
                }
            }
        }
    }

    /// Explicit user choice from the device menu
    pub fn user_pick(&mut self, instance_id: impl Into<String>) {
        let instance_id = instance_id.into();
        info!("User selected controlled device {}", instance_id);
        self.settings.set_controlled_device_id(instance_id);
    }

    /// Settings the selection is persisted in
    pub fn settings(&self) -> &Settings<S> {
        &self.settings
    }

    /// Mutable access to the settings
    pub fn settings_mut(&mut self) -> &mut Settings<S> {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, MemoryStore};

    fn selector_with(store: &MemoryStore) -> ControlledDeviceSelector<&MemoryStore> {
        ControlledDeviceSelector::new(Settings::load(store))
    }

    fn store_with_id(id: &str) -> MemoryStore {
        MemoryStore::with_config(AppConfig {
            controlled_device_id: id.to_string(),
            ..AppConfig::default()
        })
    }

    #[test]
    fn test_detects_touch_screen_among_other_devices() {
        let devices = DeviceList::from(vec![
            Device::new("USB", "USB Composite Device"),
            Device::new("TS", "HID-compliant touch screen"),
            Device::new("M", "Mouse"),
        ]);

        assert_eq!(
            detect_default(&devices).map(Device::display_name),
            Some("HID-compliant touch screen")
        );
    }

    #[test]
    fn test_detection_is_case_insensitive() {
        assert!(looks_like_touchscreen("TOUCH DISPLAY DEVICE"));
        assert!(looks_like_touchscreen("Touch Screen"));
        assert!(!looks_like_touchscreen("Touchpad"));
        assert!(!looks_like_touchscreen("Display adapter"));
    }

    #[test]
    fn test_detection_takes_first_in_list_order() {
        let devices = DeviceList::from(vec![
            Device::new("B", "Zeta touch screen"),
            Device::new("A", "Alpha touch screen"),
        ]);

        assert_eq!(detect_default(&devices).map(Device::instance_id), Some("B"));
    }

    #[test]
    fn test_autodetect_persists_selection() {
        let store = MemoryStore::default();
        let mut selector = selector_with(&store);
        let devices = DeviceList::from(vec![
            Device::new("A", "Alpha Touch Screen"),
            Device::new("K", "Keyboard"),
        ]);

        assert_eq!(
            selector.reconcile(&devices),
            Reconciliation::AutoDetected("A".to_string())
        );
        assert_eq!(selector.selection(), Selection::Selected("A".to_string()));
        assert_eq!(store.stored().controlled_device_id, "A");
    }

    #[test]
    fn test_no_candidate_stays_unselected() {
        let store = MemoryStore::default();
        let mut selector = selector_with(&store);
        let devices = DeviceList::from(vec![Device::new("K", "Keyboard")]);

        assert_eq!(selector.reconcile(&devices), Reconciliation::Unchanged);
        assert_eq!(selector.selection(), Selection::NoDevice);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_stale_selection_is_cleared() {
        let store = store_with_id("X");
        let mut selector = selector_with(&store);
        let devices = DeviceList::from(vec![
            Device::new("A", "Alpha Touch Screen"),
            Device::new("K", "Keyboard"),
        ]);

        assert_eq!(
            selector.reconcile(&devices),
            Reconciliation::Cleared {
                stale: "X".to_string()
            }
        );
        assert_eq!(selector.selection(), Selection::NoDevice);
        assert!(store.stored().controlled_device_id.is_empty());
        assert!(matches!(
            Reconciliation::Cleared { stale: "X".to_string() }.stale_error(),
            Some(HandsOffError::StaleSelection(id)) if id == "X"
        ));

        // Autodetection picks up on the next enumeration
        assert_eq!(
            selector.reconcile(&devices),
            Reconciliation::AutoDetected("A".to_string())
        );
    }

    #[test]
    fn test_present_selection_is_kept() {
        let store = store_with_id("K");
        let mut selector = selector_with(&store);
        let devices = DeviceList::from(vec![
            Device::new("A", "Alpha Touch Screen"),
            Device::new("K", "Keyboard"),
        ]);

        assert_eq!(selector.reconcile(&devices), Reconciliation::Unchanged);
        assert_eq!(selector.controlled_id(), Some("K"));
    }

    #[test]
    fn test_user_pick_wins_without_validation() {
        let store = store_with_id("A");
        let mut selector = selector_with(&store);

        selector.user_pick("NOT-IN-ANY-LIST");

        assert_eq!(selector.controlled_id(), Some("NOT-IN-ANY-LIST"));
        assert_eq!(store.stored().controlled_device_id, "NOT-IN-ANY-LIST");
    }

    #[test]
    fn test_whitespace_id_is_no_device() {
        let store = store_with_id("   ");
        let selector = selector_with(&store);
        assert_eq!(selector.selection(), Selection::NoDevice);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: detection ignores letter case entirely
            #[test]
            fn detection_ignores_case(
                prefix in "[a-zA-Z ]{0,8}",
                second in prop::sample::select(vec!["screen", "display"]),
                upper in any::<bool>(),
            ) {
                let name = format!("{prefix}touch {second}");
                let name = if upper { name.to_uppercase() } else { name };
                prop_assert!(looks_like_touchscreen(&name));
            }

            /// Property: names without "touch" never match
            #[test]
            fn names_without_touch_never_match(name in "[a-su-zA-SU-Z ]{0,30}") {
                prop_assert!(!looks_like_touchscreen(&name));
            }
        }
    }
}
