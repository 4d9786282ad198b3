//! Device controller implementation

use crate::config::{Settings, SettingsStore};
use crate::controller::notice::Notice;
use crate::device::{
    ControlledDeviceSelector, DeviceBackend, DeviceQuery, DeviceStatusProbe, DeviceToggle,
    Reconciliation, Selection,
};
use crate::error::{HandsOffError, get_user_friendly_error};
use tracing::{debug, info, warn};

/// Consecutive failed toggles after which the icon shows a warning
pub const FAILURE_WARNING_THRESHOLD: u32 = 3;

/// One entry of the device submenu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMenuItem {
    /// Instance id handed back to [`DeviceController::pick_device`]
    pub instance_id: String,
    /// Menu label
    pub display_name: String,
    /// Whether this is the controlled device
    pub checked: bool,
}

/// Device submenu model, sorted by display name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceMenu {
    /// Devices to list
    pub items: Vec<DeviceMenuItem>,
    /// Why the list is empty, when enumeration failed
    pub error: Option<String>,
}

/// What the tray icon should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconState {
    /// No controlled device
    NoDevice,
    /// Controlled device is enabled
    Enabled,
    /// Controlled device is disabled (or its state is unknown)
    Disabled,
    /// Toggling keeps failing
    Warning,
}

/// Result of a primary click on the tray icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Nothing to toggle; the user has to pick a device first
    NeedsSelection,
    /// A toggle was attempted
    Toggled {
        /// State the toggle tried to reach
        intended: bool,
        /// State probed afterwards
        actual: bool,
    },
}

/// Click outcome plus the notices it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickReport {
    /// What happened
    pub outcome: ClickOutcome,
    /// Messages for the user
    pub notices: Vec<Notice>,
}

/// Drives device selection and toggling for the tray
pub struct DeviceController<B: DeviceBackend, S: SettingsStore> {
    backend: B,
    selector: ControlledDeviceSelector<S>,
    tutorial_armed: bool,
    failure_streak: u32,
    permission_notice_shown: bool,
    failure_notice_shown: bool,
}

impl<B: DeviceBackend, S: SettingsStore> DeviceController<B, S> {
    /// Controller over a backend, starting from the persisted selection
    ///
    /// A first run (nothing selected yet) arms the one-time tutorial.
    pub fn new(backend: B, settings: Settings<S>) -> Self {
        let selector = ControlledDeviceSelector::new(settings);
        let tutorial_armed = selector.selection() == Selection::NoDevice;
        if let Some(id) = selector.controlled_id() {
            info!("Controlled device from settings: {}", id);
        }

        Self {
            backend,
            selector,
            tutorial_armed,
            failure_streak: 0,
            permission_notice_shown: false,
            failure_notice_shown: false,
        }
    }

    /// Enumerate devices, reconcile the selection and build the device menu
    ///
    /// A failed enumeration leaves the selection alone.
    pub fn refresh_devices(&mut self) -> DeviceMenu {
        let snapshot = DeviceQuery::new(&self.backend).list_devices();

        if let Some(e) = &snapshot.error {
            return DeviceMenu {
                items: Vec::new(),
                error: Some(get_user_friendly_error(e)),
            };
        }

        let reconciliation = self.selector.reconcile(&snapshot.devices);
        if let Some(e) = reconciliation.stale_error() {
            info!("{}; selection cleared", e);
        }
        if reconciliation != Reconciliation::Unchanged {
            self.failure_streak = 0;
        }

        let controlled = self.selector.controlled_id();
        let items = snapshot
            .devices
            .sorted_by_name()
            .iter()
            .map(|d| DeviceMenuItem {
                instance_id: d.instance_id().to_string(),
                display_name: d.display_name().to_string(),
                checked: controlled == Some(d.instance_id()),
            })
            .collect();

        DeviceMenu { items, error: None }
    }

    /// The user chose a device from the menu
    pub fn pick_device(&mut self, instance_id: &str) -> Vec<Notice> {
        self.selector.user_pick(instance_id);
        self.failure_streak = 0;
        self.help_notices()
    }

    /// Notices to show once the tray is up
    pub fn startup_notices(&mut self) -> Vec<Notice> {
        self.help_notices()
    }

    fn help_notices(&mut self) -> Vec<Notice> {
        if self.selector.controlled_id().is_none() {
            vec![Notice::SelectDevice]
        } else if self.tutorial_armed {
            self.tutorial_armed = false;
            vec![Notice::Tutorial]
        } else {
            Vec::new()
        }
    }

    /// Toggle the controlled device
    pub fn primary_click(&mut self) -> ClickReport {
        let Some(id) = self.selector.controlled_id().map(ToString::to_string) else {
            debug!("Click without a controlled device");
            return ClickReport {
                outcome: ClickOutcome::NeedsSelection,
                notices: vec![Notice::SelectDevice],
            };
        };

        let attempt = DeviceToggle::new(&self.backend).toggle(&id);
        let actual = DeviceStatusProbe::new(&self.backend).is_enabled(&id);

        let mut notices = Vec::new();
        match &attempt.outcome {
            Ok(()) if actual == attempt.intended => {
                self.failure_streak = 0;
            }
            Ok(()) => {
                warn!(
                    "Device {} reports enabled={} after requesting enabled={}",
                    id, actual, attempt.intended
                );
                self.record_failure();
            }
            Err(e) => {
                self.record_failure();
                notices.extend(self.failure_notice(e));
            }
        }

        ClickReport {
            outcome: ClickOutcome::Toggled {
                intended: attempt.intended,
                actual,
            },
            notices,
        }
    }

    fn record_failure(&mut self) {
        self.failure_streak = self.failure_streak.saturating_add(1);
        if self.failure_streak == FAILURE_WARNING_THRESHOLD {
            warn!("{} toggles in a row failed", self.failure_streak);
        }
    }

    /// Error notice, at most once per kind per session
    fn failure_notice(&mut self, error: &HandsOffError) -> Option<Notice> {
        let shown = match error {
            HandsOffError::PermissionDenied(_) => &mut self.permission_notice_shown,
            _ => &mut self.failure_notice_shown,
        };
        if *shown {
            return None;
        }
        *shown = true;
        Some(Notice::from_error(error))
    }

    /// Icon for the current state, probed live
    pub fn icon_state(&self) -> IconState {
        let Some(id) = self.selector.controlled_id() else {
            return IconState::NoDevice;
        };
        if self.failure_streak >= FAILURE_WARNING_THRESHOLD {
            return IconState::Warning;
        }
        if DeviceStatusProbe::new(&self.backend).is_enabled(id) {
            IconState::Enabled
        } else {
            IconState::Disabled
        }
    }

    /// Current selection
    pub fn selection(&self) -> Selection {
        self.selector.selection()
    }

    /// Controlled device id, if any
    pub fn controlled_id(&self) -> Option<&str> {
        self.selector.controlled_id()
    }

    /// Consecutive failed toggles
    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    /// Whether notices should be shown at all
    pub fn notifications_enabled(&self) -> bool {
        self.selector.settings().preferences().show_notifications
    }

    /// Settings backing the selection
    pub fn settings(&self) -> &Settings<S> {
        self.selector.settings()
    }

    /// Mutable settings, for preference changes
    pub fn settings_mut(&mut self) -> &mut Settings<S> {
        self.selector.settings_mut()
    }

    /// Device backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
