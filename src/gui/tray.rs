//! System tray integration
//!
//! Left click toggles the controlled device. Right click opens:
//!
//! ```text
//! Controlled device ▸  (one check item per HID device)
//! Launch on startup
//! About...
//! ─────────
//! Quit
//! ```
//!
//! The menu never opens on left click, so one click is one toggle. When no
//! device is controlled yet, the left click opens the freshly built menu
//! instead. The device submenu is rebuilt on right-button down, before the
//! menu is shown on right-button up. Tray and menu events are queued by `tray-icon`
//! while a message is dispatched and handled right after it.

use crate::gui::icons::{tooltip_text, tray_icon};
use handsoff::config::ConfigManager;
use handsoff::controller::{ClickOutcome, DeviceController, DeviceMenu, IconState, Notice};
use handsoff::device::DeviceWorker;
use handsoff::error::{HandsOffError, Result, StringError, get_user_friendly_error};
use handsoff::utils::{StartupRegistration, TaskSchedulerAutoStart};
use tracing::{debug, info, warn};
use tray_icon::menu::{
    CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu,
};
use tray_icon::{MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, MSG, PostQuitMessage, TranslateMessage,
};

/// Prefix of device check item ids; the rest is the instance id
const DEVICE_ID_PREFIX: &str = "device:";

type Controller = DeviceController<DeviceWorker, ConfigManager>;

fn menu_error(what: &str, e: impl std::fmt::Display) -> HandsOffError {
    HandsOffError::ConfigError(StringError::new(format!("{what}: {e}")))
}

/// Whether a left click should fall through to the menu
fn opens_menu(outcome: &ClickOutcome) -> bool {
    matches!(outcome, ClickOutcome::NeedsSelection)
}

/// Windows menus treat `&` as a mnemonic marker
fn menu_label(text: &str) -> String {
    text.replace('&', "&&")
}

/// The tray icon, its menu and the controller behind them
pub struct TrayApp {
    controller: Controller,
    autostart: TaskSchedulerAutoStart,
    tray: TrayIcon,
    devices_menu: Submenu,
    device_items: Vec<CheckMenuItem>,
    placeholder: Option<MenuItem>,
    launch_item: CheckMenuItem,
    about_id: MenuId,
    quit_id: MenuId,
    icon_state: IconState,
}

impl TrayApp {
    /// Create the tray icon and its menu
    pub fn new(controller: Controller, autostart: TaskSchedulerAutoStart) -> Result<Self> {
        info!("Creating system tray icon");

        let menu = Menu::new();
        let devices_menu = Submenu::new("Controlled device", true);
        let launch_on_startup = autostart.is_registered().unwrap_or_else(|e| {
            warn!("Failed to read startup registration: {}", e);
            false
        });
        let launch_item = CheckMenuItem::new("Launch on startup", true, launch_on_startup, None);
        let about_item = MenuItem::new("About...", true, None);
        let quit_item = MenuItem::new("Quit", true, None);

        menu.append(&devices_menu)
            .map_err(|e| menu_error("Failed to add device submenu", e))?;
        menu.append(&launch_item)
            .map_err(|e| menu_error("Failed to add startup item", e))?;
        menu.append(&about_item)
            .map_err(|e| menu_error("Failed to add About item", e))?;
        menu.append(&PredefinedMenuItem::separator())
            .map_err(|e| menu_error("Failed to add separator", e))?;
        menu.append(&quit_item)
            .map_err(|e| menu_error("Failed to add Quit item", e))?;

        let icon_state = controller.icon_state();
        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_menu_on_left_click(false)
            .with_icon(tray_icon(icon_state)?)
            .with_tooltip(tooltip_text(icon_state))
            .build()
            .map_err(|e| menu_error("Failed to build tray icon", e))?;

        let mut app = Self {
            controller,
            autostart,
            tray,
            devices_menu,
            device_items: Vec::new(),
            placeholder: None,
            launch_item,
            about_id: about_item.id().clone(),
            quit_id: quit_item.id().clone(),
            icon_state,
        };
        app.rebuild_device_menu();

        info!("System tray icon created");
        Ok(app)
    }

    /// Show startup notices, then pump messages until Quit
    #[expect(unsafe_code, reason = "Windows FFI for the thread message loop")]
    pub fn run(mut self) -> Result<()> {
        let notices = self.controller.startup_notices();
        self.show_notices(&notices);

        let mut msg = MSG::default();
        // SAFETY: msg is a valid, writable MSG for the whole loop; the tray
        // window lives on this thread.
        unsafe {
            while GetMessageW(&raw mut msg, None, 0, 0).as_bool() {
                let _ = TranslateMessage(&raw const msg);
                DispatchMessageW(&raw const msg);
                self.drain_events();
            }
        }

        info!("Message loop finished");
        Ok(())
    }

    fn drain_events(&mut self) {
        while let Ok(event) = TrayIconEvent::receiver().try_recv() {
            self.handle_tray_event(&event);
        }
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            self.handle_menu_event(&event);
        }
    }

    fn handle_tray_event(&mut self, event: &TrayIconEvent) {
        if let TrayIconEvent::Click {
            button,
            button_state,
            ..
        } = event
        {
            match (button, button_state) {
                (MouseButton::Left, MouseButtonState::Up) => self.on_primary_click(),
                (MouseButton::Right, MouseButtonState::Down) => self.rebuild_device_menu(),
                _ => {}
            }
        }
    }

    #[expect(unsafe_code, reason = "PostQuitMessage ends the message loop")]
    fn handle_menu_event(&mut self, event: &MenuEvent) {
        let id = event.id();
        if *id == self.quit_id {
            info!("Quit requested");
            // SAFETY: called on the thread that owns the message loop.
            unsafe { PostQuitMessage(0) };
        } else if *id == self.about_id {
            show_about();
        } else if *id == *self.launch_item.id() {
            self.toggle_launch_on_startup();
        } else if let Some(instance_id) = id.0.strip_prefix(DEVICE_ID_PREFIX) {
            let instance_id = instance_id.to_string();
            self.on_device_picked(&instance_id);
        } else {
            debug!("Unhandled menu event {:?}", id);
        }
    }

    fn on_primary_click(&mut self) {
        let report = self.controller.primary_click();
        if let ClickOutcome::Toggled { intended, actual } = report.outcome {
            debug!("Toggle requested enabled={}, now enabled={}", intended, actual);
        }
        self.refresh_icon();
        self.show_notices(&report.notices);

        if opens_menu(&report.outcome) {
            self.rebuild_device_menu();
            self.tray.show_menu();
        }
    }

    fn on_device_picked(&mut self, instance_id: &str) {
        let notices = self.controller.pick_device(instance_id);
        for item in &self.device_items {
            item.set_checked(item.id().0.strip_prefix(DEVICE_ID_PREFIX) == Some(instance_id));
        }
        self.refresh_icon();
        self.show_notices(&notices);
    }

    fn toggle_launch_on_startup(&mut self) {
        let wanted = !self.autostart.is_registered().unwrap_or(false);
        if let Err(e) = self.autostart.set_registered(wanted) {
            warn!("Failed to change startup registration: {}", e);
            self.show_error(&e);
        }

        let registered = self.autostart.is_registered().unwrap_or(false);
        self.launch_item.set_checked(registered);
    }

    fn rebuild_device_menu(&mut self) {
        let menu = self.controller.refresh_devices();

        for item in self.device_items.drain(..) {
            if let Err(e) = self.devices_menu.remove(&item) {
                warn!("Failed to remove device item: {}", e);
            }
        }
        if let Some(placeholder) = self.placeholder.take() {
            let _ = self.devices_menu.remove(&placeholder);
        }

        if let Err(e) = self.fill_device_menu(&menu) {
            warn!("Failed to build device menu: {}", e);
        }

        let registered = self.autostart.is_registered().unwrap_or(false);
        self.launch_item.set_checked(registered);
        self.refresh_icon();
    }

    fn fill_device_menu(&mut self, menu: &DeviceMenu) -> Result<()> {
        if menu.items.is_empty() {
            let text = match &menu.error {
                Some(_) => "Unable to list devices",
                None => "No devices found",
            };
            let placeholder = MenuItem::new(text, false, None);
            self.devices_menu
                .append(&placeholder)
                .map_err(|e| menu_error("Failed to add placeholder", e))?;
            self.placeholder = Some(placeholder);
            return Ok(());
        }

        for entry in &menu.items {
            let item = CheckMenuItem::with_id(
                MenuId::new(format!("{DEVICE_ID_PREFIX}{}", entry.instance_id)),
                menu_label(&entry.display_name),
                true,
                entry.checked,
                None,
            );
            self.devices_menu
                .append(&item)
                .map_err(|e| menu_error("Failed to add device item", e))?;
            self.device_items.push(item);
        }
        debug!("Device menu rebuilt with {} item(s)", menu.items.len());
        Ok(())
    }

    fn refresh_icon(&mut self) {
        let state = self.controller.icon_state();
        if state != self.icon_state {
            match tray_icon(state) {
                Ok(icon) => {
                    if let Err(e) = self.tray.set_icon(Some(icon)) {
                        warn!("Failed to update tray icon: {}", e);
                    }
                }
                Err(e) => warn!("{}", e),
            }
            self.icon_state = state;
        }
        if let Err(e) = self.tray.set_tooltip(Some(tooltip_text(state))) {
            warn!("Failed to update tooltip: {}", e);
        }
    }

    fn show_notices(&self, notices: &[Notice]) {
        if !self.controller.notifications_enabled() {
            return;
        }
        for notice in notices {
            show_toast(notice.title(), notice.message());
        }
    }

    fn show_error(&self, error: &HandsOffError) {
        if self.controller.notifications_enabled() {
            show_toast("HandsOff", &get_user_friendly_error(error));
        }
    }
}

fn show_toast(title: &str, text: &str) {
    use tauri_winrt_notification::{Duration, Toast};

    let result = Toast::new(Toast::POWERSHELL_APP_ID)
        .title(title)
        .text1(text)
        .sound(None)
        .duration(Duration::Short)
        .show();
    if let Err(e) = result {
        warn!("Failed to show notification: {}", e);
    }
}

fn show_about() {
    use rfd::{MessageButtons, MessageDialog, MessageLevel};

    MessageDialog::new()
        .set_title("About")
        .set_description(format!(
            "HandsOff {}\n{}\n\nCopyright (c) {}",
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_DESCRIPTION"),
            env!("CARGO_PKG_AUTHORS"),
        ))
        .set_buttons(MessageButtons::Ok)
        .set_level(MessageLevel::Info)
        .show();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_label_escapes_ampersand() {
        assert_eq!(menu_label("Touch & Pen"), "Touch && Pen");
        assert_eq!(menu_label("Keyboard"), "Keyboard");
    }

    #[test]
    fn test_only_missing_device_opens_menu() {
        assert!(opens_menu(&ClickOutcome::NeedsSelection));
        assert!(!opens_menu(&ClickOutcome::Toggled {
            intended: false,
            actual: false
        }));
        assert!(!opens_menu(&ClickOutcome::Toggled {
            intended: true,
            actual: false
        }));
    }
}
