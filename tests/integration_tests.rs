//! Integration tests for `HandsOff`
//!
//! Drives `DeviceController` through whole sessions against the in-memory
//! device tree, with settings persisted to a real JSON file.

#![allow(clippy::unwrap_used)]

use handsoff::config::{AppConfig, ConfigManager, MemoryStore, Settings, SettingsStore};
use handsoff::controller::{ClickOutcome, DeviceController, IconState, Notice};
use handsoff::device::{DeviceWorker, MemoryBackend, Selection};
use std::time::Duration;
use tempfile::TempDir;

const TOUCH_ID: &str = "HID\\VID_04F3&PID_2A1C&COL01\\7&1B2C3D4E&0&0000";
const PEN_ID: &str = "HID\\VID_04F3&PID_2A1C&COL02\\7&1B2C3D4E&0&0001";
const KEYBOARD_ID: &str = "HID\\VID_046D&PID_C31C&MI_00\\8&2A3B4C5D&0&0000";

fn laptop() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.add_device(KEYBOARD_ID, "HID Keyboard Device", true);
    backend.add_device(TOUCH_ID, "HID-compliant touch screen", true);
    backend.add_device(PEN_ID, "HID-compliant pen", true);
    backend
}

fn config_in(dir: &TempDir) -> ConfigManager {
    ConfigManager::with_path(dir.path().join("config.json"))
}

#[test]
fn test_first_run_then_restart() {
    let dir = tempfile::tempdir().unwrap();
    let backend = laptop();

    {
        let mut controller = DeviceController::new(&backend, Settings::load(config_in(&dir)));
        assert_eq!(controller.startup_notices(), [Notice::SelectDevice]);

        let menu = controller.refresh_devices();
        let checked: Vec<&str> = menu
            .items
            .iter()
            .filter(|i| i.checked)
            .map(|i| i.instance_id.as_str())
            .collect();
        assert_eq!(checked, [TOUCH_ID]);
        assert_eq!(controller.icon_state(), IconState::Enabled);
    }

    // Selection survives a restart and the tutorial isn't shown again
    let stored = config_in(&dir).load().unwrap();
    assert_eq!(stored.controlled_device_id, TOUCH_ID);

    let mut controller = DeviceController::new(&backend, Settings::load(config_in(&dir)));
    assert!(controller.startup_notices().is_empty());
    assert_eq!(controller.selection(), Selection::Selected(TOUCH_ID.to_string()));
}

#[test]
fn test_click_twice_restores_device() {
    let backend = laptop();
    let store = MemoryStore::with_config(AppConfig {
        controlled_device_id: TOUCH_ID.to_string(),
        ..AppConfig::default()
    });
    let mut controller = DeviceController::new(&backend, Settings::load(&store));

    let first = controller.primary_click();
    assert_eq!(
        first.outcome,
        ClickOutcome::Toggled {
            intended: false,
            actual: false
        }
    );
    assert!(!backend.is_device_enabled(TOUCH_ID));
    // Siblings sharing the hardware id prefix are untouched
    assert!(backend.is_device_enabled(PEN_ID));

    controller.primary_click();
    assert!(backend.is_device_enabled(TOUCH_ID));
    assert_eq!(controller.icon_state(), IconState::Enabled);
}

#[test]
fn test_unplug_and_replug() {
    let dir = tempfile::tempdir().unwrap();
    let backend = laptop();
    let mut controller = DeviceController::new(&backend, Settings::load(config_in(&dir)));
    controller.refresh_devices();
    assert_eq!(controller.controlled_id(), Some(TOUCH_ID));

    backend.remove_device(TOUCH_ID);
    controller.refresh_devices();
    assert_eq!(controller.selection(), Selection::NoDevice);
    assert_eq!(controller.icon_state(), IconState::NoDevice);
    assert!(config_in(&dir).load().unwrap().controlled_device_id.is_empty());

    backend.add_device(TOUCH_ID, "HID-compliant touch screen", false);
    controller.refresh_devices();
    assert_eq!(controller.controlled_id(), Some(TOUCH_ID));
    assert_eq!(controller.icon_state(), IconState::Disabled);
}

#[test]
fn test_manual_pick_of_undetectable_device() {
    let backend = MemoryBackend::new();
    backend.add_device("HID\\VID_2386&PID_4328\\1", "I2C HID Device", true);
    backend.add_device(KEYBOARD_ID, "HID Keyboard Device", true);
    let store = MemoryStore::default();
    let mut controller = DeviceController::new(&backend, Settings::load(&store));

    let menu = controller.refresh_devices();
    assert!(menu.items.iter().all(|i| !i.checked));
    assert_eq!(
        controller.primary_click().outcome,
        ClickOutcome::NeedsSelection
    );

    assert_eq!(
        controller.pick_device("HID\\VID_2386&PID_4328\\1"),
        [Notice::Tutorial]
    );
    controller.primary_click();
    assert!(!backend.is_device_enabled("HID\\VID_2386&PID_4328\\1"));
    assert_eq!(store.stored().controlled_device_id, "HID\\VID_2386&PID_4328\\1");
}

#[test]
fn test_corrupt_settings_file_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), "{ not json").unwrap();
    let backend = laptop();

    let mut controller = DeviceController::new(&backend, Settings::load(config_in(&dir)));
    assert_eq!(controller.selection(), Selection::NoDevice);

    controller.refresh_devices();
    assert_eq!(
        config_in(&dir).load().unwrap().controlled_device_id,
        TOUCH_ID
    );
}

#[test]
fn test_unwritable_settings_keep_selection_in_memory() {
    let backend = laptop();
    let store = MemoryStore::default();
    store.set_fail_saves(true);
    let mut controller = DeviceController::new(&backend, Settings::load(&store));

    controller.pick_device(KEYBOARD_ID);

    assert_eq!(controller.controlled_id(), Some(KEYBOARD_ID));
    assert!(store.stored().controlled_device_id.is_empty());
}

#[test]
fn test_through_worker_thread() {
    let backend = laptop();
    let worker_backend = backend.clone();
    let worker =
        DeviceWorker::spawn(move || Ok(worker_backend), Duration::from_secs(5)).unwrap();
    let store = MemoryStore::default();
    let mut controller = DeviceController::new(worker, Settings::load(&store));

    controller.refresh_devices();
    controller.primary_click();

    assert!(!backend.is_device_enabled(TOUCH_ID));
    assert_eq!(controller.icon_state(), IconState::Disabled);
}

#[test]
fn test_hung_device_stack_degrades_to_disabled() {
    let backend = laptop();
    backend.set_delay(Some(Duration::from_millis(300)));
    let worker_backend = backend.clone();
    let worker =
        DeviceWorker::spawn(move || Ok(worker_backend), Duration::from_millis(50)).unwrap();
    let store = MemoryStore::with_config(AppConfig {
        controlled_device_id: TOUCH_ID.to_string(),
        ..AppConfig::default()
    });
    let mut controller = DeviceController::new(worker, Settings::load(&store));

    let menu = controller.refresh_devices();
    assert!(menu.items.is_empty());
    assert!(menu.error.is_some());
    // A failed enumeration doesn't clear the selection
    assert_eq!(controller.controlled_id(), Some(TOUCH_ID));

    let report = controller.primary_click();
    assert_eq!(
        report.outcome,
        ClickOutcome::Toggled {
            intended: true,
            actual: false
        }
    );
    assert!(matches!(report.notices.as_slice(), [Notice::ControlFailed(_)]));
}
