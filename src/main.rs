//! `HandsOff` - touchscreen on/off switch for the Windows notification area

// Set Windows subsystem to hide console window
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// GUI module is only in the binary, not the library
mod gui;

use anyhow::{Context, Result};
use handsoff::utils;
use tracing::{error, info};

/// Main entry point for the application
///
/// Initialises logging, enforces a single instance, starts the device backend
/// worker and runs the tray until the user quits.
fn main() -> Result<()> {
    utils::init_logging().context("Failed to initialize logging system")?;

    info!("HandsOff v{} starting...", env!("CARGO_PKG_VERSION"));

    let _single_instance_guard = match utils::SingleInstanceGuard::new() {
        Ok(guard) => guard,
        Err(e) => {
            error!("Single instance check failed: {}", e);
            show_error_and_exit(
                "Another instance of HandsOff is already running.\n\n\
                 Check the notification area for the HandsOff icon.",
            );
            return Err(e.into());
        }
    };

    info!("Single instance check passed");

    run_tray()?;

    info!("HandsOff shutting down");
    Ok(())
}

/// Build the controller over the Windows backend and hand it to the tray
#[cfg(windows)]
fn run_tray() -> Result<()> {
    use handsoff::config::{ConfigManager, Settings};
    use handsoff::controller::DeviceController;
    use handsoff::device::{DeviceWorker, WindowsDeviceBackend};
    use handsoff::error::{HandsOffError, get_user_friendly_error};
    use handsoff::utils::TaskSchedulerAutoStart;

    let settings = Settings::load(ConfigManager::new());
    let timeout = settings.preferences().query_timeout();
    info!("Device query timeout: {:?}", timeout);

    let worker = DeviceWorker::spawn(WindowsDeviceBackend::new, timeout)
        .context("Failed to start device backend worker")?;
    let controller = DeviceController::new(worker, settings);

    let tray = match gui::TrayApp::new(controller, TaskSchedulerAutoStart)
        .context("Failed to create tray icon")
    {
        Ok(tray) => tray,
        Err(e) => {
            error!("Failed to initialize tray: {:#}", e);
            let message = match e.downcast_ref::<HandsOffError>() {
                Some(handsoff_error) => get_user_friendly_error(handsoff_error),
                None => format!("{e:#}"),
            };
            show_error_and_exit(&format!("Failed to start HandsOff:\n\n{message}"));
            return Err(e);
        }
    };

    info!("Starting tray event loop");
    tray.run().context("Tray event loop terminated with error")?;
    Ok(())
}

#[cfg(not(windows))]
fn run_tray() -> Result<()> {
    eprintln!("HandsOff is a Windows-only application.");
    anyhow::bail!("the device manager backend is only available on Windows")
}

/// Shows an error dialog and exits the application.
#[cfg(windows)]
fn show_error_and_exit(message: &str) {
    use rfd::MessageDialog;

    MessageDialog::new()
        .set_title("HandsOff - Error")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .set_level(rfd::MessageLevel::Error)
        .show();

    std::process::exit(1);
}

/// Shows an error dialog and exits the application (non-Windows fallback).
#[cfg(not(windows))]
fn show_error_and_exit(message: &str) {
    eprintln!("ERROR: {message}");
    std::process::exit(1);
}
