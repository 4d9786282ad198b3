//! Error types for `HandsOff`
//!
//! Every public device operation returns one of these instead of letting an
//! OS-layer failure reach the tray event loop. Variants use `#[source]` to
//! preserve error chains for the log file.

use std::time::Duration;
use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `HandsOff`
#[derive(Debug, Error)]
pub enum HandsOffError {
    /// Enumeration or status query against the OS device tree failed
    #[error("Device query failed: {0}")]
    QueryFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No device matched the identifier when a state change was attempted
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The process lacks the rights to change device state
    #[error("Permission denied while changing device state: {0}")]
    PermissionDenied(String),

    /// The persisted controlled device no longer resolves to a present device
    #[error("Controlled device is no longer present: {0}")]
    StaleSelection(String),

    /// Any other failure reported by the device manager
    #[error("Device control failed: {0}")]
    DeviceControlFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The device backend did not answer in time
    #[error("Device backend did not respond within {0:?}")]
    Timeout(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Launch-on-startup task could not be queried or changed
    #[error("Startup registration failed: {0}")]
    StartupRegistrationFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Windows API error
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApiError(#[from] windows::core::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for `HandsOff` operations
pub type Result<T> = std::result::Result<T, HandsOffError>;

/// Convert an error to a message suitable for a tray notification
pub fn get_user_friendly_error(error: &HandsOffError) -> String {
    match error {
        HandsOffError::QueryFailed(_) => "Unable to read the device list.\n\
             The controlled device is shown as disabled until the next successful query."
            .to_string(),
        HandsOffError::DeviceNotFound(id) => {
            format!(
                "The controlled device could not be found:\n{id}\n\
                 It may have been unplugged. Right-click the icon to pick another device."
            )
        }
        HandsOffError::PermissionDenied(_) => "Windows refused to change the device state.\n\
             Run HandsOff as administrator, or enable \"Launch on startup\" \
             so it starts with the required rights."
            .to_string(),
        HandsOffError::StaleSelection(_) => "The previously selected device is no longer present.\n\
             Right-click the icon to select the controlled device."
            .to_string(),
        HandsOffError::DeviceControlFailed(e) => {
            format!("The device manager reported an error:\n{e}")
        }
        HandsOffError::Timeout(duration) => {
            format!(
                "The device manager did not respond within {} ms.\n\
                 The icon will refresh on the next click.",
                duration.as_millis()
            )
        }
        HandsOffError::ConfigError(_) | HandsOffError::JsonError(_) => {
            "Failed to load or save settings.\n\
             Your device selection may not persist.\n\
             Check that you have write permissions to:\n\
             %APPDATA%\\HandsOff"
                .to_string()
        }
        HandsOffError::StartupRegistrationFailed(_) => {
            "Unable to change the launch-on-startup task.\n\
             Changing scheduled tasks with highest privileges requires administrator rights."
                .to_string()
        }
        #[cfg(windows)]
        HandsOffError::WindowsApiError(e) => {
            format!(
                "A Windows API error occurred:\n\n{e}\n\n\
                 Please ensure your Windows installation is up to date."
            )
        }
        HandsOffError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = HandsOffError::DeviceNotFound("HID\\VID_04F3&PID_2A1C".to_string());
        assert_eq!(error.to_string(), "Device not found: HID\\VID_04F3&PID_2A1C");
    }

    #[test]
    fn test_query_failed_keeps_source() {
        use std::error::Error as _;

        let error = HandsOffError::QueryFailed(StringError::new("WMI unavailable"));
        assert_eq!(error.to_string(), "Device query failed: WMI unavailable");
        assert_eq!(
            error.source().map(ToString::to_string).as_deref(),
            Some("WMI unavailable")
        );
    }

    #[test]
    fn test_timeout_display() {
        let error = HandsOffError::Timeout(Duration::from_millis(1500));
        assert_eq!(
            error.to_string(),
            "Device backend did not respond within 1.5s"
        );
        assert!(get_user_friendly_error(&error).contains("1500 ms"));
    }

    #[test]
    fn test_permission_denied_user_friendly() {
        let error = HandsOffError::PermissionDenied("access denied".to_string());
        let message = get_user_friendly_error(&error);
        assert!(message.contains("administrator"));
    }

    #[test]
    fn test_device_not_found_user_friendly() {
        let error = HandsOffError::DeviceNotFound("HID\\X".to_string());
        let message = get_user_friendly_error(&error);
        assert!(message.contains("HID\\X"));
        assert!(message.contains("unplugged"));
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: HandsOffError = io_error.into();
        assert!(matches!(error, HandsOffError::IoError(_)));
    }
}
