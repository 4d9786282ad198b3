//! One-shot help and error messages shown as tray notifications

use crate::error::{HandsOffError, get_user_friendly_error};

/// Text shown when there is no controlled device
pub const SELECT_DEVICE_TEXT: &str =
    "Touchscreen not found. Right-click this icon to select the controlled device manually.";

/// Text shown once after a device becomes controlled for the first time
pub const TUTORIAL_TEXT: &str =
    "Simply click or tap this icon to toggle your touchscreen. Right-click for options.";

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No controlled device; point at the device menu
    SelectDevice,
    /// First-run hint on how to use the icon
    Tutorial,
    /// Device state can't be changed without elevation
    PermissionDenied(String),
    /// Any other failed state change
    ControlFailed(String),
}

impl Notice {
    /// Notice for a failed state change
    pub fn from_error(error: &HandsOffError) -> Self {
        let message = get_user_friendly_error(error);
        match error {
            HandsOffError::PermissionDenied(_) => Self::PermissionDenied(message),
            _ => Self::ControlFailed(message),
        }
    }

    /// Notification title
    pub fn title(&self) -> &'static str {
        match self {
            Self::SelectDevice => "No touchscreen selected",
            Self::Tutorial => "HandsOff is running",
            Self::PermissionDenied(_) => "Administrator rights required",
            Self::ControlFailed(_) => "Could not toggle the touchscreen",
        }
    }

    /// Notification body
    pub fn message(&self) -> &str {
        match self {
            Self::SelectDevice => SELECT_DEVICE_TEXT,
            Self::Tutorial => TUTORIAL_TEXT,
            Self::PermissionDenied(message) | Self::ControlFailed(message) => message,
        }
    }

    /// Whether this is an error report rather than guidance
    pub fn is_error(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::ControlFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StringError;

    #[test]
    fn test_guidance_texts() {
        assert_eq!(Notice::SelectDevice.message(), SELECT_DEVICE_TEXT);
        assert_eq!(Notice::Tutorial.message(), TUTORIAL_TEXT);
        assert!(!Notice::Tutorial.is_error());
    }

    #[test]
    fn test_from_error_classifies_permission() {
        let notice = Notice::from_error(&HandsOffError::PermissionDenied("denied".into()));
        assert!(matches!(notice, Notice::PermissionDenied(_)));
        assert!(notice.message().contains("administrator"));
        assert!(notice.is_error());

        let notice = Notice::from_error(&HandsOffError::DeviceControlFailed(StringError::new(
            "driver refused",
        )));
        assert!(matches!(notice, Notice::ControlFailed(_)));
        assert!(notice.message().contains("driver refused"));
    }
}
