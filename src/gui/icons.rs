//! Tray icon images, drawn as RGBA
//!
//! A filled disc on a transparent background: green when the touchscreen is
//! enabled, grey when disabled, amber when there is nothing to toggle or
//! toggling keeps failing.

use handsoff::controller::IconState;

/// Edge length in pixels
pub const ICON_SIZE: u32 = 32;

/// Fill colour for a state
pub fn icon_color(state: IconState) -> (u8, u8, u8) {
    match state {
        IconState::Enabled => (0, 170, 68),
        IconState::Disabled => (128, 128, 128),
        IconState::NoDevice | IconState::Warning => (230, 150, 0),
    }
}

/// `ICON_SIZE`² RGBA pixels for a state
#[expect(clippy::cast_precision_loss, reason = "pixel coordinates are below 32")]
pub fn icon_rgba(state: IconState) -> Vec<u8> {
    let (r, g, b) = icon_color(state);
    let size = ICON_SIZE as usize;
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;
    let radius = ICON_SIZE as f32 / 2.0 - 1.0;

    let mut rgba = vec![0u8; size * size * 4];
    for y in 0..size {
        for x in 0..size {
            let (dx, dy) = (x as f32 - center, y as f32 - center);
            let distance = (dx * dx + dy * dy).sqrt();
            if distance > radius {
                continue;
            }

            let idx = (y * size + x) * 4;
            // Darker rim for contrast on light taskbars
            let shade = if radius - distance < 2.0 { 2 } else { 1 };
            rgba[idx] = r / shade;
            rgba[idx + 1] = g / shade;
            rgba[idx + 2] = b / shade;
            rgba[idx + 3] = 255;
        }
    }
    rgba
}

/// Hover text for a state
pub fn tooltip_text(state: IconState) -> &'static str {
    match state {
        IconState::NoDevice => "HandsOff - no touchscreen selected",
        IconState::Enabled => "HandsOff - touchscreen enabled",
        IconState::Disabled => "HandsOff - touchscreen disabled",
        IconState::Warning => "HandsOff - touchscreen can't be toggled",
    }
}

/// Tray icon for a state
#[cfg(windows)]
pub fn tray_icon(state: IconState) -> handsoff::Result<tray_icon::Icon> {
    use handsoff::error::{HandsOffError, StringError};

    tray_icon::Icon::from_rgba(icon_rgba(state), ICON_SIZE, ICON_SIZE).map_err(|e| {
        HandsOffError::ConfigError(StringError::new(format!(
            "Failed to create icon from RGBA: {e}"
        )))
    })
}
