//! `KeyCode` -> macOS virtual key code (CGKeyCode, u16).
//!
//! Key codes are physical key positions per Apple HIToolbox/Events.h.
//! They are layout-independent: this mapping assumes an ANSI keyboard,
//! which is also where Keynote's menu shortcuts are defined.

use crate::platform::KeyCode;

/// Converts a `KeyCode` to the CGKeyCode posted for it.
pub fn keycode_to_vkcode(key: KeyCode) -> u16 {
    match key {
        // Letters
        KeyCode::A => 0x00,
        KeyCode::B => 0x0B,
        KeyCode::C => 0x08,
        KeyCode::D => 0x02,
        KeyCode::E => 0x0E,
        KeyCode::F => 0x03,
        KeyCode::G => 0x05,
        KeyCode::H => 0x04,
        KeyCode::I => 0x22,
        KeyCode::J => 0x26,
        KeyCode::K => 0x28,
        KeyCode::L => 0x25,
        KeyCode::M => 0x2E,
        KeyCode::N => 0x2D,
        KeyCode::O => 0x1F,
        KeyCode::P => 0x23,
        KeyCode::Q => 0x0C,
        KeyCode::R => 0x0F,
        KeyCode::S => 0x01,
        KeyCode::T => 0x11,
        KeyCode::U => 0x20,
        KeyCode::V => 0x09,
        KeyCode::W => 0x0D,
        KeyCode::X => 0x07,
        KeyCode::Y => 0x10,
        KeyCode::Z => 0x06,

        // Top-row digits
        KeyCode::Key0 => 0x1D,
        KeyCode::Key1 => 0x12,
        KeyCode::Key2 => 0x13,
        KeyCode::Key3 => 0x14,
        KeyCode::Key4 => 0x15,
        KeyCode::Key5 => 0x17,
        KeyCode::Key6 => 0x16,
        KeyCode::Key7 => 0x1A,
        KeyCode::Key8 => 0x1C,
        KeyCode::Key9 => 0x19,
    }
}
