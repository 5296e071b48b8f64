//! macOS action executor via CGEventPost.
//!
//! `MacOSExecutor` implements `ActionExecutor`. Injection is synchronous:
//! `CGEventPost` delivers the event before returning, so no background thread
//! is needed. Modifiers travel as event flags on the key event itself, which
//! is what Keynote's menu shortcuts match on.

use std::ffi::c_void;

use super::keycodes::keycode_to_vkcode;
use crate::platform::{Action, ActionExecutor, KeyCode, KeyState, Modifiers, PlatformError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// CGEventTapLocation: kCGSessionEventTap -- post into the login session.
const CG_SESSION_EVENT_TAP: u32 = 1;

/// kCGEventSourceStateHIDSystemState = 1 -- use the real HID hardware state.
const CG_EVENT_SOURCE_STATE_HID_SYSTEM_STATE: i32 = 1;

/// CGEventFlags bits (CGEventTypes.h).
const CG_EVENT_FLAG_MASK_SHIFT: u64 = 0x0002_0000;
const CG_EVENT_FLAG_MASK_CONTROL: u64 = 0x0004_0000;
const CG_EVENT_FLAG_MASK_ALTERNATE: u64 = 0x0008_0000;
const CG_EVENT_FLAG_MASK_COMMAND: u64 = 0x0010_0000;

// ---------------------------------------------------------------------------
// Raw FFI
// ---------------------------------------------------------------------------

type CGEventRef = *mut c_void;
type CGEventSourceRef = *mut c_void;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn CGEventSourceCreate(state_id: i32) -> CGEventSourceRef;
    fn CGEventCreateKeyboardEvent(
        source: CGEventSourceRef,
        virtual_key: u16,
        key_down: bool,
    ) -> CGEventRef;
    fn CGEventSetFlags(event: CGEventRef, flags: u64);
    fn CGEventPost(tap_location: u32, event: CGEventRef);
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFRelease(cf: *const c_void);
}

// ---------------------------------------------------------------------------
// Public struct
// ---------------------------------------------------------------------------

/// Injects keyboard events via CGEventPost on macOS.
///
/// Stateless: each key event is created, posted, and released immediately.
pub struct MacOSExecutor;

impl MacOSExecutor {
    /// Fails with `Unavailable` when the process has no Accessibility grant.
    /// Without it, posted events are dropped silently.
    pub fn new() -> Result<Self, PlatformError> {
        // SAFETY: AXIsProcessTrusted takes no arguments and has no preconditions.
        if !unsafe { AXIsProcessTrusted() } {
            return Err(PlatformError::Unavailable(
                "Accessibility permission missing. Grant it in System Settings > \
                 Privacy & Security > Accessibility, or use keystrokes = \"system-events\""
                    .into(),
            ));
        }
        Ok(MacOSExecutor)
    }

    fn post(
        &self,
        key: KeyCode,
        state: KeyState,
        modifiers: Modifiers,
    ) -> Result<(), PlatformError> {
        let vkcode = keycode_to_vkcode(key);
        let key_down = state == KeyState::Down;
        let inject_start = std::time::Instant::now();

        unsafe {
            let source = CGEventSourceCreate(CG_EVENT_SOURCE_STATE_HID_SYSTEM_STATE);
            if source.is_null() {
                return Err(PlatformError::Other(
                    "CGEventSourceCreate returned null".into(),
                ));
            }

            let event = CGEventCreateKeyboardEvent(source, vkcode, key_down);
            if event.is_null() {
                CFRelease(source.cast::<c_void>());
                return Err(PlatformError::Other(
                    "CGEventCreateKeyboardEvent returned null".into(),
                ));
            }

            CGEventSetFlags(event, event_flags(modifiers));
            CGEventPost(CG_SESSION_EVENT_TAP, event);
            CFRelease(event.cast::<c_void>());
            CFRelease(source.cast::<c_void>());
        }

        log::debug!(
            "executor: injected {:?} {:?} {:?} in {:.2}ms",
            key,
            state,
            modifiers,
            inject_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ActionExecutor trait impl
// ---------------------------------------------------------------------------

impl ActionExecutor for MacOSExecutor {
    fn execute(&self, action: &Action) -> Result<(), PlatformError> {
        let Action::InjectKey {
            key,
            state,
            modifiers,
        } = action;
        self.post(*key, *state, *modifiers)
    }
}

/// CGEventFlags for a set of held modifiers.
fn event_flags(modifiers: Modifiers) -> u64 {
    let mut flags = 0;
    if modifiers.command {
        flags |= CG_EVENT_FLAG_MASK_COMMAND;
    }
    if modifiers.shift {
        flags |= CG_EVENT_FLAG_MASK_SHIFT;
    }
    if modifiers.option {
        flags |= CG_EVENT_FLAG_MASK_ALTERNATE;
    }
    if modifiers.control {
        flags |= CG_EVENT_FLAG_MASK_CONTROL;
    }
    flags
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_modifiers_means_no_flags() {
        assert_eq!(event_flags(Modifiers::default()), 0);
    }

    #[test]
    fn send_to_back_sets_command_and_shift() {
        let mods = Modifiers {
            command: true,
            shift: true,
            ..Modifiers::default()
        };
        assert_eq!(event_flags(mods), 0x0012_0000);
    }
}
