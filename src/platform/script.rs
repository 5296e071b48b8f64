//! `osascript`-backed platform services.
//!
//! `SystemEventsExecutor` types shortcuts through the `System Events`
//! `keystroke` command, which needs Automation permission for the calling
//! terminal but no Accessibility grant of its own. `ScriptPasteboard` loads
//! a file's bytes onto the general pasteboard with a typed `read`.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use crate::osascript::{self, Script};
use crate::platform::{
    Action, ActionExecutor, ClipboardKind, KeyState, Modifiers, Pasteboard, PlatformError,
};

const KEYSTROKE: Script = Script::applescript(
    "keystroke",
    r#"on run argv
    set theKey to item 1 of argv
    set mods to {}
    if (item 2 of argv) is "1" then set end of mods to command down
    if (item 3 of argv) is "1" then set end of mods to shift down
    if (item 4 of argv) is "1" then set end of mods to option down
    if (item 5 of argv) is "1" then set end of mods to control down
    tell application "System Events" to keystroke theKey using mods
end run"#,
);

const SET_CLIPBOARD: Script = Script::applescript(
    "set-clipboard",
    r#"on run argv
    set src to POSIX file (item 1 of argv)
    if (item 2 of argv) is "png" then
        set the clipboard to (read src as «class PNGf»)
    else
        set the clipboard to (read src as «class PDF »)
    end if
end run"#,
);

/// Wait for the clipboard script; reading a page file is quick.
const CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Keystrokes
// ---------------------------------------------------------------------------

/// Sends shortcuts via `tell application "System Events" to keystroke`.
///
/// A keystroke is atomic here, so key-down carries the whole shortcut and
/// key-up is a no-op.
pub struct SystemEventsExecutor {
    timeout: Duration,
}

impl SystemEventsExecutor {
    pub fn with_timeout(timeout: Duration) -> Self {
        SystemEventsExecutor { timeout }
    }

    fn keystroke(&self, key: char, modifiers: Modifiers) -> Result<(), PlatformError> {
        osascript::run(&KEYSTROKE, keystroke_args(key, modifiers), self.timeout)?;
        log::debug!("executor: keystroke {:?} {:?}", key, modifiers);
        Ok(())
    }
}

impl ActionExecutor for SystemEventsExecutor {
    fn execute(&self, action: &Action) -> Result<(), PlatformError> {
        match action {
            Action::InjectKey {
                key,
                state: KeyState::Down,
                modifiers,
            } => self.keystroke(key.as_char(), *modifiers),
            Action::InjectKey {
                state: KeyState::Up, ..
            } => Ok(()),
        }
    }
}

fn keystroke_args(key: char, modifiers: Modifiers) -> [String; 5] {
    let flag = |on: bool| String::from(if on { "1" } else { "0" });
    [
        key.to_string(),
        flag(modifiers.command),
        flag(modifiers.shift),
        flag(modifiers.option),
        flag(modifiers.control),
    ]
}

// ---------------------------------------------------------------------------
// Pasteboard
// ---------------------------------------------------------------------------

/// Loads file contents onto the general pasteboard through AppleScript.
pub struct ScriptPasteboard {
    timeout: Duration,
}

impl ScriptPasteboard {
    pub fn new() -> Self {
        ScriptPasteboard {
            timeout: CLIPBOARD_TIMEOUT,
        }
    }
}

impl Default for ScriptPasteboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Pasteboard for ScriptPasteboard {
    fn set_from_file(&self, path: &Path, kind: ClipboardKind) -> Result<(), PlatformError> {
        let kind_arg = match kind {
            ClipboardKind::Pdf => "pdf",
            ClipboardKind::Png => "png",
        };
        osascript::run(
            &SET_CLIPBOARD,
            [path.as_os_str(), OsStr::new(kind_arg)],
            self.timeout,
        )?;
        log::debug!("pasteboard: loaded {} as {}", path.display(), kind_arg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystroke_args_encode_modifier_flags() {
        let mods = Modifiers {
            command: true,
            shift: true,
            ..Modifiers::default()
        };
        assert_eq!(keystroke_args('b', mods), ["b", "1", "1", "0", "0"]);
    }

    #[test]
    fn key_up_is_a_noop() {
        let executor = SystemEventsExecutor::with_timeout(Duration::from_millis(1));
        let action = Action::InjectKey {
            key: crate::platform::KeyCode::V,
            state: KeyState::Up,
            modifiers: Modifiers::default(),
        };
        assert!(executor.execute(&action).is_ok());
    }

    #[test]
    fn clipboard_script_reads_typed_data() {
        assert!(SET_CLIPBOARD.source.contains("«class PDF »"));
        assert!(SET_CLIPBOARD.source.contains("«class PNGf»"));
    }
}
