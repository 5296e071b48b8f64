//! Platform abstraction layer.
//!
//! Defines the `ActionExecutor` and `Pasteboard` traits the freeze pipeline
//! uses to paste page data into Keynote. Backends live in child modules:
//! `macos` posts CGEvents directly, `script` goes through `osascript`.

#[cfg(target_os = "macos")]
mod macos;
mod script;

use std::path::Path;
use std::time::Duration;

use crate::config::KeystrokeBackend;
use crate::osascript::ScriptError;

pub use script::{ScriptPasteboard, SystemEventsExecutor};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("platform backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShortcutError {
    #[error("empty shortcut")]
    Empty,
    #[error("unknown key or modifier {0:?}")]
    UnknownToken(String),
    #[error("shortcut {0:?} has no key")]
    MissingKey(String),
    #[error("shortcut {0:?} names more than one key")]
    TooManyKeys(String),
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Keys that can appear in a shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
}

impl KeyCode {
    const LETTERS: [KeyCode; 26] = [
        KeyCode::A, KeyCode::B, KeyCode::C, KeyCode::D, KeyCode::E, KeyCode::F,
        KeyCode::G, KeyCode::H, KeyCode::I, KeyCode::J, KeyCode::K, KeyCode::L,
        KeyCode::M, KeyCode::N, KeyCode::O, KeyCode::P, KeyCode::Q, KeyCode::R,
        KeyCode::S, KeyCode::T, KeyCode::U, KeyCode::V, KeyCode::W, KeyCode::X,
        KeyCode::Y, KeyCode::Z,
    ];

    const DIGITS: [KeyCode; 10] = [
        KeyCode::Key0, KeyCode::Key1, KeyCode::Key2, KeyCode::Key3, KeyCode::Key4,
        KeyCode::Key5, KeyCode::Key6, KeyCode::Key7, KeyCode::Key8, KeyCode::Key9,
    ];

    /// Maps a single character (case-insensitive) to its key.
    pub fn from_char(c: char) -> Option<KeyCode> {
        let c = c.to_ascii_lowercase();
        match c {
            'a'..='z' => Some(Self::LETTERS[(c as u8 - b'a') as usize]),
            '0'..='9' => Some(Self::DIGITS[(c as u8 - b'0') as usize]),
            _ => None,
        }
    }

    /// The lowercase character the key types on a US layout.
    pub fn as_char(self) -> char {
        if let Some(i) = Self::LETTERS.iter().position(|k| *k == self) {
            return (b'a' + i as u8) as char;
        }
        let i = Self::DIGITS.iter().position(|k| *k == self).unwrap_or(0);
        (b'0' + i as u8) as char
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub command: bool,
    pub shift: bool,
    pub option: bool,
    pub control: bool,
}

// ---------------------------------------------------------------------------
// Shortcuts
// ---------------------------------------------------------------------------

/// A key plus held modifiers, e.g. `cmd+shift+b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct Shortcut {
    pub modifiers: Modifiers,
    pub key: KeyCode,
}

impl Shortcut {
    /// Parses `+`-separated modifier names followed by one key.
    pub fn parse(spec: &str) -> Result<Shortcut, ShortcutError> {
        if spec.trim().is_empty() {
            return Err(ShortcutError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut key = None;

        for token in spec.split('+').map(str::trim).filter(|t| !t.is_empty()) {
            match token.to_ascii_lowercase().as_str() {
                "cmd" | "command" => modifiers.command = true,
                "shift" => modifiers.shift = true,
                "opt" | "option" | "alt" => modifiers.option = true,
                "ctrl" | "control" => modifiers.control = true,
                other => {
                    let mut chars = other.chars();
                    let parsed = match (chars.next(), chars.next()) {
                        (Some(c), None) => KeyCode::from_char(c),
                        _ => None,
                    };
                    let Some(parsed) = parsed else {
                        return Err(ShortcutError::UnknownToken(token.to_string()));
                    };
                    if key.replace(parsed).is_some() {
                        return Err(ShortcutError::TooManyKeys(spec.to_string()));
                    }
                }
            }
        }

        let key = key.ok_or_else(|| ShortcutError::MissingKey(spec.to_string()))?;
        Ok(Shortcut { modifiers, key })
    }

    /// The key-down / key-up pair that performs this shortcut.
    pub fn actions(&self) -> [Action; 2] {
        [KeyState::Down, KeyState::Up].map(|state| Action::InjectKey {
            key: self.key,
            state,
            modifiers: self.modifiers,
        })
    }
}

impl TryFrom<String> for Shortcut {
    type Error = ShortcutError;

    fn try_from(spec: String) -> Result<Self, Self::Error> {
        Shortcut::parse(&spec)
    }
}

// ---------------------------------------------------------------------------
// Actions and executors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    InjectKey {
        key: KeyCode,
        state: KeyState,
        modifiers: Modifiers,
    },
}

/// Delivers synthetic input to the frontmost application.
pub trait ActionExecutor {
    fn execute(&self, action: &Action) -> Result<(), PlatformError>;

    /// Sends a shortcut to the frontmost application.
    fn send_shortcut(&self, shortcut: &Shortcut) -> Result<(), PlatformError> {
        for action in shortcut.actions() {
            self.execute(&action)?;
        }
        Ok(())
    }
}

/// What the clipboard is loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardKind {
    Pdf,
    Png,
}

/// Write access to the general pasteboard.
pub trait Pasteboard {
    /// Replaces the pasteboard contents with the bytes of `path`.
    fn set_from_file(&self, path: &Path, kind: ClipboardKind) -> Result<(), PlatformError>;
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Returns the executor for the configured keystroke backend.
///
/// `keystroke_timeout` bounds each `System Events` round trip; CGEvent
/// posting is synchronous and needs none.
pub fn create_action_executor(
    backend: KeystrokeBackend,
    keystroke_timeout: Duration,
) -> Result<Box<dyn ActionExecutor>, PlatformError> {
    match backend {
        KeystrokeBackend::SystemEvents => {
            Ok(Box::new(SystemEventsExecutor::with_timeout(keystroke_timeout)))
        }
        #[cfg(target_os = "macos")]
        KeystrokeBackend::CgEvent => macos::create_action_executor(),
        #[cfg(not(target_os = "macos"))]
        KeystrokeBackend::CgEvent => Err(PlatformError::Unavailable(
            "CGEvent injection requires macOS".into(),
        )),
    }
}

/// Returns the pasteboard writer.
pub fn create_pasteboard() -> Box<dyn Pasteboard> {
    Box::new(ScriptPasteboard::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paste_and_send_to_back() {
        let paste = Shortcut::parse("cmd+v").unwrap();
        assert_eq!(paste.key, KeyCode::V);
        assert!(paste.modifiers.command);
        assert!(!paste.modifiers.shift);

        let back = Shortcut::parse("Command + Shift + B").unwrap();
        assert_eq!(back.key, KeyCode::B);
        assert_eq!(
            back.modifiers,
            Modifiers { command: true, shift: true, ..Modifiers::default() }
        );
    }

    #[test]
    fn rejects_malformed_shortcuts() {
        assert_eq!(Shortcut::parse(" "), Err(ShortcutError::Empty));
        assert_eq!(
            Shortcut::parse("cmd+shift"),
            Err(ShortcutError::MissingKey("cmd+shift".into()))
        );
        assert_eq!(
            Shortcut::parse("cmd+"),
            Err(ShortcutError::MissingKey("cmd+".into()))
        );
        assert_eq!(
            Shortcut::parse("cmd+a+b"),
            Err(ShortcutError::TooManyKeys("cmd+a+b".into()))
        );
        assert_eq!(
            Shortcut::parse("hyper+v"),
            Err(ShortcutError::UnknownToken("hyper".into()))
        );
        assert_eq!(
            Shortcut::parse("cmd+f1"),
            Err(ShortcutError::UnknownToken("f1".into()))
        );
    }

    #[test]
    fn key_chars_round_trip() {
        for c in ('a'..='z').chain('0'..='9') {
            assert_eq!(KeyCode::from_char(c).map(KeyCode::as_char), Some(c));
        }
        assert_eq!(KeyCode::from_char('V'), Some(KeyCode::V));
        assert_eq!(KeyCode::from_char('-'), None);
    }

    #[test]
    fn shortcut_expands_to_down_then_up() {
        let paste = Shortcut::parse("cmd+v").unwrap();
        let [down, up] = paste.actions();
        assert!(matches!(down, Action::InjectKey { state: KeyState::Down, key: KeyCode::V, .. }));
        assert!(matches!(up, Action::InjectKey { state: KeyState::Up, key: KeyCode::V, .. }));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn cgevent_backend_is_unavailable_off_macos() {
        assert!(matches!(
            create_action_executor(KeystrokeBackend::CgEvent, Duration::from_secs(1)),
            Err(PlatformError::Unavailable(_))
        ));
    }
}
