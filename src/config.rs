//! Run configuration.
//!
//! Settings come from an optional TOML file; command-line flags are layered
//! on top in `cli`. Every field has a default, so an empty file (or no file)
//! reproduces the stock behaviour: keep Roboto text, rasterize to PDF.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fonts::FontAllowList;
use crate::platform::{KeyCode, Modifiers, Shortcut};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Enumerated settings
// ---------------------------------------------------------------------------

/// How the vector copy is rasterized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RasterFormat {
    /// One PDF export, split into single-page files.
    #[default]
    Pdf,
    /// One PNG per slide.
    Png,
}

/// Keynote's "Image Quality" export option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PdfImageQuality {
    Good,
    Better,
    #[default]
    Best,
}

impl PdfImageQuality {
    /// The enumerator name Keynote's scripting dictionary uses.
    pub fn as_keynote(self) -> &'static str {
        match self {
            PdfImageQuality::Good => "Good",
            PdfImageQuality::Better => "Better",
            PdfImageQuality::Best => "Best",
        }
    }
}

/// Which backend sends the paste and send-to-back shortcuts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeystrokeBackend {
    /// CGEventPost; needs Accessibility permission.
    #[default]
    #[serde(rename = "cgevent")]
    CgEvent,
    /// `System Events` keystroke through osascript.
    SystemEvents,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Any single scripting call.
    pub script_ms: u64,
    /// Exporting the vector copy.
    pub export_ms: u64,
    /// Waiting for a pasted page to appear on the slide.
    pub paste_ms: u64,
    /// One `System Events` keystroke round trip.
    pub keystroke_ms: u64,
    /// Pause after a shortcut before the next scripting call.
    pub settle_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            script_ms: 60_000,
            export_ms: 120_000,
            paste_ms: 12_000,
            keystroke_ms: 5_000,
            settle_ms: 250,
        }
    }
}

impl Timeouts {
    pub fn script(&self) -> Duration {
        Duration::from_millis(self.script_ms)
    }

    pub fn export(&self) -> Duration {
        Duration::from_millis(self.export_ms)
    }

    pub fn paste(&self) -> Duration {
        Duration::from_millis(self.paste_ms)
    }

    pub fn keystroke(&self) -> Duration {
        Duration::from_millis(self.keystroke_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Shortcuts {
    pub paste: Shortcut,
    pub send_to_back: Shortcut,
}

impl Default for Shortcuts {
    fn default() -> Self {
        let command = Modifiers {
            command: true,
            ..Modifiers::default()
        };
        Shortcuts {
            paste: Shortcut {
                modifiers: command,
                key: KeyCode::V,
            },
            send_to_back: Shortcut {
                modifiers: Modifiers {
                    shift: true,
                    ..command
                },
                key: KeyCode::B,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Font families kept as editable text.
    pub fonts: Vec<String>,
    pub raster: RasterFormat,
    pub pdf_image_quality: PdfImageQuality,
    pub keystrokes: KeystrokeBackend,
    pub timeouts: Timeouts,
    pub shortcuts: Shortcuts,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fonts: vec!["Roboto".into()],
            raster: RasterFormat::default(),
            pdf_image_quality: PdfImageQuality::default(),
            keystrokes: KeystrokeBackend::default(),
            timeouts: Timeouts::default(),
            shortcuts: Shortcuts::default(),
        }
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml(text: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Config::from_toml(&text)?;
        log::debug!("config: loaded {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timeouts;
        for (name, value) in [
            ("script_ms", t.script_ms),
            ("export_ms", t.export_ms),
            ("paste_ms", t.paste_ms),
            ("keystroke_ms", t.keystroke_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("timeouts.{name} must be > 0")));
            }
        }
        Ok(())
    }

    pub fn allow_list(&self) -> FontAllowList {
        FontAllowList::from_families(&self.fonts)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
