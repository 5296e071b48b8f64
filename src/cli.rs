//! Command-line arguments, layered over the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, ConfigError, RasterFormat};
use crate::fonts::FontAllowList;

/// Freeze a Keynote deck: keep text in the listed fonts editable and turn
/// everything else into one background page per slide.
#[derive(Parser, Debug)]
#[command(name = "keynote-freezer", author, version, about, long_about = None)]
pub struct Args {
    /// Keynote deck to freeze (.key)
    pub input: PathBuf,

    /// Font families kept as text, comma-separated (default: Roboto)
    #[arg(short, long, value_name = "LIST")]
    pub fonts: Option<String>,

    /// Output deck (default: <input>-frozen.key next to the input)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// How non-text content is rasterized
    #[arg(short, long, value_enum)]
    pub raster: Option<RasterFormat>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Loads the config file (if any) and applies the flags on top.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(fonts) = &self.fonts {
            config.fonts = FontAllowList::parse(fonts).families().to_vec();
        }
        if let Some(raster) = self.raster {
            config.raster = raster;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let argv = std::iter::once("keynote-freezer").chain(args.iter().copied());
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn bare_input_uses_defaults() {
        let args = parse(&["talk.key"]);
        assert_eq!(args.input, PathBuf::from("talk.key"));
        assert!(args.out.is_none());
        assert_eq!(args.resolve_config().unwrap(), Config::default());
    }

    #[test]
    fn fonts_are_comma_separated() {
        let args = parse(&["talk.key", "--fonts", "Roboto,Inter"]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.fonts, ["Roboto", "Inter"]);
    }

    #[test]
    fn blank_font_entries_are_dropped() {
        let args = parse(&["talk.key", "--fonts", " Roboto, ,Inter,"]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.fonts, ["Roboto", "Inter"]);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freezer.toml");
        std::fs::write(&path, "fonts = [\"Inter\"]\nraster = \"png\"\n").unwrap();

        let args = parse(&[
            "talk.key",
            "--config",
            path.to_str().unwrap(),
            "--raster",
            "pdf",
        ]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.fonts, ["Inter"]);
        assert_eq!(config.raster, RasterFormat::Pdf);
    }

    #[test]
    fn input_is_required() {
        assert!(Args::try_parse_from(["keynote-freezer"]).is_err());
    }
}
