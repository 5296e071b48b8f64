//! keynote-freezer -- keep approved-font text editable, rasterize the rest.
//!
//! Entry point: argument parsing, logging setup, and wiring the Keynote
//! bridge and platform backends into the freeze pipeline.

mod cleanup;
mod cli;
mod config;
mod engine;
mod fonts;
mod keynote;
mod osascript;
mod pdf;
mod platform;
mod workspace;

use std::process::ExitCode;

use clap::Parser;

use cli::Args;
use engine::{FreezeSettings, Freezer};
use keynote::ScriptedKeynote;

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    log::debug!("keynote-freezer v{}", env!("CARGO_PKG_VERSION"));

    let config = args.resolve_config()?;
    let timeouts = &config.timeouts;

    let keynote = ScriptedKeynote::new(timeouts.script(), timeouts.export());
    let executor = platform::create_action_executor(config.keystrokes, timeouts.keystroke())?;
    let pasteboard = platform::create_pasteboard();

    let freezer = Freezer::new(
        &keynote,
        executor.as_ref(),
        pasteboard.as_ref(),
        FreezeSettings::from_config(&config),
    );
    let report = freezer.process(&args.input, args.out.as_deref())?;
    println!("{}", report.output.display());
    Ok(())
}
