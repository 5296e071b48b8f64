//! Runs AppleScript and JavaScript for Automation through `osascript`.
//!
//! Script source goes to the child's stdin (`osascript -`), arguments go to
//! its argv and arrive in the script's `run` handler. Nothing the caller
//! passes is ever spliced into script text, so paths with quotes or
//! backslashes need no escaping.

use std::ffi::OsStr;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running script is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    AppleScript,
    JavaScript,
}

impl Language {
    fn as_arg(self) -> &'static str {
        match self {
            Language::AppleScript => "AppleScript",
            Language::JavaScript => "JavaScript",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("osascript is not available on this system")]
    Unavailable,
    #[error("failed to run osascript: {0}")]
    Io(#[from] std::io::Error),
    #[error("script `{name}` timed out after {after:?}")]
    Timeout { name: &'static str, after: Duration },
    #[error("script `{name}` failed ({status}): {stderr}")]
    Failed {
        name: &'static str,
        status: String,
        stderr: String,
    },
}

/// A script plus the name it is logged under.
#[derive(Debug, Clone, Copy)]
pub struct Script {
    pub name: &'static str,
    pub language: Language,
    pub source: &'static str,
}

impl Script {
    pub const fn jxa(name: &'static str, source: &'static str) -> Self {
        Script {
            name,
            language: Language::JavaScript,
            source,
        }
    }

    pub const fn applescript(name: &'static str, source: &'static str) -> Self {
        Script {
            name,
            language: Language::AppleScript,
            source,
        }
    }
}

/// Runs `script` with `args` and returns its trimmed stdout.
///
/// The child is killed if it has not exited within `timeout`.
pub fn run<I, S>(script: &Script, args: I, timeout: Duration) -> Result<String, ScriptError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let started = Instant::now();
    let mut child = Command::new("osascript")
        .arg("-l")
        .arg(script.language.as_arg())
        .arg("-")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScriptError::Unavailable,
            _ => ScriptError::Io(e),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(script.source.as_bytes())?;
        // Dropping stdin closes the pipe so osascript starts executing.
    }

    // Pipes are drained off-thread; a full pipe buffer blocks the child.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            log::warn!("osascript: `{}` exceeded {:?}, killing it", script.name, timeout);
            let _ = child.kill();
            let _ = child.wait();
            return Err(ScriptError::Timeout {
                name: script.name,
                after: timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout.map(join_drain).unwrap_or_default();
    let stderr = stderr.map(join_drain).unwrap_or_default();

    log::debug!(
        "osascript: `{}` finished with {} in {:.1}ms",
        script.name,
        status,
        started.elapsed().as_secs_f64() * 1000.0
    );

    if !status.success() {
        return Err(ScriptError::Failed {
            name: script.name,
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(stdout.trim().to_string())
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_drain(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_flags_match_osascript_names() {
        assert_eq!(Language::AppleScript.as_arg(), "AppleScript");
        assert_eq!(Language::JavaScript.as_arg(), "JavaScript");
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn missing_osascript_reports_unavailable() {
        let script = Script::applescript("noop", "return 1");
        let result = run(&script, Vec::<&str>::new(), Duration::from_secs(1));
        assert!(matches!(result, Err(ScriptError::Unavailable)));
    }
}
