//! macOS platform backend.
//!
//! Injection: CGEventPost (synchronous) via `MacOSExecutor`.
//!
//! Posting events requires Accessibility permission for the process that
//! launched the tool (usually the terminal). Guide the user to:
//!   System Settings > Privacy & Security > Accessibility

mod executor;
mod keycodes;

use executor::MacOSExecutor;

use crate::platform::{ActionExecutor, PlatformError};

/// Returns the CGEventPost-based action executor.
pub fn create_action_executor() -> Result<Box<dyn ActionExecutor>, PlatformError> {
    Ok(Box::new(MacOSExecutor::new()?))
}
