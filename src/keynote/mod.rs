//! Bridge to the Keynote application.
//!
//! `Keynote` is the seam between the freeze pipeline and the host app: the
//! pipeline only ever asks for slide listings and issues edits through it.
//! `ScriptedKeynote` is the real implementation, driving Keynote over Apple
//! Events with JavaScript for Automation.
//!
//! Slides and items are addressed by 0-based index. Item indices are only
//! stable until the next deletion on the same slide.

mod scripted;

use std::fmt;
use std::path::Path;

use crate::cleanup::{ItemClass, ItemRef, Placeholder, SlideItem};
use crate::config::PdfImageQuality;
use crate::osascript::ScriptError;

pub use scripted::ScriptedKeynote;

#[derive(Debug, thiserror::Error)]
pub enum KeynoteError {
    #[error("Keynote scripting failed: {0}")]
    Script(#[from] ScriptError),
    #[error("unexpected reply from `{script}`: {reason}")]
    Reply { script: &'static str, reason: String },
}

/// Keynote's own identifier for an open document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// A single PDF, skipped slides included.
    Pdf { quality: PdfImageQuality },
    /// One PNG per slide written into a folder, skipped slides included.
    SlideImages,
}

/// Operations the freeze pipeline needs from Keynote.
pub trait Keynote {
    /// Brings Keynote to the front so keystrokes reach it.
    fn activate(&self) -> Result<(), KeynoteError>;

    fn open(&self, path: &Path) -> Result<DocumentId, KeynoteError>;

    fn slide_count(&self, doc: &DocumentId) -> Result<usize, KeynoteError>;

    /// Makes `slide` the current slide of `doc`.
    fn show_slide(&self, doc: &DocumentId, slide: usize) -> Result<(), KeynoteError>;

    /// Text items and shapes on `slide`, with their fonts.
    fn slide_items(&self, doc: &DocumentId, slide: usize) -> Result<Vec<SlideItem>, KeynoteError>;

    /// Turns off the placeholder if it is showing. Returns whether it was.
    fn hide_placeholder(
        &self,
        doc: &DocumentId,
        slide: usize,
        placeholder: Placeholder,
    ) -> Result<bool, KeynoteError>;

    fn delete_item(
        &self,
        doc: &DocumentId,
        slide: usize,
        item: ItemRef,
    ) -> Result<(), KeynoteError>;

    /// Deletes every member of `class` on `slide`. Returns how many went.
    fn delete_all(
        &self,
        doc: &DocumentId,
        slide: usize,
        class: ItemClass,
    ) -> Result<usize, KeynoteError>;

    fn image_count(&self, doc: &DocumentId, slide: usize) -> Result<usize, KeynoteError>;

    /// Makes image `index` of `slide` the sole selection.
    fn select_image(
        &self,
        doc: &DocumentId,
        slide: usize,
        index: usize,
    ) -> Result<(), KeynoteError>;

    fn export(&self, doc: &DocumentId, to: &Path, format: ExportFormat) -> Result<(), KeynoteError>;

    fn close(&self, doc: &DocumentId, saving: bool) -> Result<(), KeynoteError>;
}
