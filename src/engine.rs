//! The freeze pipeline.
//!
//! 1. Copy the deck twice into a scratch folder: a vector copy and a text copy.
//! 2. Vector copy: delete safe text from every slide, export, split into pages.
//! 3. Text copy: delete everything but safe text, then paste page `i` onto
//!    slide `i` and send it to the back.
//! 4. Save the text copy as the output and drop the scratch folder.
//!
//! Keynote is only reachable through the `Keynote`, `ActionExecutor` and
//! `Pasteboard` seams, so the whole sequence runs against fakes in tests.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::cleanup::{plan_slide, CleanupMode, Placeholder};
use crate::config::{Config, PdfImageQuality, RasterFormat, Shortcuts};
use crate::fonts::FontAllowList;
use crate::keynote::{DocumentId, ExportFormat, Keynote, KeynoteError};
use crate::pdf::{self, PdfError};
use crate::platform::{ActionExecutor, ClipboardKind, Pasteboard, PlatformError};
use crate::workspace::{self, Workspace, WorkspaceError};

/// How often the slide is re-read while waiting for a paste to land.
const PASTE_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
pub enum FreezeError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Keynote(#[from] KeynoteError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Pdf(#[from] PdfError),
    #[error("{0} has no slides")]
    EmptyDeck(PathBuf),
    #[error("rasterized {pages} page(s) but the deck has {slides} slide(s)")]
    PageCountMismatch { pages: usize, slides: usize },
}

// ---------------------------------------------------------------------------
// Settings and report
// ---------------------------------------------------------------------------

/// The parts of `Config` the pipeline reads.
#[derive(Debug, Clone)]
pub struct FreezeSettings {
    pub fonts: FontAllowList,
    pub raster: RasterFormat,
    pub pdf_image_quality: PdfImageQuality,
    pub shortcuts: Shortcuts,
    pub paste_timeout: Duration,
    pub settle: Duration,
    pub poll_interval: Duration,
}

impl FreezeSettings {
    pub fn from_config(config: &Config) -> Self {
        FreezeSettings {
            fonts: config.allow_list(),
            raster: config.raster,
            pdf_image_quality: config.pdf_image_quality,
            shortcuts: config.shortcuts.clone(),
            paste_timeout: config.timeouts.paste(),
            settle: config.timeouts.settle(),
            poll_interval: PASTE_POLL_INTERVAL,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreezeReport {
    pub output: PathBuf,
    pub slides: usize,
    pub items_deleted: usize,
    pub placeholders_hidden: usize,
    pub locked_skipped: usize,
    /// Slides whose pasted page never showed up.
    pub backgrounds_missing: usize,
}

// ---------------------------------------------------------------------------
// Freezer
// ---------------------------------------------------------------------------

pub struct Freezer<'a> {
    keynote: &'a dyn Keynote,
    executor: &'a dyn ActionExecutor,
    pasteboard: &'a dyn Pasteboard,
    settings: FreezeSettings,
}

impl<'a> Freezer<'a> {
    pub fn new(
        keynote: &'a dyn Keynote,
        executor: &'a dyn ActionExecutor,
        pasteboard: &'a dyn Pasteboard,
        settings: FreezeSettings,
    ) -> Self {
        Freezer {
            keynote,
            executor,
            pasteboard,
            settings,
        }
    }

    /// Freezes `input` into `out` (default: `<stem>-frozen.key` beside it).
    pub fn process(&self, input: &Path, out: Option<&Path>) -> Result<FreezeReport, FreezeError> {
        let input = workspace::resolve_input(input)?;
        let out = out
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workspace::default_output(&input));

        if self.settings.fonts.is_empty() {
            log::warn!("engine: font allow-list is empty, every slide will be fully rasterized");
        }
        log::info!(
            "engine: freezing {} (keeping {:?} as text)",
            input.display(),
            self.settings.fonts.families()
        );

        let ws = Workspace::new(&input)?;
        self.keynote.activate()?;

        let mut report = FreezeReport::default();
        let pages = self.process_vector_copy(&ws, &mut report)?;
        let text_copy = self.process_text_copy(&ws, &pages, &mut report)?;

        workspace::deliver(&text_copy, &out)?;
        report.output = out;

        log::info!(
            "engine: wrote {} ({} slide(s), {} item(s) deleted, {} placeholder(s) hidden)",
            report.output.display(),
            report.slides,
            report.items_deleted,
            report.placeholders_hidden
        );
        if report.locked_skipped > 0 {
            log::warn!("engine: {} locked item(s) were left in place", report.locked_skipped);
        }
        if report.backgrounds_missing > 0 {
            log::warn!(
                "engine: {} slide(s) have no background page",
                report.backgrounds_missing
            );
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Vector copy
    // -----------------------------------------------------------------------

    /// Strips safe text from the vector copy and rasterizes it. Returns one
    /// page file per slide, in slide order.
    fn process_vector_copy(
        &self,
        ws: &Workspace,
        report: &mut FreezeReport,
    ) -> Result<Vec<PathBuf>, FreezeError> {
        let path = ws.copy_deck("pdf")?;
        let doc = self.keynote.open(&path)?;
        let pages = self.rasterize(ws, &doc, &path, report);
        // The vector copy is disposable; close it whether or not export worked.
        self.close_quietly(&doc);
        pages
    }

    fn rasterize(
        &self,
        ws: &Workspace,
        doc: &DocumentId,
        path: &Path,
        report: &mut FreezeReport,
    ) -> Result<Vec<PathBuf>, FreezeError> {
        let slides = self.keynote.slide_count(doc)?;
        if slides == 0 {
            return Err(FreezeError::EmptyDeck(path.to_path_buf()));
        }
        for slide in 0..slides {
            self.clean_slide(doc, slide, CleanupMode::DropSafeText, report)?;
        }
        self.export(ws, doc, path)
    }

    fn export(
        &self,
        ws: &Workspace,
        doc: &DocumentId,
        deck: &Path,
    ) -> Result<Vec<PathBuf>, FreezeError> {
        match self.settings.raster {
            RasterFormat::Pdf => {
                let pdf_path = deck.with_extension("pdf");
                let format = ExportFormat::Pdf {
                    quality: self.settings.pdf_image_quality,
                };
                self.keynote.export(doc, &pdf_path, format)?;
                Ok(pdf::split_pages(&pdf_path, &ws.pages_dir(&pdf_path))?)
            }
            RasterFormat::Png => {
                let images_dir = ws.pages_dir(deck);
                self.keynote.export(doc, &images_dir, ExportFormat::SlideImages)?;
                Ok(workspace::collect_slide_images(&images_dir)?)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Text copy
    // -----------------------------------------------------------------------

    /// Keeps only safe text in the text copy and pastes the pages behind it.
    fn process_text_copy(
        &self,
        ws: &Workspace,
        pages: &[PathBuf],
        report: &mut FreezeReport,
    ) -> Result<PathBuf, FreezeError> {
        let path = ws.copy_deck("text")?;
        let doc = self.keynote.open(&path)?;

        self.with_document(&doc, |doc| {
            let slides = self.keynote.slide_count(doc)?;
            if slides != pages.len() {
                return Err(FreezeError::PageCountMismatch {
                    pages: pages.len(),
                    slides,
                });
            }
            for (slide, page) in pages.iter().enumerate() {
                self.clean_slide(doc, slide, CleanupMode::KeepSafeText, report)?;
                self.paste_background(doc, slide, page, report)?;
            }
            report.slides = slides;
            Ok(())
        })?;

        self.keynote.close(&doc, true)?;
        Ok(path)
    }

    fn paste_background(
        &self,
        doc: &DocumentId,
        slide: usize,
        page: &Path,
        report: &mut FreezeReport,
    ) -> Result<(), FreezeError> {
        let kind = match self.settings.raster {
            RasterFormat::Pdf => ClipboardKind::Pdf,
            RasterFormat::Png => ClipboardKind::Png,
        };

        self.keynote.show_slide(doc, slide)?;
        let before = self.keynote.image_count(doc, slide)?;
        self.pasteboard.set_from_file(page, kind)?;
        self.executor.send_shortcut(&self.settings.shortcuts.paste)?;

        if !self.wait_for_image(doc, slide, before)? {
            log::warn!(
                "engine: slide {} never received {}, leaving it without a background",
                slide + 1,
                page.display()
            );
            report.backgrounds_missing += 1;
            return Ok(());
        }

        // Pasted items are appended, so the new page is the last image.
        self.keynote.select_image(doc, slide, before)?;
        self.executor.send_shortcut(&self.settings.shortcuts.send_to_back)?;
        thread::sleep(self.settings.settle);
        log::debug!("engine: slide {} background set from {}", slide + 1, page.display());
        Ok(())
    }

    /// Polls until `slide` has more than `before` images or the paste timeout
    /// runs out. Returns whether the image arrived.
    fn wait_for_image(
        &self,
        doc: &DocumentId,
        slide: usize,
        before: usize,
    ) -> Result<bool, FreezeError> {
        let started = Instant::now();
        loop {
            if self.keynote.image_count(doc, slide)? > before {
                return Ok(true);
            }
            if started.elapsed() >= self.settings.paste_timeout {
                return Ok(false);
            }
            thread::sleep(self.settings.poll_interval);
        }
    }

    // -----------------------------------------------------------------------
    // Shared steps
    // -----------------------------------------------------------------------

    /// Applies the cleanup plan for `mode` to one slide.
    ///
    /// Index-addressed deletions run first, in descending order. Hiding a
    /// placeholder removes it from the text items and would shift indices.
    fn clean_slide(
        &self,
        doc: &DocumentId,
        slide: usize,
        mode: CleanupMode,
        report: &mut FreezeReport,
    ) -> Result<(), FreezeError> {
        self.keynote.show_slide(doc, slide)?;
        let items = self.keynote.slide_items(doc, slide)?;
        let plan = plan_slide(&items, mode, &self.settings.fonts);
        report.locked_skipped += plan.locked_skipped;

        if plan.is_empty() {
            log::debug!("engine: slide {} ({:?}): nothing to remove", slide + 1, mode);
            return Ok(());
        }

        for item in &plan.delete {
            self.keynote.delete_item(doc, slide, *item)?;
        }
        report.items_deleted += plan.delete.len();

        for (wanted, placeholder) in [
            (plan.hide_title, Placeholder::Title),
            (plan.hide_body, Placeholder::Body),
        ] {
            if wanted && self.keynote.hide_placeholder(doc, slide, placeholder)? {
                report.placeholders_hidden += 1;
            }
        }

        for class in &plan.delete_all {
            report.items_deleted += self.keynote.delete_all(doc, slide, *class)?;
        }

        log::debug!(
            "engine: slide {} ({:?}): {} item(s) listed, plan {:?}",
            slide + 1,
            mode,
            items.len(),
            plan
        );
        Ok(())
    }

    /// Runs `f`; if it fails, closes `doc` unsaved before passing the error on.
    fn with_document<T>(
        &self,
        doc: &DocumentId,
        f: impl FnOnce(&DocumentId) -> Result<T, FreezeError>,
    ) -> Result<T, FreezeError> {
        f(doc).map_err(|e| {
            self.close_quietly(doc);
            e
        })
    }

    /// Closes `doc` without saving, logging instead of failing.
    fn close_quietly(&self, doc: &DocumentId) {
        if let Err(e) = self.keynote.close(doc, false) {
            log::warn!("engine: could not close document {}: {}", doc, e);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
