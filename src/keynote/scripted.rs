//! `Keynote` over Apple Events, via JavaScript for Automation.
//!
//! Every operation is one short JXA program. Documents are looked up by id
//! on each call, so nothing is held between calls and a script that dies
//! leaves no dangling state behind on this side.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::{DocumentId, ExportFormat, Keynote, KeynoteError};
use crate::cleanup::{ItemClass, ItemKind, ItemRef, Placeholder, SlideItem};
use crate::osascript::{self, Script};

/// Prepends the helpers every Keynote script uses.
macro_rules! keynote_script {
    ($name:literal, $body:literal) => {
        Script::jxa(
            $name,
            concat!(
                "const app = Application('Keynote');\n",
                "function doc(id) { return app.documents.byId(id); }\n",
                "function slide(id, i) { return doc(id).slides[Number(i)]; }\n",
                $body
            ),
        )
    };
}

const ACTIVATE: Script = keynote_script!(
    "activate",
    "function run(argv) { app.activate(); return ''; }"
);

const OPEN: Script = keynote_script!(
    "open",
    r#"function run(argv) {
    const opened = app.open(Path(argv[0]));
    const d = Array.isArray(opened) ? opened[0] : opened;
    return JSON.stringify(d.id());
}"#
);

const SLIDE_COUNT: Script = keynote_script!(
    "slide-count",
    "function run(argv) { return JSON.stringify(doc(argv[0]).slides.length); }"
);

const SHOW_SLIDE: Script = keynote_script!(
    "show-slide",
    r#"function run(argv) {
    doc(argv[0]).currentSlide = slide(argv[0], argv[1]);
    return '';
}"#
);

const SLIDE_ITEMS: Script = keynote_script!(
    "slide-items",
    r#"function describe(kind, items) {
    return items.map(function (item, index) {
        let font = null;
        try { font = item.objectText.font(); } catch (e) {}
        let locked = false;
        try { locked = item.locked(); } catch (e) {}
        const shown = Automation.getDisplayString(item);
        let placeholder = null;
        if (shown.indexOf('defaultTitleItem') >= 0) placeholder = 'title';
        else if (shown.indexOf('defaultBodyItem') >= 0) placeholder = 'body';
        return { kind: kind, index: index, font: font, locked: locked, placeholder: placeholder };
    });
}
function run(argv) {
    const s = slide(argv[0], argv[1]);
    return JSON.stringify(describe('text_item', s.textItems()).concat(describe('shape', s.shapes())));
}"#
);

const HIDE_PLACEHOLDER: Script = keynote_script!(
    "hide-placeholder",
    r#"function run(argv) {
    const s = slide(argv[0], argv[1]);
    const prop = argv[2] === 'title' ? 'titleShowing' : 'bodyShowing';
    if (!s[prop]()) return JSON.stringify(false);
    s[prop] = false;
    return JSON.stringify(true);
}"#
);

const DELETE_ITEM: Script = keynote_script!(
    "delete-item",
    r#"function run(argv) {
    const s = slide(argv[0], argv[1]);
    const items = argv[2] === 'shape' ? s.shapes : s.textItems;
    items[Number(argv[3])].delete();
    return '';
}"#
);

const DELETE_ALL: Script = keynote_script!(
    "delete-all",
    r#"function run(argv) {
    const items = slide(argv[0], argv[1])[argv[2]]();
    for (let i = items.length - 1; i >= 0; i--) items[i].delete();
    return JSON.stringify(items.length);
}"#
);

const IMAGE_COUNT: Script = keynote_script!(
    "image-count",
    "function run(argv) { return JSON.stringify(slide(argv[0], argv[1]).images.length); }"
);

const SELECT_IMAGE: Script = keynote_script!(
    "select-image",
    r#"function run(argv) {
    doc(argv[0]).selection = [slide(argv[0], argv[1]).images[Number(argv[2])]];
    return '';
}"#
);

const EXPORT: Script = keynote_script!(
    "export",
    r#"function run(argv) {
    const d = doc(argv[0]);
    if (argv[2] === 'pdf') {
        app.export(d, { to: Path(argv[1]), as: 'PDF',
            withProperties: { PDFImageQuality: argv[3], skippedSlides: true } });
    } else {
        app.export(d, { to: Path(argv[1]), as: 'slide images',
            withProperties: { imageFormat: 'PNG', skippedSlides: true } });
    }
    return '';
}"#
);

const CLOSE: Script = keynote_script!(
    "close",
    r#"function run(argv) {
    doc(argv[0]).close({ saving: argv[1] });
    return '';
}"#
);

// ---------------------------------------------------------------------------
// Argument encoding
// ---------------------------------------------------------------------------

fn kind_arg(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::TextItem => "text_item",
        ItemKind::Shape => "shape",
    }
}

fn placeholder_arg(placeholder: Placeholder) -> &'static str {
    match placeholder {
        Placeholder::Title => "title",
        Placeholder::Body => "body",
    }
}

/// The JXA element collection name for `class`.
fn class_arg(class: ItemClass) -> &'static str {
    match class {
        ItemClass::Charts => "charts",
        ItemClass::Images => "images",
        ItemClass::Groups => "groups",
        ItemClass::Lines => "lines",
        ItemClass::Tables => "tables",
    }
}

fn export_args(doc: &DocumentId, to: &Path, format: ExportFormat) -> Vec<String> {
    let to = to.to_string_lossy().into_owned();
    match format {
        ExportFormat::Pdf { quality } => vec![
            doc.0.clone(),
            to,
            "pdf".into(),
            quality.as_keynote().into(),
        ],
        ExportFormat::SlideImages => vec![doc.0.clone(), to, "images".into(), String::new()],
    }
}

fn decode<T: DeserializeOwned>(script: &Script, reply: &str) -> Result<T, KeynoteError> {
    serde_json::from_str(reply).map_err(|e| KeynoteError::Reply {
        script: script.name,
        reason: format!("{e} in {reply:?}"),
    })
}

// ---------------------------------------------------------------------------
// ScriptedKeynote
// ---------------------------------------------------------------------------

/// Drives the running Keynote app through `osascript`.
pub struct ScriptedKeynote {
    script_timeout: Duration,
    export_timeout: Duration,
}

impl ScriptedKeynote {
    pub fn new(script_timeout: Duration, export_timeout: Duration) -> Self {
        ScriptedKeynote {
            script_timeout,
            export_timeout,
        }
    }

    fn run(&self, script: &Script, args: &[&str]) -> Result<String, KeynoteError> {
        Ok(osascript::run(script, args, self.script_timeout)?)
    }

    fn query<T: DeserializeOwned>(
        &self,
        script: &Script,
        args: &[&str],
    ) -> Result<T, KeynoteError> {
        let reply = self.run(script, args)?;
        decode(script, &reply)
    }
}

impl Keynote for ScriptedKeynote {
    fn activate(&self) -> Result<(), KeynoteError> {
        self.run(&ACTIVATE, &[])?;
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<DocumentId, KeynoteError> {
        let path = path.to_string_lossy();
        let id: String = self.query(&OPEN, &[&path])?;
        log::debug!("keynote: opened {} as {}", path, id);
        Ok(DocumentId(id))
    }

    fn slide_count(&self, doc: &DocumentId) -> Result<usize, KeynoteError> {
        self.query(&SLIDE_COUNT, &[&doc.0])
    }

    fn show_slide(&self, doc: &DocumentId, slide: usize) -> Result<(), KeynoteError> {
        self.run(&SHOW_SLIDE, &[&doc.0, &slide.to_string()])?;
        Ok(())
    }

    fn slide_items(&self, doc: &DocumentId, slide: usize) -> Result<Vec<SlideItem>, KeynoteError> {
        self.query(&SLIDE_ITEMS, &[&doc.0, &slide.to_string()])
    }

    fn hide_placeholder(
        &self,
        doc: &DocumentId,
        slide: usize,
        placeholder: Placeholder,
    ) -> Result<bool, KeynoteError> {
        self.query(
            &HIDE_PLACEHOLDER,
            &[&doc.0, &slide.to_string(), placeholder_arg(placeholder)],
        )
    }

    fn delete_item(
        &self,
        doc: &DocumentId,
        slide: usize,
        item: ItemRef,
    ) -> Result<(), KeynoteError> {
        self.run(
            &DELETE_ITEM,
            &[
                &doc.0,
                &slide.to_string(),
                kind_arg(item.kind),
                &item.index.to_string(),
            ],
        )?;
        Ok(())
    }

    fn delete_all(
        &self,
        doc: &DocumentId,
        slide: usize,
        class: ItemClass,
    ) -> Result<usize, KeynoteError> {
        self.query(&DELETE_ALL, &[&doc.0, &slide.to_string(), class_arg(class)])
    }

    fn image_count(&self, doc: &DocumentId, slide: usize) -> Result<usize, KeynoteError> {
        self.query(&IMAGE_COUNT, &[&doc.0, &slide.to_string()])
    }

    fn select_image(
        &self,
        doc: &DocumentId,
        slide: usize,
        index: usize,
    ) -> Result<(), KeynoteError> {
        self.run(
            &SELECT_IMAGE,
            &[&doc.0, &slide.to_string(), &index.to_string()],
        )?;
        Ok(())
    }

    fn export(
        &self,
        doc: &DocumentId,
        to: &Path,
        format: ExportFormat,
    ) -> Result<(), KeynoteError> {
        let started = std::time::Instant::now();
        osascript::run(&EXPORT, export_args(doc, to, format), self.export_timeout)?;
        log::info!(
            "keynote: exported {} to {} in {:.1}s",
            doc,
            to.display(),
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn close(&self, doc: &DocumentId, saving: bool) -> Result<(), KeynoteError> {
        self.run(&CLOSE, &[&doc.0, if saving { "yes" } else { "no" }])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PdfImageQuality;

    #[test]
    fn scripts_carry_the_shared_helpers() {
        for script in [&OPEN, &SLIDE_ITEMS, &DELETE_ALL, &EXPORT, &CLOSE] {
            assert!(script.source.starts_with("const app = Application('Keynote');"));
            assert!(script.source.contains("function run(argv)"));
        }
    }

    #[test]
    fn placeholder_detection_uses_display_strings() {
        assert!(SLIDE_ITEMS.source.contains("defaultTitleItem"));
        assert!(SLIDE_ITEMS.source.contains("defaultBodyItem"));
        assert!(SLIDE_ITEMS.source.contains("'text_item'"));
        assert!(SLIDE_ITEMS.source.contains("'shape'"));
    }

    #[test]
    fn export_includes_skipped_slides() {
        assert_eq!(EXPORT.source.matches("skippedSlides: true").count(), 2);
        assert!(!EXPORT.source.contains("skippedSlides: false"));
    }

    #[test]
    fn export_args_select_format() {
        let doc = DocumentId("ABC".into());
        let to = Path::new("/tmp/deck-pdf.pdf");
        assert_eq!(
            export_args(&doc, to, ExportFormat::Pdf { quality: PdfImageQuality::Best }),
            ["ABC", "/tmp/deck-pdf.pdf", "pdf", "Best"]
        );
        assert_eq!(
            export_args(&doc, to, ExportFormat::SlideImages)[2],
            "images"
        );
    }

    #[test]
    fn collection_names_match_jxa() {
        let names: Vec<_> = ItemClass::ALL.iter().map(|c| class_arg(*c)).collect();
        assert_eq!(names, ["charts", "images", "groups", "lines", "tables"]);
    }

    #[test]
    fn decode_reports_script_name() {
        let err = decode::<usize>(&SLIDE_COUNT, "not json").unwrap_err();
        match err {
            KeynoteError::Reply { script, .. } => assert_eq!(script, "slide-count"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn decode_reads_listing_and_scalars() {
        let items: Vec<SlideItem> = decode(
            &SLIDE_ITEMS,
            r#"[{"kind":"shape","index":0,"font":"Roboto-Bold","locked":false,"placeholder":null}]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(decode::<usize>(&IMAGE_COUNT, "3").unwrap(), 3);
        assert!(decode::<bool>(&HIDE_PLACEHOLDER, "true").unwrap());
        assert_eq!(decode::<String>(&OPEN, r#""doc-id""#).unwrap(), "doc-id");
    }
}
