//! Splits an exported deck PDF into one file per slide.

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::Document;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("cannot prepare {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot read PDF {path}: {source}")]
    Load { path: PathBuf, source: lopdf::Error },
    #[error("cannot write page {page} to {path}: {reason}")]
    Save {
        page: u32,
        path: PathBuf,
        reason: String,
    },
    #[error("{0} has no pages")]
    Empty(PathBuf),
}

/// File name of page `page` (1-based): `0001.pdf`, `0002.pdf`, ...
pub fn page_file_name(page: u32) -> String {
    format!("{page:04}.pdf")
}

/// Writes every page of `pdf` to its own document inside `out_dir`.
///
/// `out_dir` is recreated empty first. Returns the page files in page order.
pub fn split_pages(pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, PdfError> {
    let source = Document::load(pdf).map_err(|source| PdfError::Load {
        path: pdf.to_path_buf(),
        source,
    })?;

    let page_count = source.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PdfError::Empty(pdf.to_path_buf()));
    }

    reset_dir(out_dir)?;

    let mut paths = Vec::with_capacity(page_count as usize);
    for page in 1..=page_count {
        let path = out_dir.join(page_file_name(page));
        let mut single = extract_page(&source, page, page_count);
        single.save(&path).map_err(|e| PdfError::Save {
            page,
            path: path.clone(),
            reason: e.to_string(),
        })?;
        paths.push(path);
    }

    log::info!(
        "pdf: split {} into {} page(s) under {}",
        pdf.display(),
        page_count,
        out_dir.display()
    );
    Ok(paths)
}

/// A copy of `source` holding only `keep`, with orphaned objects dropped.
fn extract_page(source: &Document, keep: u32, page_count: u32) -> Document {
    let mut doc = source.clone();
    let others: Vec<u32> = (1..=page_count).filter(|p| *p != keep).collect();
    doc.delete_pages(&others);
    doc.prune_objects();
    doc.renumber_objects();
    doc
}

fn reset_dir(dir: &Path) -> Result<(), PdfError> {
    let io_err = |source| PdfError::Io {
        path: dir.to_path_buf(),
        source,
    };
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(io_err)?;
    }
    fs::create_dir_all(dir).map_err(io_err)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{dictionary, Object, Stream};

    /// Builds a PDF whose page `i` draws the marker text `page-{i}`.
    pub(crate) fn write_sample_pdf(path: &Path, pages: usize) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for i in 1..=pages {
            let content = format!("BT /F1 12 Tf 72 720 Td (page-{i}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1024),
                    Object::Integer(768),
                ],
            });
            kids.push(page_id.into());
        }
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages as i64),
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn page_text(path: &Path) -> String {
        let doc = Document::load(path).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1, "{} should hold one page", path.display());
        let page_id = *pages.values().next().unwrap();
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
    }

    #[test]
    fn page_names_are_zero_padded() {
        assert_eq!(page_file_name(1), "0001.pdf");
        assert_eq!(page_file_name(123), "0123.pdf");
    }

    #[test]
    fn splits_into_single_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("deck.pdf");
        write_sample_pdf(&deck, 3);

        let out = dir.path().join("deck");
        let pages = split_pages(&deck, &out).unwrap();

        assert_eq!(pages.len(), 3);
        for (i, path) in pages.iter().enumerate() {
            assert_eq!(path, &out.join(page_file_name(i as u32 + 1)));
            assert!(page_text(path).contains(&format!("page-{}", i + 1)));
        }
    }

    #[test]
    fn stale_pages_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("deck.pdf");
        write_sample_pdf(&deck, 1);

        let out = dir.path().join("deck");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("0002.pdf"), b"stale").unwrap();

        split_pages(&deck, &out).unwrap();
        assert!(!out.join("0002.pdf").exists());
        assert!(out.join("0001.pdf").exists());
    }

    #[test]
    fn empty_pdf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("empty.pdf");
        write_sample_pdf(&deck, 0);

        let err = split_pages(&deck, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, PdfError::Empty(_)));
    }

    #[test]
    fn garbage_input_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("junk.pdf");
        fs::write(&deck, b"not a pdf").unwrap();

        let err = split_pages(&deck, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, PdfError::Load { .. }));
    }
}
