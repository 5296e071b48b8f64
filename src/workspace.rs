//! Scratch space for one freeze run.
//!
//! Holds the two working copies of the deck and the rasterized pages in a
//! temporary folder that disappears when the `Workspace` is dropped. A
//! `.key` deck is either a flat file or a package directory; both are
//! copied as-is.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const KEYNOTE_EXTENSION: &str = "key";

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("input deck {0} does not exist")]
    MissingInput(PathBuf),
    #[error("{0} is not a Keynote deck (expected a .key file)")]
    NotKeynote(PathBuf),
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl WorkspaceError {
    fn io(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> WorkspaceError {
        let path = path.to_path_buf();
        move |source| WorkspaceError::Io {
            action,
            path,
            source,
        }
    }
}

/// Checks that `input` is an existing `.key` deck and returns its absolute path.
pub fn resolve_input(input: &Path) -> Result<PathBuf, WorkspaceError> {
    if !input.exists() {
        return Err(WorkspaceError::MissingInput(input.to_path_buf()));
    }
    let is_key = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(KEYNOTE_EXTENSION));
    if !is_key {
        return Err(WorkspaceError::NotKeynote(input.to_path_buf()));
    }
    fs::canonicalize(input).map_err(WorkspaceError::io("cannot resolve", input))
}

/// `<dir>/<stem>-frozen.key` next to the input.
pub fn default_output(input: &Path) -> PathBuf {
    let stem = deck_stem(input);
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{stem}-frozen.{KEYNOTE_EXTENSION}"))
}

fn deck_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "deck".to_string())
}

pub struct Workspace {
    dir: TempDir,
    input: PathBuf,
}

impl Workspace {
    pub fn new(input: &Path) -> Result<Self, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix("keynote-freezer-")
            .tempdir()
            .map_err(WorkspaceError::io("cannot create temp folder", &std::env::temp_dir()))?;
        log::debug!("workspace: temp folder {}", dir.path().display());
        Ok(Workspace {
            dir,
            input: input.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copies the input deck to `<temp>/<stem>-<suffix>.key`.
    pub fn copy_deck(&self, suffix: &str) -> Result<PathBuf, WorkspaceError> {
        let target = self
            .path()
            .join(format!("{}-{suffix}.{KEYNOTE_EXTENSION}", deck_stem(&self.input)));
        remove_path(&target)?;
        copy_path(&self.input, &target)?;
        log::debug!("workspace: copied deck to {}", target.display());
        Ok(target)
    }

    /// Folder the pages of `export` are written to: `<temp>/<export stem>`.
    pub fn pages_dir(&self, export: &Path) -> PathBuf {
        self.path().join(deck_stem(export))
    }
}

/// Moves the finished deck to `out`, replacing whatever is there.
///
/// An existing output is set aside first and only removed once the new
/// deck is in place; if the move fails it is put back.
pub fn deliver(deck: &Path, out: &Path) -> Result<(), WorkspaceError> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(WorkspaceError::io("cannot create", parent))?;
    }

    let backup = if fs::symlink_metadata(out).is_ok() {
        let backup = backup_path(out);
        remove_path(&backup)?;
        fs::rename(out, &backup).map_err(WorkspaceError::io("cannot set aside", out))?;
        log::warn!("workspace: replacing existing {}", out.display());
        Some(backup)
    } else {
        None
    };

    match move_path(deck, out) {
        Ok(()) => match backup {
            Some(backup) => remove_path(&backup),
            None => Ok(()),
        },
        Err(e) => {
            if let Some(backup) = backup {
                restore(&backup, out);
            }
            Err(e)
        }
    }
}

/// `<dir>/.<name>.previous`, next to `out`.
fn backup_path(out: &Path) -> PathBuf {
    let name = out
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    out.with_file_name(format!(".{name}.previous"))
}

fn restore(backup: &Path, out: &Path) {
    let restored = remove_path(out).and_then(|()| {
        fs::rename(backup, out).map_err(WorkspaceError::io("cannot restore", backup))
    });
    match restored {
        Ok(()) => log::debug!("workspace: restored previous {}", out.display()),
        Err(e) => log::error!("workspace: previous output left at {}: {e}", backup.display()),
    }
}

fn move_path(from: &Path, to: &Path) -> Result<(), WorkspaceError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        // Cross-device moves (temp folder on another volume) need a copy.
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            log::debug!("workspace: rename failed ({e}), copying instead");
            copy_path(from, to)?;
            remove_path(from)
        }
        Err(e) => Err(WorkspaceError::io("cannot move", from)(e)),
    }
}

/// PNG slide images in `dir`, ordered by file name.
///
/// Keynote numbers exported slide images with zero-padded counters, so name
/// order is slide order.
pub fn collect_slide_images(dir: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    let entries = fs::read_dir(dir).map_err(WorkspaceError::io("cannot list", dir))?;
    let mut images = Vec::new();
    for entry in entries {
        let path = entry.map_err(WorkspaceError::io("cannot list", dir))?.path();
        let is_png = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn remove_path(path: &Path) -> Result<(), WorkspaceError> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(WorkspaceError::io("cannot remove", path))
}

/// Copies a file, or a directory tree, following symlinks.
fn copy_path(from: &Path, to: &Path) -> Result<(), WorkspaceError> {
    let meta = fs::metadata(from).map_err(WorkspaceError::io("cannot read", from))?;
    if !meta.is_dir() {
        fs::copy(from, to).map_err(WorkspaceError::io("cannot copy", from))?;
        return Ok(());
    }
    fs::create_dir_all(to).map_err(WorkspaceError::io("cannot create", to))?;
    let entries = fs::read_dir(from).map_err(WorkspaceError::io("cannot list", from))?;
    for entry in entries {
        let entry = entry.map_err(WorkspaceError::io("cannot list", from))?;
        copy_path(&entry.path(), &to.join(entry.file_name()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output(Path::new("/talks/intro.key")),
            PathBuf::from("/talks/intro-frozen.key")
        );
    }

    #[test]
    fn resolve_rejects_missing_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.key");
        assert!(matches!(
            resolve_input(&missing),
            Err(WorkspaceError::MissingInput(_))
        ));

        let pptx = dir.path().join("deck.pptx");
        fs::write(&pptx, b"x").unwrap();
        assert!(matches!(
            resolve_input(&pptx),
            Err(WorkspaceError::NotKeynote(_))
        ));

        let key = dir.path().join("deck.KEY");
        fs::write(&key, b"x").unwrap();
        assert!(resolve_input(&key).unwrap().is_absolute());
    }

    #[test]
    fn copies_flat_deck_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("talk.key");
        fs::write(&input, b"deck-bytes").unwrap();

        let ws = Workspace::new(&input).unwrap();
        let copy = ws.copy_deck("text").unwrap();
        assert_eq!(copy.file_name().unwrap(), "talk-text.key");
        assert_eq!(fs::read(&copy).unwrap(), b"deck-bytes");

        // A second copy replaces the first.
        fs::write(&copy, b"edited").unwrap();
        let again = ws.copy_deck("text").unwrap();
        assert_eq!(fs::read(again).unwrap(), b"deck-bytes");
    }

    #[test]
    fn copies_package_deck_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("talk.key");
        fs::create_dir_all(input.join("Data")).unwrap();
        fs::write(input.join("Index.zip"), b"index").unwrap();
        fs::write(input.join("Data").join("image.png"), b"png").unwrap();

        let ws = Workspace::new(&input).unwrap();
        let copy = ws.copy_deck("pdf").unwrap();
        assert_eq!(fs::read(copy.join("Index.zip")).unwrap(), b"index");
        assert_eq!(fs::read(copy.join("Data").join("image.png")).unwrap(), b"png");
    }

    #[test]
    fn pages_dir_is_named_after_export() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("talk.key");
        fs::write(&input, b"x").unwrap();
        let ws = Workspace::new(&input).unwrap();
        assert_eq!(
            ws.pages_dir(&ws.path().join("talk-pdf.pdf")),
            ws.path().join("talk-pdf")
        );
    }

    #[test]
    fn temp_folder_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("talk.key");
        fs::write(&input, b"x").unwrap();
        let ws = Workspace::new(&input).unwrap();
        let temp = ws.path().to_path_buf();
        assert!(temp.exists());
        drop(ws);
        assert!(!temp.exists());
    }

    #[test]
    fn slide_images_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["talk.003.png", "talk.001.PNG", "talk.002.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let images = collect_slide_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["talk.001.PNG", "talk.002.png", "talk.003.png"]);
    }

    #[test]
    fn deliver_replaces_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("talk-text.key");
        fs::write(&deck, b"new").unwrap();
        let out = dir.path().join("out").join("talk-frozen.key");
        fs::create_dir_all(&out).unwrap();

        deliver(&deck, &out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"new");
        assert!(!deck.exists());
    }

    #[test]
    fn failed_delivery_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("talk-text.key");
        let out = dir.path().join("talk-frozen.key");
        fs::write(&out, b"previous").unwrap();

        assert!(deliver(&missing, &out).is_err());
        assert_eq!(fs::read(&out).unwrap(), b"previous");
        assert!(!backup_path(&out).exists());
    }

    #[test]
    fn successful_delivery_removes_set_aside_output() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("talk-text.key");
        fs::write(&deck, b"new").unwrap();
        let out = dir.path().join("talk-frozen.key");
        fs::write(&out, b"previous").unwrap();

        deliver(&deck, &out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"new");
        assert_eq!(
            backup_path(&out),
            dir.path().join(".talk-frozen.key.previous")
        );
        assert!(!backup_path(&out).exists());
    }
}
