//! Atomic artifact writes.
//!
//! Every artifact is first staged in a temporary file next to its target.
//! Only once all of them are staged are they renamed over their targets, so
//! a failure while staging leaves every existing artifact untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// A rendered artifact and where it goes.
#[derive(Debug)]
pub struct PendingWrite {
    pub path: PathBuf,
    pub contents: String,
}

/// A fully written temporary file waiting to replace its target.
struct Staged<'a> {
    write: &'a PendingWrite,
    file: NamedTempFile,
}

/// Write every artifact. Call only once all of them rendered.
///
/// Files that already hold their contents are left untouched.
pub fn write_all(pending: &[PendingWrite]) -> Result<(), String> {
    let mut staged = Vec::with_capacity(pending.len());
    for write in pending {
        if let Some(file) = stage(&write.path, &write.contents)? {
            staged.push(Staged { write, file });
        }
    }

    for Staged { write, file } in staged {
        let path = &write.path;
        file.persist(path)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e.error))?;
        tracing::info!(path = %path.display(), bytes = write.contents.len(), "wrote artifact");
    }
    Ok(())
}

/// Write `contents` to a temporary file in the directory of `path`.
///
/// `None` when `path` already holds `contents`.
fn stage(path: &Path, contents: &str) -> Result<Option<NamedTempFile>, String> {
    if path.is_dir() {
        return Err(format!("Failed to write '{}': it is a directory", path.display()));
    }
    if std::fs::read_to_string(path).is_ok_and(|existing| existing == contents) {
        tracing::debug!(path = %path.display(), "artifact unchanged");
        return Ok(None);
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create directory '{}': {}", dir.display(), e))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| format!("Failed to create a temporary file in '{}': {}", dir.display(), e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|()| tmp.flush())
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    Ok(Some(tmp))
}
