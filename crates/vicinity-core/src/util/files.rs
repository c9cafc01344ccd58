//! File utilities shared by the persistence layers.
//!
//! Every persisted artifact goes through [`write_atomic`]: contents land in
//! a temporary file in the destination directory and are renamed over the
//! target, so a concurrent reader sees either the old file or the new one.

use std::io::Write;
use std::path::Path;

use crate::{Error, Result};

/// Write `contents` to `path` atomically.
///
/// Creates the parent directory when missing.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;

    let mut tmp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::io_with_path(e, parent))?;
    tmp.write_all(contents)
        .map_err(|e| Error::io_with_path(e, tmp.path()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io_with_path(e, tmp.path()))?;
    tmp.persist(path)
        .map_err(|e| Error::io_with_path(e.error, path))?;

    log::debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Read a whole file, attaching the path to any error.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::io_with_path(e, path))
}

/// Read a whole UTF-8 file, attaching the path to any error.
pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))
}
