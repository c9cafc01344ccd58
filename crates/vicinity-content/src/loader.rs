//! Directory loading into [`SourceUnit`]s.

use std::path::{Path, PathBuf};

use tokio::fs;
use vicinity_core::{Error, Result};

use crate::chunker::SourceUnit;

/// How a file extension maps onto a source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Text,
    Table,
}

impl SourceKind {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" => Some(Self::Text),
            "csv" => Some(Self::Table),
            _ => None,
        }
    }
}

/// Loads the files of a data directory.
///
/// Only the top level is scanned. Files are visited in name order so the
/// resulting chunk handles are stable across runs.
#[derive(Debug, Clone, Default)]
pub struct SourceLoader;

impl SourceLoader {
    /// Create a loader.
    pub fn new() -> Self {
        Self
    }

    /// Load every supported file under `dir`.
    ///
    /// Hidden files and unsupported extensions are ignored. A file that
    /// cannot be read is logged and skipped.
    pub async fn load_dir(&self, dir: &Path) -> Result<Vec<SourceUnit>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| Error::io_with_path(e, dir))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io_with_path(e, dir))?
        {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|n| n.starts_with('.'));
            if hidden || !path.is_file() {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut units = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(kind) = SourceKind::from_path(&path) else {
                log::debug!("Ignoring unsupported file {}", path.display());
                continue;
            };
            let source = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            let content = match fs::read_to_string(&path).await {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("Skipping {}: {e}", path.display());
                    continue;
                }
            };

            units.push(match kind {
                SourceKind::Text => SourceUnit::text(source, content),
                SourceKind::Table => SourceUnit::table(source, content),
            });
        }

        log::info!("Loaded {} source files from {}", units.len(), dir.display());
        Ok(units)
    }
}
