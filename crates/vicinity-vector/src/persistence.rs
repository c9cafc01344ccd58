//! The persisted index image.
//!
//! An image is a directory holding two artifacts: `vectors.idx` (the
//! binary vector blob) and `chunks.json` (the chunk store). Each file is
//! written atomically, and the blob's header carries the blake3 digest of
//! the `chunks.json` bytes it was saved with. Saving writes `chunks.json`
//! first and `vectors.idx` last, so the blob on disk always names the
//! chunks it belongs to. A load that reads the two files across a
//! concurrent save sees a digest mismatch and reads them again.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vicinity_content::ChunkStore;
use vicinity_core::{Error, Result, read_bytes, write_atomic};

use crate::codec;
use crate::index::VectorIndex;

/// File name of the vector blob.
pub const VECTORS_FILE: &str = "vectors.idx";

/// File name of the chunk list.
pub const CHUNKS_FILE: &str = "chunks.json";

/// Reads of a mismatched pair before the load gives up.
const LOAD_ATTEMPTS: usize = 12;

/// Locations of the two image artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    dir: PathBuf,
}

impl IndexPaths {
    /// Image rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The image directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `vectors.idx`.
    pub fn vectors(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    /// Path of `chunks.json`.
    pub fn chunks(&self) -> PathBuf {
        self.dir.join(CHUNKS_FILE)
    }

    /// Whether both artifacts are present.
    pub fn exists(&self) -> bool {
        self.vectors().is_file() && self.chunks().is_file()
    }
}

/// Write both artifacts.
///
/// Fails with `InvalidData` when the index and store disagree on length.
pub fn save_image(paths: &IndexPaths, index: &VectorIndex, store: &ChunkStore) -> Result<()> {
    if index.len() != store.len() {
        return Err(Error::invalid_data(format!(
            "index holds {} vectors but store holds {} chunks",
            index.len(),
            store.len()
        )));
    }
    let chunks = store.to_json()?;
    let companion = *blake3::hash(&chunks).as_bytes();
    write_atomic(&paths.chunks(), &chunks)?;
    write_atomic(&paths.vectors(), &codec::encode_paired(index, &companion))?;
    log::info!(
        "Saved index image ({} entries) to {}",
        index.len(),
        paths.dir().display()
    );
    Ok(())
}

/// Read both artifacts.
///
/// Undecodable content, count disagreement, and a `chunks.json` that is
/// not the one the blob was saved with surface as `CorruptIndex`; a
/// missing file surfaces as an I/O error.
pub fn load_image(paths: &IndexPaths) -> Result<(VectorIndex, ChunkStore)> {
    let (index, chunks) = read_pair(paths)?;

    let store = ChunkStore::from_json(&chunks)
        .map_err(|e| Error::corrupt_index(format!("{CHUNKS_FILE}: {e}")))?;

    if index.len() != store.len() {
        return Err(Error::corrupt_index(format!(
            "{VECTORS_FILE} holds {} vectors but {CHUNKS_FILE} holds {} chunks",
            index.len(),
            store.len()
        )));
    }

    log::debug!(
        "Loaded index image ({} entries, dimension {:?}) from {}",
        index.len(),
        index.dimension(),
        paths.dir().display()
    );
    Ok((index, store))
}

/// Read the blob and the chunk bytes it names.
fn read_pair(paths: &IndexPaths) -> Result<(VectorIndex, Vec<u8>)> {
    for attempt in 1..=LOAD_ATTEMPTS {
        let (index, companion) = codec::decode_paired(&read_bytes(&paths.vectors())?)?;
        let chunks = read_bytes(&paths.chunks())?;
        if blake3::hash(&chunks).as_bytes() == &companion {
            return Ok((index, chunks));
        }
        log::debug!(
            "{CHUNKS_FILE} does not match {VECTORS_FILE} in {} (attempt {attempt})",
            paths.dir().display()
        );
        std::thread::sleep(Duration::from_millis(attempt as u64));
    }
    Err(Error::corrupt_index(format!(
        "{CHUNKS_FILE} was not written with {VECTORS_FILE}"
    )))
}

// ============================================================================
// Tests
// ============================================================================
