//! Ordered chunk storage keyed by [`Handle`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use vicinity_core::{Error, Handle, Result, read_bytes, write_atomic};

use crate::chunk::Chunk;
use crate::chunker::{Chunker, SourceUnit};

/// Chunks in insertion order.
///
/// The position of a chunk is its [`Handle`]; a vector index built from
/// [`texts`](Self::texts) in the same order hands out matching handles.
#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
    by_id: HashMap<String, Handle>,
}

impl ChunkStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from chunks, rejecting duplicate ids.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self> {
        let mut store = Self::new();
        store.extend(chunks)?;
        Ok(store)
    }

    /// Append a single chunk.
    pub fn push(&mut self, chunk: Chunk) -> Result<Handle> {
        if self.by_id.contains_key(&chunk.id) {
            return Err(Error::invalid_data(format!("duplicate chunk id '{}'", chunk.id)));
        }
        let handle = Handle::try_from(self.chunks.len())?;
        self.by_id.insert(chunk.id.clone(), handle);
        self.chunks.push(chunk);
        Ok(handle)
    }

    /// Check that `chunks` could be appended: ids unique among themselves
    /// and absent from the store.
    pub fn check_new(&self, chunks: &[Chunk]) -> Result<()> {
        let mut seen = HashSet::with_capacity(chunks.len());
        for chunk in chunks {
            if self.by_id.contains_key(&chunk.id) || !seen.insert(chunk.id.as_str()) {
                return Err(Error::invalid_data(format!("duplicate chunk id '{}'", chunk.id)));
            }
        }
        Handle::try_from(self.chunks.len() + chunks.len())?;
        Ok(())
    }

    /// Append chunks as a unit: either all are added or none.
    pub fn extend(&mut self, chunks: Vec<Chunk>) -> Result<Vec<Handle>> {
        self.check_new(&chunks)?;
        chunks.into_iter().map(|c| self.push(c)).collect()
    }

    /// Chunk `units` and append the result, returning the new chunks.
    pub fn ingest<I>(&mut self, chunker: &Chunker, units: I) -> Result<&[Chunk]>
    where
        I: IntoIterator<Item = SourceUnit>,
    {
        let start = self.chunks.len();
        let chunks = chunker.chunk_all(units);
        log::debug!("Chunked sources into {} chunks", chunks.len());
        self.extend(chunks)?;
        Ok(&self.chunks[start..])
    }

    /// Look up a chunk by id.
    pub fn get(&self, id: &str) -> Result<&Chunk> {
        self.by_id
            .get(id)
            .map(|h| &self.chunks[h.index()])
            .ok_or_else(|| Error::not_found(format!("chunk '{id}'")))
    }

    /// Look up a chunk by handle.
    pub fn resolve(&self, handle: Handle) -> Result<&Chunk> {
        self.chunks
            .get(handle.index())
            .ok_or_else(|| Error::not_found(format!("chunk handle {handle}")))
    }

    /// The handle of a chunk id.
    pub fn handle_of(&self, id: &str) -> Option<Handle> {
        self.by_id.get(id).copied()
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate chunks in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// All chunks in handle order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Chunk texts in handle order.
    pub fn texts(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }

    /// The store as pretty JSON array bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.chunks)?)
    }

    /// Parse bytes produced by [`to_json`](Self::to_json).
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let chunks: Vec<Chunk> = serde_json::from_slice(bytes)?;
        Self::from_chunks(chunks)
    }

    /// Write the store as a JSON array.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_json()?)
    }

    /// Read a store written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&read_bytes(path)?)
    }
}

impl<'a> IntoIterator for &'a ChunkStore {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
