//! Exact nearest-neighbor index over a flat `f32` buffer.
//!
//! Vectors are stored row-major in one contiguous buffer; the position of
//! a row is its [`Handle`]. Search is a brute-force squared-Euclidean scan,
//! parallelized with rayon once the index holds [`PARALLEL_THRESHOLD`]
//! vectors. The result ordering is identical on both paths.

use std::cmp::Ordering;

use rayon::prelude::*;
use vicinity_core::{Error, Handle, Result};

use crate::codec;
use crate::types::Neighbor;

/// Vector count at which the distance pass switches to rayon.
pub const PARALLEL_THRESHOLD: usize = 4096;

/// Flat, growable exact L2 index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimension: Option<usize>,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create an index whose dimension is fixed by the first vector added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index with a fixed dimension.
    pub fn with_dimension(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::dimension_mismatch(1, 0));
        }
        Ok(Self {
            dimension: Some(dimension),
            data: Vec::new(),
        })
    }

    pub(crate) fn from_parts(dimension: Option<usize>, data: Vec<f32>) -> Self {
        Self { dimension, data }
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        match self.dimension {
            Some(d) => self.data.len() / d,
            None => 0,
        }
    }

    /// Whether no vectors are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The established dimension, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// The stored vector at `handle`.
    pub fn vector(&self, handle: Handle) -> Option<&[f32]> {
        let d = self.dimension?;
        let start = handle.index().checked_mul(d)?;
        self.data.get(start..start + d)
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    /// Append vectors, returning their handles in order.
    ///
    /// The batch is validated before anything is appended: on error the
    /// index is unchanged.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Vec<Handle>> {
        let Some(first) = vectors.first() else {
            return Ok(Vec::new());
        };
        let dimension = match self.dimension {
            Some(d) => d,
            None if first.is_empty() => return Err(Error::dimension_mismatch(1, 0)),
            None => first.len(),
        };
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(Error::dimension_mismatch(dimension, bad.len()));
        }

        let start = self.len();
        let end = start + vectors.len();
        Handle::try_from(end.saturating_sub(1))?;

        self.dimension = Some(dimension);
        self.data.reserve(vectors.len() * dimension);
        for v in vectors {
            self.data.extend_from_slice(v);
        }

        (start..end).map(Handle::try_from).collect()
    }

    /// The `k` nearest vectors to `query`, ascending by squared distance.
    ///
    /// Ties are broken by ascending handle. A `k` larger than the index
    /// returns every vector.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let dimension = match self.dimension {
            Some(d) if !self.data.is_empty() => d,
            _ => return Err(Error::EmptyIndex),
        };
        if query.len() != dimension {
            return Err(Error::dimension_mismatch(dimension, query.len()));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored = self.distances(query, dimension);
        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_distance_then_handle);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_distance_then_handle);

        scored
            .into_iter()
            .map(|(distance, pos)| Ok(Neighbor::new(Handle::try_from(pos)?, distance)))
            .collect()
    }

    fn distances(&self, query: &[f32], dimension: usize) -> Vec<(f32, usize)> {
        let rows = self.data.chunks_exact(dimension);
        if self.len() >= PARALLEL_THRESHOLD {
            self.data
                .par_chunks_exact(dimension)
                .enumerate()
                .map(|(pos, row)| (squared_l2(query, row), pos))
                .collect()
        } else {
            rows.enumerate()
                .map(|(pos, row)| (squared_l2(query, row), pos))
                .collect()
        }
    }

    /// Encode the index in the binary image format.
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(self)
    }

    /// Decode an index written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }
}

fn by_distance_then_handle(a: &(f32, usize), b: &(f32, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

// ============================================================================
// Tests
// ============================================================================
