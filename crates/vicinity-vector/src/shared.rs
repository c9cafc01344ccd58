//! Thread-safe handle to a [`VectorIndex`].

use std::sync::Arc;

use parking_lot::RwLock;
use vicinity_core::{Handle, Result};

use crate::index::VectorIndex;
use crate::types::Neighbor;

/// A [`VectorIndex`] behind a single-writer, multi-reader lock.
///
/// Clones share the same index. `add` holds the write lock for the whole
/// batch, so searches see either none or all of it.
#[derive(Debug, Clone, Default)]
pub struct SharedVectorIndex {
    inner: Arc<RwLock<VectorIndex>>,
}

impl SharedVectorIndex {
    /// Wrap an index.
    pub fn new(index: VectorIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// Append vectors under the write lock.
    pub fn add(&self, vectors: &[Vec<f32>]) -> Result<Vec<Handle>> {
        self.inner.write().add(vectors)
    }

    /// Search under the read lock.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.inner.read().search(query, k)
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no vectors are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// The established dimension, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension()
    }

    /// A point-in-time copy of the index.
    pub fn snapshot(&self) -> VectorIndex {
        self.inner.read().clone()
    }

    /// Run `f` with the index read-locked.
    pub fn with_read<R>(&self, f: impl FnOnce(&VectorIndex) -> R) -> R {
        f(&self.inner.read())
    }
}

impl From<VectorIndex> for SharedVectorIndex {
    fn from(index: VectorIndex) -> Self {
        Self::new(index)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clones_share_state() {
        let shared = SharedVectorIndex::default();
        let other = shared.clone();
        shared.add(&[vec![1.0, 2.0]]).unwrap();
        assert_eq!(other.len(), 1);
        assert_eq!(other.dimension(), Some(2));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let shared = SharedVectorIndex::default();
        shared.add(&[vec![1.0]]).unwrap();
        let snapshot = shared.snapshot();
        shared.add(&[vec![2.0]]).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let shared = SharedVectorIndex::default();
        shared.add(&[vec![0.0, 0.0]]).unwrap();

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 1..=100 {
                    shared.add(&[vec![i as f32, 0.0], vec![0.0, i as f32]]).unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let hits = shared.search(&[0.0, 0.0], 3).unwrap();
                        assert_eq!(hits[0].handle, Handle::new(0));
                        // Batches land whole: the length is always odd.
                        assert_eq!(shared.len() % 2, 1);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(shared.len(), 201);
    }
}
