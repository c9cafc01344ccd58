//! Build-or-load of the persisted index image.
//!
//! A complete, decodable image whose dimension matches the embedding
//! provider is loaded as is. Anything else (missing, corrupt, built with a
//! different model) is rebuilt from the source units and written back. An
//! unusable image is never replaced by an empty build: with no chunks to
//! rebuild from, the load error is returned and the image is left alone.

use std::sync::Arc;

use chrono::Utc;
use vicinity_content::{ChunkStore, Chunker, SourceUnit};
use vicinity_core::{Error, Result};
use vicinity_vector::{EmbeddingProvider, IndexPaths, VectorIndex, embed_batched, load_image, save_image};

/// Default number of texts per embedding call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default number of embedding calls in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Result of [`IndexBuilder::build_or_load`].
#[derive(Debug, Clone)]
pub struct IndexBuild {
    /// Vectors, one per chunk.
    pub index: VectorIndex,
    /// Chunks in handle order.
    pub store: ChunkStore,
    /// Whether the image was loaded rather than rebuilt.
    pub from_cache: bool,
}

/// Turns source units into an index image.
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Chunker,
    batch_size: usize,
    concurrency: usize,
}

impl IndexBuilder {
    /// Create a builder with the default chunker and batching.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            chunker: Chunker::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Use `chunker` for source units.
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Texts per embedding call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embedding calls in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The chunker in use.
    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Load the image at `paths`, or build it from `units` and save it.
    ///
    /// The embedding provider is not called when a usable image exists.
    /// When an existing image is unusable and `units` yield no chunks, the
    /// reason (`CorruptIndex` or `DimensionMismatch`) is returned instead of
    /// overwriting the image with an empty one. I/O failures other than a
    /// missing image are returned.
    pub async fn build_or_load<I>(&self, units: I, paths: &IndexPaths) -> Result<IndexBuild>
    where
        I: IntoIterator<Item = SourceUnit>,
    {
        let stale = match self.load_cached(paths)? {
            Cached::Usable(index, store) => {
                log::info!(
                    "Loaded index image from {} ({} chunks)",
                    paths.dir().display(),
                    store.len()
                );
                return Ok(IndexBuild {
                    index,
                    store,
                    from_cache: true,
                });
            }
            Cached::Missing => None,
            Cached::Stale(reason) => Some(reason),
        };

        let store = self.chunk_units(units)?;
        if let Some(reason) = stale {
            if store.is_empty() {
                log::error!(
                    "Index image at {} is unusable and there are no sources to rebuild it from",
                    paths.dir().display()
                );
                return Err(reason);
            }
            log::warn!("Rebuilding index at {}: {reason}", paths.dir().display());
        }
        self.build_store(store, paths).await
    }

    /// Build from `units` and overwrite any image at `paths`.
    pub async fn build<I>(&self, units: I, paths: &IndexPaths) -> Result<IndexBuild>
    where
        I: IntoIterator<Item = SourceUnit>,
    {
        let store = self.chunk_units(units)?;
        self.build_store(store, paths).await
    }

    fn chunk_units<I>(&self, units: I) -> Result<ChunkStore>
    where
        I: IntoIterator<Item = SourceUnit>,
    {
        let mut store = ChunkStore::new();
        store.ingest(&self.chunker, units)?;
        Ok(store)
    }

    async fn build_store(&self, store: ChunkStore, paths: &IndexPaths) -> Result<IndexBuild> {
        let started = Utc::now();
        let index = self.embed_store(&store).await?;
        save_image(paths, &index, &store)?;

        let elapsed = Utc::now() - started;
        log::info!(
            "Built index image: {} chunks with {} in {} ms",
            store.len(),
            self.embedder.name(),
            elapsed.num_milliseconds()
        );
        Ok(IndexBuild {
            index,
            store,
            from_cache: false,
        })
    }

    /// Embed every chunk of `store` into a fresh index.
    pub async fn embed_store(&self, store: &ChunkStore) -> Result<VectorIndex> {
        let texts = store.texts();
        let vectors = embed_batched(
            self.embedder.as_ref(),
            &texts,
            self.batch_size,
            self.concurrency,
        )
        .await?;

        let mut index = match self.embedder.dimension() {
            0 => VectorIndex::new(),
            dim => VectorIndex::with_dimension(dim)?,
        };
        index.add(&vectors)?;
        Ok(index)
    }

    fn load_cached(&self, paths: &IndexPaths) -> Result<Cached> {
        if !paths.exists() {
            log::debug!("No index image at {}", paths.dir().display());
            return Ok(Cached::Missing);
        }

        let (index, store) = match load_image(paths) {
            Ok(image) => image,
            Err(e) if e.is_corrupt_index() => return Ok(Cached::Stale(e)),
            Err(e) => return Err(e),
        };

        let expected = self.embedder.dimension();
        match index.dimension() {
            Some(actual) if expected != 0 && actual != expected => {
                log::debug!(
                    "Image dimension {actual} does not match {} ({expected})",
                    self.embedder.name()
                );
                Ok(Cached::Stale(Error::dimension_mismatch(expected, actual)))
            }
            _ => Ok(Cached::Usable(index, store)),
        }
    }
}

/// State of the image on disk.
enum Cached {
    Usable(VectorIndex, ChunkStore),
    Missing,
    Stale(Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;
    use vicinity_vector::MockEmbeddingProvider;

    /// Counts calls through to a mock provider.
    struct Counting {
        inner: MockEmbeddingProvider,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(dimension: usize) -> Arc<Self> {
            Arc::new(Self {
                inner: MockEmbeddingProvider::new(dimension),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for Counting {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn units() -> Vec<SourceUnit> {
        vec![
            SourceUnit::text("routes.txt", "route 72 runs along rural road every thirty minutes"),
            SourceUnit::table("stops.csv", "stop,city\nCentral Station,Tempe\nMill Ave,Tempe\n"),
        ]
    }

    #[tokio::test]
    async fn test_first_run_builds_and_persists() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let provider = Counting::new(8);

        let build = IndexBuilder::new(provider.clone())
            .with_chunker(Chunker::new(4))
            .build_or_load(units(), &paths)
            .await
            .unwrap();

        assert!(!build.from_cache);
        assert!(paths.exists());
        assert_eq!(build.index.len(), build.store.len());
        assert_eq!(build.store.len(), 5);
        assert!(provider.calls() > 0);
    }

    #[tokio::test]
    async fn test_embedder_never_called_when_image_exists() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());

        let first = IndexBuilder::new(Counting::new(8))
            .build_or_load(units(), &paths)
            .await
            .unwrap();

        let provider = Counting::new(8);
        let second = IndexBuilder::new(provider.clone())
            .build_or_load(units(), &paths)
            .await
            .unwrap();

        assert!(second.from_cache);
        assert_eq!(provider.calls(), 0);
        assert_eq!(second.index, first.index);
        assert_eq!(second.store.chunks(), first.store.chunks());
    }

    #[tokio::test]
    async fn test_corrupt_image_is_rebuilt() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        IndexBuilder::new(Counting::new(8))
            .build_or_load(units(), &paths)
            .await
            .unwrap();

        std::fs::write(paths.vectors(), b"VCNX garbage").unwrap();

        let provider = Counting::new(8);
        let build = IndexBuilder::new(provider.clone())
            .build_or_load(units(), &paths)
            .await
            .unwrap();
        assert!(!build.from_cache);
        assert!(provider.calls() > 0);
        assert!(load_image(&paths).is_ok());
    }

    #[tokio::test]
    async fn test_dimension_change_triggers_rebuild() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        IndexBuilder::new(Counting::new(8))
            .build_or_load(units(), &paths)
            .await
            .unwrap();

        let build = IndexBuilder::new(Counting::new(12))
            .build_or_load(units(), &paths)
            .await
            .unwrap();
        assert!(!build.from_cache);
        assert_eq!(build.index.dimension(), Some(12));
    }

    #[tokio::test]
    async fn test_build_forces_rebuild() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let builder = IndexBuilder::new(Counting::new(8));
        builder.build_or_load(units(), &paths).await.unwrap();

        let rebuilt = builder
            .build(vec![SourceUnit::text("only.txt", "one chunk")], &paths)
            .await
            .unwrap();
        assert!(!rebuilt.from_cache);
        assert_eq!(rebuilt.store.len(), 1);

        let (index, store) = load_image(&paths).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(store.get("only.txt#0").unwrap().text, "one chunk");
    }

    #[tokio::test]
    async fn test_corrupt_image_kept_when_no_sources() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        IndexBuilder::new(Counting::new(8))
            .build_or_load(units(), &paths)
            .await
            .unwrap();
        std::fs::write(paths.vectors(), b"garbage").unwrap();

        let provider = Counting::new(8);
        let builder = IndexBuilder::new(provider.clone());
        let err = builder.build_or_load(Vec::new(), &paths).await.unwrap_err();
        assert!(err.is_corrupt_index());
        assert_eq!(std::fs::read(paths.vectors()).unwrap(), b"garbage");

        // Once the sources are back the image is rebuilt from them.
        let build = builder.build_or_load(units(), &paths).await.unwrap();
        assert!(!build.from_cache);
        assert_eq!(build.store.len(), 3);
        assert!(provider.calls() > 0);
        let (_, store) = load_image(&paths).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_dimension_change_without_sources_is_an_error() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        IndexBuilder::new(Counting::new(8))
            .build_or_load(units(), &paths)
            .await
            .unwrap();

        let err = IndexBuilder::new(Counting::new(12))
            .build_or_load(Vec::new(), &paths)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 12,
                actual: 8
            }
        ));
        assert_eq!(load_image(&paths).unwrap().0.dimension(), Some(8));
    }

    #[tokio::test]
    async fn test_empty_sources_build_empty_image() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let build = IndexBuilder::new(Counting::new(8))
            .build_or_load(Vec::new(), &paths)
            .await
            .unwrap();
        assert!(build.index.is_empty());
        assert!(matches!(
            build.index.search(&[0.0; 8], 3),
            Err(Error::EmptyIndex)
        ));
    }

    #[tokio::test]
    async fn test_batching_preserves_alignment() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let text = (0..50).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");

        let build = IndexBuilder::new(Counting::new(8))
            .with_chunker(Chunker::new(1))
            .with_batch_size(3)
            .with_concurrency(4)
            .build(vec![SourceUnit::text("words.txt", text)], &paths)
            .await
            .unwrap();

        let mock = MockEmbeddingProvider::new(8);
        for (i, chunk) in build.store.iter().enumerate() {
            let expected = mock.embed(&chunk.text).await.unwrap();
            let handle = build.store.handle_of(&chunk.id).unwrap();
            assert_eq!(handle.index(), i);
            assert_eq!(build.index.vector(handle).unwrap(), expected.as_slice());
        }
    }
}
