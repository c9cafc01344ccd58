//! Retrieval-augmented answering over a live index.

use std::sync::Arc;

use parking_lot::RwLock;
use vicinity_content::{Chunk, ChunkStore, Chunker, SourceUnit};
use vicinity_core::Result;
use vicinity_llm::{GenerationClient, GenerationRequest};
use vicinity_vector::{
    EmbeddingProvider, IndexPaths, Neighbor, SharedVectorIndex, embed_batched, save_image,
};

use crate::builder::{DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY, IndexBuild};

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 10;

/// Default generation model.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Build the grounded prompt for `query` over `context`.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "Use the context below to answer the question.\n\nContext:\n{context}\n\nQuestion: {query}"
    )
}

/// Embeds queries, finds their nearest chunks, and asks the generator.
///
/// The index and store are shared between clones. Lock order is always
/// store first, then index, so a reader never sees a handle the store
/// cannot resolve.
#[derive(Clone)]
pub struct RetrievalPipeline {
    index: SharedVectorIndex,
    store: Arc<RwLock<ChunkStore>>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationClient>,
    chunker: Chunker,
    model: String,
    batch_size: usize,
    concurrency: usize,
}

impl RetrievalPipeline {
    /// Create a pipeline over an aligned index and store.
    pub fn new(
        index: impl Into<SharedVectorIndex>,
        store: ChunkStore,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationClient>,
    ) -> Self {
        Self {
            index: index.into(),
            store: Arc::new(RwLock::new(store)),
            embedder,
            generator,
            chunker: Chunker::default(),
            model: DEFAULT_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Create a pipeline from a finished build.
    pub fn from_build(
        build: IndexBuild,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationClient>,
    ) -> Self {
        Self::new(build.index, build.store, embedder, generator)
    }

    /// Model name sent with generation requests.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Chunker used by [`ingest`](Self::ingest).
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Texts per embedding call during ingestion.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embedding calls in flight during ingestion.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The generation model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k` chunks nearest to `query`, closest first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        let scored = self.retrieve_scored(query, k).await?;
        Ok(scored.into_iter().map(|(chunk, _)| chunk).collect())
    }

    /// Like [`retrieve`](Self::retrieve), with each chunk's squared distance.
    pub async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<(Chunk, f32)>> {
        let embedding = self.embedder.embed(query).await?;
        self.lookup(&embedding, k)
    }

    fn lookup(&self, embedding: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>> {
        let store = self.store.read();
        let neighbors: Vec<Neighbor> = self.index.search(embedding, k)?;
        neighbors
            .iter()
            .map(|n| Ok((store.resolve(n.handle)?.clone(), n.distance)))
            .collect()
    }

    /// Answer `query` from its `k` nearest chunks.
    pub async fn answer(&self, query: &str, k: usize) -> Result<String> {
        let chunks = self.retrieve(query, k).await?;
        log::debug!("Retrieved {} chunks for question", chunks.len());

        let context = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let request = GenerationRequest::new(&self.model, build_prompt(&context, query));
        let answer = self.generator.generate(request).await?;
        Ok(answer.trim().to_string())
    }

    /// Send `prompt` to the generator without retrieval.
    pub async fn chat(&self, prompt: &str) -> Result<String> {
        let answer = self
            .generator
            .generate(GenerationRequest::new(&self.model, prompt))
            .await?;
        Ok(answer.trim().to_string())
    }

    /// Chunk, embed, and append `units`, returning the number of new chunks.
    ///
    /// Either every new chunk becomes searchable or none does.
    pub async fn ingest<I>(&self, units: I) -> Result<usize>
    where
        I: IntoIterator<Item = SourceUnit>,
    {
        let chunks = self.chunker.chunk_all(units);
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = embed_batched(
            self.embedder.as_ref(),
            &texts,
            self.batch_size,
            self.concurrency,
        )
        .await?;
        self.append(chunks, &vectors)
    }

    fn append(&self, chunks: Vec<Chunk>, vectors: &[Vec<f32>]) -> Result<usize> {
        let mut store = self.store.write();
        store.check_new(&chunks)?;
        self.index.add(vectors)?;
        let added = store.extend(chunks)?.len();
        log::info!("Ingested {added} chunks ({} total)", store.len());
        Ok(added)
    }

    /// Write the current index and store as an image.
    pub fn persist(&self, paths: &IndexPaths) -> Result<()> {
        let store = self.store.read();
        let index = self.index.snapshot();
        save_image(paths, &index, &store)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vicinity_core::Error;
    use vicinity_llm::MockGenerationClient;
    use vicinity_vector::{MockEmbeddingProvider, VectorIndex, load_image};

    const DIM: usize = 16;

    fn empty_pipeline(generator: MockGenerationClient) -> RetrievalPipeline {
        RetrievalPipeline::new(
            VectorIndex::new(),
            ChunkStore::new(),
            Arc::new(MockEmbeddingProvider::new(DIM)),
            Arc::new(generator),
        )
        .with_chunker(Chunker::new(4))
    }

    async fn loaded(generator: MockGenerationClient) -> RetrievalPipeline {
        let pipeline = empty_pipeline(generator);
        pipeline
            .ingest(vec![
                SourceUnit::text("a.txt", "route 72 serves rural road"),
                SourceUnit::text("b.txt", "the library opens at nine"),
                SourceUnit::text("c.txt", "tempe town lake trail"),
            ])
            .await
            .unwrap();
        pipeline
    }

    #[tokio::test]
    async fn test_retrieve_from_empty_index() {
        let pipeline = empty_pipeline(MockGenerationClient::with_response("x"));
        let err = pipeline.retrieve("anything", 3).await.unwrap_err();
        assert!(matches!(err, Error::EmptyIndex));
    }

    #[tokio::test]
    async fn test_exact_text_retrieves_itself_first() {
        let pipeline = loaded(MockGenerationClient::default()).await;
        let scored = pipeline
            .retrieve_scored("the library opens at", 2)
            .await
            .unwrap();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].0.id, "b.txt#0");
        assert_eq!(scored[0].1, 0.0);
        assert!(scored[0].1 <= scored[1].1);
    }

    #[tokio::test]
    async fn test_retrieve_caps_at_index_size() {
        let pipeline = loaded(MockGenerationClient::default()).await;
        assert_eq!(pipeline.len(), 5);
        assert_eq!(pipeline.retrieve("trail", 50).await.unwrap().len(), 5);
        assert!(pipeline.retrieve("trail", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_answer_builds_prompt_and_trims() {
        let generator = MockGenerationClient::with_response("  Route 72.\n");
        let pipeline = loaded(generator.clone()).await.with_model("mistral");

        let answer = pipeline.answer("route 72 serves rural", 2).await.unwrap();
        assert_eq!(answer, "Route 72.");

        let requests = generator.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "mistral");
        let prompt = &requests[0].prompt;
        assert!(prompt.starts_with("Use the context below to answer the question.\n\nContext:\nroute 72 serves rural\n\n"));
        assert!(prompt.ends_with("\n\nQuestion: route 72 serves rural"));
    }

    #[tokio::test]
    async fn test_generation_errors_propagate() {
        let pipeline = loaded(MockGenerationClient::default()).await;
        assert!(matches!(
            pipeline.answer("route", 1).await,
            Err(Error::Operation(_))
        ));
    }

    #[tokio::test]
    async fn test_chat_skips_retrieval() {
        let generator = MockGenerationClient::with_response("hello there ");
        let pipeline = empty_pipeline(generator.clone());
        assert_eq!(pipeline.chat("hi").await.unwrap(), "hello there");
        assert_eq!(generator.prompts().await, vec!["hi"]);
    }

    #[tokio::test]
    async fn test_duplicate_ingest_leaves_index_aligned() {
        let pipeline = loaded(MockGenerationClient::default()).await;
        let err = pipeline
            .ingest(vec![SourceUnit::text("a.txt", "again")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(pipeline.len(), 5);
        assert_eq!(pipeline.index.len(), 5);
    }

    #[tokio::test]
    async fn test_persist_round_trip() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let pipeline = loaded(MockGenerationClient::default()).await;
        pipeline.persist(&paths).unwrap();

        let (index, store) = load_image(&paths).unwrap();
        let reloaded = RetrievalPipeline::new(
            index,
            store,
            Arc::new(MockEmbeddingProvider::new(DIM)),
            Arc::new(MockGenerationClient::default()),
        );
        let before = pipeline.retrieve_scored("lake", 4).await.unwrap();
        let after = reloaded.retrieve_scored("lake", 4).await.unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_build_prompt_layout() {
        assert_eq!(
            build_prompt("a\n\nb", "why?"),
            "Use the context below to answer the question.\n\nContext:\na\n\nb\n\nQuestion: why?"
        );
    }
}
