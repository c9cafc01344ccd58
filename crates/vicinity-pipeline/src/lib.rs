//! Indexing and query orchestration for Vicinity.
//!
//! - [`IndexBuilder`]: load a persisted image or build one from source units
//! - [`RetrievalPipeline`]: nearest chunks for a question, then a grounded answer
//! - [`social`]: friend recommendations, RSVP simulation, people search
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vicinity_content::SourceLoader;
//! use vicinity_llm::MockGenerationClient;
//! use vicinity_pipeline::{IndexBuilder, RetrievalPipeline};
//! use vicinity_vector::{IndexPaths, MockEmbeddingProvider};
//!
//! # async fn run() -> vicinity_core::Result<()> {
//! let embedder = Arc::new(MockEmbeddingProvider::new(384));
//! let units = SourceLoader::new().load_dir("data".as_ref()).await?;
//! let build = IndexBuilder::new(embedder.clone())
//!     .build_or_load(units, &IndexPaths::new(".vicinity"))
//!     .await?;
//!
//! let pipeline = RetrievalPipeline::from_build(
//!     build,
//!     embedder,
//!     Arc::new(MockGenerationClient::with_response("Route 72.")),
//! );
//! let answer = pipeline.answer("Which route serves Rural Road?", 10).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod retrieval;
pub mod social;

pub use builder::{DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY, IndexBuild, IndexBuilder};
pub use retrieval::{DEFAULT_MODEL, DEFAULT_TOP_K, RetrievalPipeline, build_prompt};
