//! Exact vector search and hybrid ranking for Vicinity.
//!
//! # Features
//!
//! - `vector-fastembed`: Enable local embedding generation via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     vicinity-vector                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                                    │
//! │  ├── MockEmbeddingProvider (always available)               │
//! │  └── FastEmbedProvider (feature: vector-fastembed)          │
//! │  embed_batched (ordered concurrent batches)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VectorIndex (flat f32 buffer, exact L2, rayon scan)        │
//! │  SharedVectorIndex (parking_lot RwLock)                     │
//! │  codec (VCNX binary image) + persistence (image directory)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HybridScorer (social / locale profiles)                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use vicinity_vector::VectorIndex;
//!
//! let mut index = VectorIndex::new();
//! index.add(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0]]).unwrap();
//!
//! let hits = index.search(&[0.1, 0.0], 2).unwrap();
//! assert_eq!(hits[0].handle.get(), 0);
//! assert_eq!(hits[1].handle.get(), 1);
//! ```

pub mod codec;
pub mod embedding;
pub mod geo;
pub mod hybrid;
pub mod index;
pub mod persistence;
pub mod shared;
pub mod types;

#[cfg(feature = "vector-fastembed")]
pub mod fastembed;

// Re-exports: core types
pub use types::{EmbeddingConfig, Neighbor};

// Re-exports: embedding
pub use embedding::{
    EmbeddingProvider, MockEmbeddingProvider, create_embedding_provider, embed_batched,
};

// Re-exports: index
pub use index::{PARALLEL_THRESHOLD, VectorIndex};
pub use persistence::{IndexPaths, load_image, save_image};
pub use shared::SharedVectorIndex;

// Re-exports: ranking
pub use geo::{GeoPoint, Locale};
pub use hybrid::{
    DEFAULT_TOP_N, EntityFeatures, EntityIds, FeatureLookup, HybridScorer, LocaleWeights,
    ScoredCandidate, ScoringProfile, SocialWeights, similarity_score,
};

// Feature-gated re-exports
#[cfg(feature = "vector-fastembed")]
pub use fastembed::FastEmbedProvider;
