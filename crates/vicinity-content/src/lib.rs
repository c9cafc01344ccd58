//! Chunk model, chunking policies, and the chunk store.
//!
//! Source material (text files, pre-extracted pages, CSV tables) enters as
//! [`SourceUnit`]s, the [`Chunker`] turns each unit into uniform
//! [`Chunk`]s, and the [`ChunkStore`] keeps them in insertion order keyed
//! by the same [`Handle`](vicinity_core::Handle)s the vector index assigns.
//!
//! # Example
//!
//! ```rust
//! use vicinity_content::{Chunker, ChunkStore, SourceUnit};
//!
//! let chunker = Chunker::new(300);
//! let mut store = ChunkStore::new();
//! let added = store
//!     .ingest(&chunker, vec![SourceUnit::text("notes.txt", "a few words of text")])
//!     .unwrap();
//! assert_eq!(added.len(), 1);
//! assert_eq!(store.get("notes.txt#0").unwrap().text, "a few words of text");
//! ```

pub mod chunk;
pub mod chunker;
pub mod loader;
pub mod store;

pub use chunk::{Chunk, MetadataValue};
pub use chunker::{Chunker, SourceUnit, TableTemplate, DEFAULT_WINDOW};
pub use loader::SourceLoader;
pub use store::ChunkStore;
