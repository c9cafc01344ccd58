//! Common types for the vector layer.

use serde::{Deserialize, Serialize};
use vicinity_core::Handle;

// ============================================================================
// Configuration
// ============================================================================

/// Embedding configuration.
///
/// Controls provider selection, model, and ingestion batching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: "fastembed" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Embedding model name (e.g., "all-minilm-l6-v2").
    #[serde(default = "default_model")]
    pub model: String,

    /// Vector dimension for the mock provider; detected for real models.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Directory for cached model files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,

    /// Texts per embedding call during ingestion.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Embedding calls in flight during ingestion.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_provider() -> String {
    "fastembed".to_string()
}

fn default_model() -> String {
    "all-minilm-l6-v2".to_string()
}

fn default_dimension() -> usize {
    384
}

fn default_batch_size() -> usize {
    64
}

fn default_concurrency() -> usize {
    4
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimension: default_dimension(),
            cache_path: None,
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

// ============================================================================
// Search results
// ============================================================================

/// A raw nearest-neighbor hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Position of the stored vector.
    pub handle: Handle,

    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

impl Neighbor {
    /// Create a neighbor.
    pub fn new(handle: Handle, distance: f32) -> Self {
        Self { handle, distance }
    }
}

// ============================================================================
// Tests
// ============================================================================
