//! Error types for Vicinity operations.
//!
//! This module provides a common `Error` type and `Result<T>` alias used
//! across all Vicinity crates. Uses `thiserror` for derive macros.
//!
//! The engine-level kinds (`DimensionMismatch`, `EmptyIndex`, `NotFound`,
//! `CorruptIndex`, `UpstreamUnavailable`) are the ones callers are expected
//! to branch on; the rest describe ambient failures (I/O, config, parsing).

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in Vicinity operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A vector's length disagrees with the index dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Established dimensionality.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// A query was issued against an index holding no vectors.
    #[error("Index is empty")]
    EmptyIndex,

    /// Chunk or entity lookup miss.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted index bytes could not be decoded.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Embedding or generation service failure.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path.
    #[error("I/O error at {}: {source}", path.display())]
    IoWithPath {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic operation failure.
    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a corrupt index error.
    pub fn corrupt_index(msg: impl Into<String>) -> Self {
        Self::CorruptIndex(msg.into())
    }

    /// Create an upstream unavailable error.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    /// Wrap an I/O error.
    pub fn io(err: std::io::Error) -> Self {
        Self::Io(err)
    }

    /// Wrap an I/O error with the path that caused it.
    pub fn io_with_path(err: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source: err,
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create an operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Whether a transport-level retry could plausibly succeed.
    ///
    /// Only upstream failures qualify; engine errors are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }

    /// Whether this error means a persisted index should be rebuilt.
    pub fn is_corrupt_index(&self) -> bool {
        matches!(self, Self::CorruptIndex(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using Vicinity's Error type.
pub type Result<T> = std::result::Result<T, Error>;
