//! Vicinity Core: shared types, traits, errors, and utilities.
//!
//! This crate provides the foundational types used across all Vicinity
//! crates. It has no internal Vicinity dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`handle`]: Dense integer handles joining vectors to chunks
//! - [`traits`]: Configuration abstraction
//! - [`util`]: Atomic file writes and path helpers

pub mod error;
pub mod handle;
pub mod traits;
pub mod util;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use handle::Handle;
pub use traits::ConfigProvider;

// Convenience re-exports from util
pub use util::files::{read_bytes, read_to_string, write_atomic};
pub use util::paths::expand_tilde;
