//! Utility modules for file operations and path handling.
//!
//! # Modules
//!
//! - [`files`]: Atomic writes and path-aware reads
//! - [`paths`]: Path resolution helpers (tilde expansion)

pub mod files;
pub mod paths;
