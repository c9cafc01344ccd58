//! Core traits for Vicinity applications.
//!
//! [`ConfigProvider`] abstracts how an application locates its working
//! directories, so the indexing and query layers never read ambient
//! configuration themselves.

use std::path::PathBuf;

use crate::Result;

/// Content kind for the source documents directory.
pub const DATA_DIR: &str = "data";

/// Content kind for the persisted index image directory.
pub const INDEX_DIR: &str = "index";

/// Trait for application configuration.
///
/// # Bounds
///
/// - `Send + Sync`: Configuration must be shareable across threads
/// - `Clone`: Configuration can be duplicated for passing to subsystems
/// - `'static`: Configuration lifetime is not borrowed
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use vicinity_core::traits::ConfigProvider;
/// use vicinity_core::Result;
///
/// #[derive(Clone)]
/// struct BusStopsConfig {
///     root: PathBuf,
/// }
///
/// impl ConfigProvider for BusStopsConfig {
///     fn project_name(&self) -> &str {
///         "bus-stops"
///     }
///
///     fn base_path(&self) -> Result<PathBuf> {
///         Ok(self.root.clone())
///     }
///
///     fn content_path(&self, content_type: &str) -> Result<PathBuf> {
///         Ok(self.root.join(content_type))
///     }
/// }
/// ```
pub trait ConfigProvider: Send + Sync + Clone + 'static {
    /// The project name, used for env var prefixes and default paths.
    fn project_name(&self) -> &str;

    /// Base path for all project data.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be determined.
    fn base_path(&self) -> Result<PathBuf>;

    /// Path for a specific content kind.
    ///
    /// The engine asks for [`DATA_DIR`] (source documents) and
    /// [`INDEX_DIR`] (persisted index image); applications may define more.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind is unknown or the path cannot be resolved.
    fn content_path(&self, content_type: &str) -> Result<PathBuf>;
}
