//! Configuration for the `vicinity` binary.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `VICINITY_CONFIG` environment variable
//! 3. XDG default: `~/.config/vicinity/config.toml`
//! 4. Built-in defaults
//!
//! `VICINITY_<SECTION>_<KEY>` variables override string values from the file.

use std::path::PathBuf;

use confyg::{Confygery, env};
use serde::{Deserialize, Serialize};
use vicinity_content::{Chunker, DEFAULT_WINDOW, TableTemplate};
use vicinity_core::traits::{ConfigProvider, DATA_DIR, INDEX_DIR};
use vicinity_core::{Error, Result, expand_tilde};
use vicinity_llm::GenerationConfig;
use vicinity_pipeline::DEFAULT_TOP_K;
use vicinity_pipeline::social::DEFAULT_RADIUS_KM;
use vicinity_pipeline::social::rsvp::DEFAULT_TOP_K as RSVP_TOP_K;
use vicinity_vector::{DEFAULT_TOP_N, EmbeddingConfig};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "VICINITY_CONFIG";

/// Index directory name under the base path when none is configured.
pub const DEFAULT_INDEX_DIR: &str = ".vicinity";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VicinityConfig {
    /// Project name, used for env var prefixes and default paths.
    pub project_name: String,

    /// Base path for the data and index directories.
    pub base_path: Option<String>,

    /// Source documents.
    pub data: DataConfig,

    /// Index image and chunking.
    pub index: IndexConfig,

    /// Question answering.
    pub retrieval: RetrievalConfig,

    /// Friend, RSVP, and people ranking.
    pub social: SocialConfig,

    /// Embedding provider.
    pub embedding: EmbeddingConfig,

    /// Generation service.
    pub generation: GenerationConfig,
}

/// Source documents directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory scanned for `.txt`, `.md`, and `.csv` files.
    pub path: Option<String>,
}

/// Index image location and chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the persisted image.
    pub path: Option<String>,

    /// Whitespace tokens per text chunk.
    pub window: usize,

    /// CSV columns a row must have to become a chunk.
    pub required_columns: Vec<String>,

    /// Sentence each CSV row is rendered through, with `{column}` or
    /// `{column|fallback}` placeholders.
    pub row_template: Option<String>,

    /// CSV columns copied into chunk metadata.
    pub metadata_columns: Vec<String>,
}

/// Question answering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved as context.
    pub top_k: usize,
}

/// Social ranking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    /// Friend recommendations per user.
    pub friends_top_n: usize,

    /// Users placed on each event's RSVP list.
    pub rsvp_top_k: usize,

    /// People search radius in kilometers.
    pub radius_km: f64,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for VicinityConfig {
    fn default() -> Self {
        Self {
            project_name: "vicinity".to_string(),
            base_path: None,
            data: DataConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            social: SocialConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: None,
            window: DEFAULT_WINDOW,
            required_columns: Vec::new(),
            row_template: None,
            metadata_columns: Vec::new(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            friends_top_n: DEFAULT_TOP_N,
            rsvp_top_k: RSVP_TOP_K,
            radius_km: DEFAULT_RADIUS_KM,
        }
    }
}

impl IndexConfig {
    /// The chunker these settings describe.
    pub fn chunker(&self) -> Chunker {
        let mut template = self
            .required_columns
            .iter()
            .fold(TableTemplate::new(), |t, column| t.require(column.as_str()));
        template = self
            .metadata_columns
            .iter()
            .fold(template, |t, column| t.metadata(column.as_str()));
        if let Some(text) = &self.row_template {
            template = template.text(text.as_str());
        }
        Chunker::new(self.window).with_table_template(template)
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl VicinityConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path) {
            if path.exists() {
                builder
                    .add_file(&path.to_string_lossy())
                    .map_err(|e| Error::config(format!("config file: {e}")))?;
            } else if config_path.is_some() {
                log::warn!("Config file {} not found; using defaults", path.display());
            }
        }

        let mut env_opts = env::Options::with_top_level("VICINITY");
        for section in ["data", "index", "retrieval", "social", "embedding", "generation"] {
            env_opts.add_section(section);
        }
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        Self::resolve_with(explicit, std::env::var(CONFIG_ENV).ok())
    }

    fn resolve_with(explicit: Option<&str>, from_env: Option<String>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(expand_tilde(path));
        }
        if let Some(path) = from_env.filter(|p| !p.is_empty()) {
            return Some(expand_tilde(path));
        }
        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("vicinity").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Embedding settings with a relative model cache resolved against the
    /// base path.
    pub fn embedding_config(&self) -> Result<EmbeddingConfig> {
        let mut embedding = self.embedding.clone();
        if let Some(cache) = &embedding.cache_path {
            let path = expand_tilde(cache);
            let path = if path.is_relative() {
                self.base_path()?.join(path)
            } else {
                path
            };
            embedding.cache_path = Some(path.to_string_lossy().into_owned());
        }
        Ok(embedding)
    }
}

// ============================================================================
// ConfigProvider implementation
// ============================================================================

impl ConfigProvider for VicinityConfig {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn base_path(&self) -> Result<PathBuf> {
        match &self.base_path {
            Some(p) => Ok(expand_tilde(p)),
            None => std::env::current_dir()
                .map_err(|e| Error::config(format!("Could not determine base path: {e}"))),
        }
    }

    fn content_path(&self, content_type: &str) -> Result<PathBuf> {
        let (configured, fallback) = match content_type {
            DATA_DIR => (&self.data.path, DATA_DIR),
            INDEX_DIR => (&self.index.path, DEFAULT_INDEX_DIR),
            other => {
                return Err(Error::config(format!("Unknown content kind '{other}'")));
            }
        };
        match configured {
            Some(p) => Ok(expand_tilde(p)),
            None => Ok(self.base_path()?.join(fallback)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Default tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_vicinity_config_default() {
        let config = VicinityConfig::default();
        assert_eq!(config.project_name, "vicinity");
        assert!(config.base_path.is_none());
        assert!(config.data.path.is_none());
        assert_eq!(config.index.window, 300);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.social.friends_top_n, 10);
        assert_eq!(config.social.rsvp_top_k, 50);
        assert_eq!(config.social.radius_km, 50.0);
        assert_eq!(config.generation.endpoint, "http://localhost:11434/api/chat");
    }

    // ------------------------------------------------------------------------
    // Serialization tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_vicinity_config_from_toml() {
        let toml_str = r#"
            base_path = "/srv/transit"

            [data]
            path = "/srv/transit/docs"

            [index]
            window = 120
            required_columns = ["stop_name", "route"]
            row_template = "Stop {stop_name} on route {route|none}."
            metadata_columns = ["OBJECTID"]

            [retrieval]
            top_k = 4

            [embedding]
            provider = "mock"
            dimension = 32

            [generation]
            model = "mistral"
            timeout_secs = 30
        "#;

        let config: VicinityConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.project_name, "vicinity");
        assert_eq!(config.base_path.as_deref(), Some("/srv/transit"));
        assert_eq!(config.index.window, 120);
        assert_eq!(config.index.required_columns, vec!["stop_name", "route"]);
        let template = config.index.chunker();
        assert_eq!(
            template.table_template().text_template(),
            Some("Stop {stop_name} on route {route|none}.")
        );
        assert_eq!(template.table_template().metadata_columns(), ["objectid"]);
        assert_eq!(template.table_template().required(), ["stop_name", "route"]);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.embedding.provider, "mock");
        assert_eq!(config.embedding.dimension, 32);
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.generation.model, "mistral");
        assert_eq!(config.generation.timeout_secs, Some(30));
        assert_eq!(config.social.radius_km, 50.0);
    }

    #[test]
    fn test_vicinity_config_toml_round_trip() {
        let config = VicinityConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("project_name = \"vicinity\""));
        assert!(toml_str.contains("[retrieval]"));
        assert!(toml_str.contains("top_k = 10"));

        let parsed: VicinityConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    // ------------------------------------------------------------------------
    // Loading tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_vicinity_config_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                project_name = "bus-stops"
                [retrieval]
                top_k = 3
            "#,
        )
        .unwrap();

        let config = VicinityConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.project_name, "bus-stops");
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn test_vicinity_config_load_missing_file_uses_defaults() {
        let config = VicinityConfig::load(Some("/nonexistent/vicinity.toml")).unwrap();
        assert_eq!(config.project_name, "vicinity");
        assert_eq!(config.retrieval.top_k, 10);
    }

    // ------------------------------------------------------------------------
    // resolve_config_path tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_resolve_explicit_wins() {
        let path = VicinityConfig::resolve_with(
            Some("/explicit/config.toml"),
            Some("/env/config.toml".into()),
        );
        assert_eq!(path, Some(PathBuf::from("/explicit/config.toml")));
    }

    #[test]
    fn test_resolve_env_before_default() {
        let path = VicinityConfig::resolve_with(None, Some("/env/config.toml".into()));
        assert_eq!(path, Some(PathBuf::from("/env/config.toml")));
    }

    #[test]
    fn test_resolve_default() {
        let path = VicinityConfig::resolve_with(None, Some(String::new()));
        if let Some(p) = path {
            assert!(p.ends_with("vicinity/config.toml"));
        }
    }

    // ------------------------------------------------------------------------
    // ConfigProvider tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_content_paths_default_under_base() {
        let config = VicinityConfig {
            base_path: Some("/srv/app".into()),
            ..Default::default()
        };
        assert_eq!(config.base_path().unwrap(), PathBuf::from("/srv/app"));
        assert_eq!(
            config.content_path(DATA_DIR).unwrap(),
            PathBuf::from("/srv/app/data")
        );
        assert_eq!(
            config.content_path(INDEX_DIR).unwrap(),
            PathBuf::from("/srv/app/.vicinity")
        );
    }

    #[test]
    fn test_content_paths_override() {
        let mut config = VicinityConfig {
            base_path: Some("/srv/app".into()),
            ..Default::default()
        };
        config.data.path = Some("/mnt/docs".into());
        config.index.path = Some("/var/cache/vicinity".into());
        assert_eq!(
            config.content_path(DATA_DIR).unwrap(),
            PathBuf::from("/mnt/docs")
        );
        assert_eq!(
            config.content_path(INDEX_DIR).unwrap(),
            PathBuf::from("/var/cache/vicinity")
        );
    }

    #[test]
    fn test_content_path_unknown_kind() {
        let config = VicinityConfig::default();
        assert!(matches!(
            config.content_path("graphs"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_relative_model_cache_resolved() {
        let mut config = VicinityConfig {
            base_path: Some("/srv/app".into()),
            ..Default::default()
        };
        config.embedding.cache_path = Some("models".into());
        assert_eq!(
            config.embedding_config().unwrap().cache_path.as_deref(),
            Some("/srv/app/models")
        );
    }

    #[test]
    fn test_index_chunker_settings() {
        let mut config = VicinityConfig::default();
        config.index.window = 25;
        config.index.required_columns = vec!["stop_name".into()];
        let chunker = config.index.chunker();
        assert_eq!(chunker.window(), 25);
    }
}
