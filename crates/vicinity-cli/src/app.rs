//! The `vicinity` application: logging setup and command dispatch.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vicinity_core::Result;
use vicinity_llm::{GenerationClient, create_generation_client};
use vicinity_vector::{EmbeddingProvider, GeoPoint, create_embedding_provider};

use crate::cli::{CliArgs, Command, joined};
use crate::config::VicinityConfig;
use crate::{config_handlers, handlers};

// ============================================================================
// VicinityCli
// ============================================================================

/// The CLI application around a loaded configuration.
pub struct VicinityCli {
    name: String,
    config: Arc<VicinityConfig>,
    version: String,
}

impl VicinityCli {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = VicinityConfig::load(args.config.as_deref())?;
        Ok(Self::new(config))
    }

    /// Create an application around `config`.
    pub fn new(config: VicinityConfig) -> Self {
        Self {
            name: "vicinity".to_string(),
            config: Arc::new(config),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &VicinityConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` if set, otherwise defaults based on verbosity flags.
    /// Library crates log through `log`; the subscriber picks those up too.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // A subscriber may already be installed (e.g. in tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        create_embedding_provider(&self.config.embedding_config()?)
    }

    fn generator(&self) -> Result<Arc<dyn GenerationClient>> {
        create_generation_client(&self.config.generation)
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);
        let config = self.config.as_ref();

        match args.command {
            Some(Command::Version) => {
                println!("{} {}", self.name, self.version);
                Ok(())
            }
            Some(Command::Index { check: true, .. }) => {
                handlers::handle_index_check(config).map(|_| ())
            }
            Some(Command::Index { force, .. }) => {
                handlers::handle_index(config, self.embedder()?, force)
                    .await
                    .map(|_| ())
            }
            Some(Command::Ask { question, top_k }) => {
                let pipeline =
                    handlers::open_pipeline(config, self.embedder()?, self.generator()?).await?;
                handlers::handle_ask(
                    &pipeline,
                    joined(&question),
                    top_k.unwrap_or(config.retrieval.top_k),
                    std::io::stdin().lock(),
                    std::io::stdout(),
                )
                .await
            }
            Some(Command::Chat) => {
                handlers::handle_chat(
                    self.generator()?,
                    &config.generation.model,
                    std::io::stdin().lock(),
                    std::io::stdout(),
                )
                .await
            }
            Some(Command::Recommend {
                users,
                events,
                output,
                top_n,
            }) => handlers::handle_recommend(
                config,
                self.embedder()?,
                Path::new(&users),
                Path::new(&events),
                Path::new(&output),
                top_n,
            )
            .await
            .map(|_| ()),
            Some(Command::Rsvp {
                users,
                events,
                output,
                top_k,
            }) => handlers::handle_rsvp(
                config,
                self.embedder()?,
                Path::new(&users),
                Path::new(&events),
                Path::new(&output),
                top_k,
            )
            .await
            .map(|_| ()),
            Some(Command::People {
                users,
                events,
                lat,
                lon,
                radius_km,
                query,
            }) => {
                let query = handlers::PeopleQuery {
                    query: joined(&query).unwrap_or_default(),
                    origin: lat.zip(lon).map(|(lat, lon)| GeoPoint::new(lat, lon)),
                    radius_km,
                };
                handlers::handle_people(
                    config,
                    self.embedder()?,
                    Path::new(&users),
                    Path::new(&events),
                    query,
                    std::io::stdout(),
                )
                .await
                .map(|_| ())
            }
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
            }
            None => {
                println!("{} {}: use --help for usage", self.name, self.version);
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
