//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level arguments for the `vicinity` binary.
#[derive(Parser, Debug)]
#[command(name = "vicinity", author, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "VICINITY_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the index image for the data directory, or load it if current.
    Index {
        /// Rebuild even when a usable image exists.
        #[arg(short, long)]
        force: bool,

        /// Report on the image without building.
        #[arg(long, conflicts_with = "force")]
        check: bool,
    },

    /// Answer a question from the indexed documents.
    ///
    /// Without a question, reads questions from stdin until `exit`, `quit`,
    /// or end of input.
    Ask {
        /// The question; words are joined with spaces.
        question: Vec<String>,

        /// Chunks retrieved as context.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Talk to the generation model directly, without retrieval.
    Chat,

    /// Recommend friends from profiles, shared events, and distance.
    Recommend {
        /// Users JSON file.
        #[arg(long)]
        users: String,

        /// Events JSON file with RSVP lists.
        #[arg(long)]
        events: String,

        /// Output JSON file.
        #[arg(short, long, default_value = "friend_recommendations.json")]
        output: String,

        /// Recommendations per user.
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Fill each event's RSVP list with matching local users.
    Rsvp {
        /// Users JSON file.
        #[arg(long)]
        users: String,

        /// Events JSON file.
        #[arg(long)]
        events: String,

        /// Output JSON file.
        #[arg(short, long, default_value = "events_with_rsvp.json")]
        output: String,

        /// Users per event.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Search users by free text, optionally near a coordinate.
    People {
        /// Users JSON file.
        #[arg(long)]
        users: String,

        /// Events JSON file with RSVP lists.
        #[arg(long)]
        events: String,

        /// Latitude of the search origin.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude of the search origin.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Radius around the origin, in kilometers.
        #[arg(long)]
        radius_km: Option<f64>,

        /// The query; words are joined with spaces.
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Print version information.
    Version,

    /// Configuration operations.
    Config(ConfigCommand),
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print the effective configuration as TOML.
    Show,

    /// Get a configuration value by dotted key.
    Get {
        /// Dotted key (e.g., "retrieval.top_k").
        key: String,
    },

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Join positional words into one string; `None` when there are none.
pub fn joined(words: &[String]) -> Option<String> {
    let text = words.join(" ");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

// ============================================================================
// Tests
// ============================================================================
