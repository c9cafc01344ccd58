//! Command-line interface for Vicinity.
//!
//! The `vicinity` binary wires configuration, logging, and the engine
//! crates together:
//!
//! - `index`: build or load the persisted index image for the data directory
//! - `ask` / `chat`: answer questions with or without retrieved context
//! - `recommend`, `rsvp`, `people`: social ranking over JSON user and event files
//! - `config`: inspect and create the configuration file
//!
//! # Key Abstractions
//!
//! - [`VicinityCli`]: loads configuration and dispatches commands
//! - [`VicinityConfig`]: layered configuration (file, environment, defaults)
//! - [`repl::run_loop`]: the line loop behind `ask` and `chat`

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod handlers;
pub mod repl;

pub use app::VicinityCli;
pub use cli::{CliArgs, Command, ConfigAction, ConfigCommand};
pub use config::VicinityConfig;
