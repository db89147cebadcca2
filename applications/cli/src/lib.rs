//! Earmark command-line application
//!
//! Parses options, merges them over `earmark.toml` defaults, runs one
//! listening session against the default (or selected) output device and
//! prints the trial report.

pub mod app;
pub mod cli;
pub mod config;
pub mod settings;
pub mod status;

pub use cli::Cli;
pub use config::{CliConfig, MAX_TRIALS};
pub use settings::Settings;
