//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`show`] - Filtered listing of log entries
//! - [`health`] - Health summary per run
//! - [`path`] - Log location of a component
//! - [`config`] - Effective configuration
//! - [`run`] - Command execution under a logger

pub mod config;
pub mod health;
pub mod path;
pub mod run;
pub mod show;

pub use config::ConfigCommand;
pub use health::HealthCommand;
pub use path::PathCommand;
pub use run::RunCommand;
pub use show::ShowCommand;

use std::path::Path;

use rail_logs::{LogParser, ParsedLog, Settings};

use crate::error::CliError;

/// Reads a log file, or the file plus its archives when `history` is set.
pub(crate) fn load_entries(
    settings: &Settings,
    file: &Path,
    history: bool,
) -> Result<ParsedLog, CliError> {
    let parser = LogParser::from_settings(settings);
    let parsed = if history {
        parser.read_log_history(file, settings.rotation_policy().max_archives)?
    } else {
        parser.read_log_file(file)?
    };
    if let Some(err) = &parsed.error {
        tracing::warn!(file = %file.display(), error = %err, "log parsed with errors");
    }
    Ok(parsed)
}
