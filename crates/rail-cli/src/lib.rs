//! # rail-cli
//!
//! Command-line front end for the `rail-logs` structured logging rail.
//!
//! Provides commands for:
//! - Reading and filtering log files, archives included
//! - Summarizing health per run
//! - Resolving where a component logs
//! - Running an external command under a logger
//!
//! ```text
//! ┌──────────┐  append   ┌───────────────────────┐  parse   ┌──────────┐
//! │  Logger  │──────────►│ logs/<category>/x.log │─────────►│ rail CLI │
//! └──────────┘           └───────────────────────┘          └──────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, HealthArgs, RunArgs, ShowArgs};
pub use error::CliError;
pub use output::OutputFormat;
