//! # rail-logs
//!
//! A process-attached structured logging rail.
//!
//! Any component attaches a [`Logger`] to record what it did, how well it
//! went, and why. Entries are human-readable text that [`LogParser`] can read
//! back, and every entry carries a running health score.
//!
//! This crate provides:
//!
//! - [`Logger`] - Facade bound to one component, with leveled methods
//! - [`Settings`] - Layered configuration, loaded once per process
//! - [`HealthScore`] / [`SeverityBands`] - Health arithmetic and indicators
//! - [`SystemContext`] / [`HostFacts`] - Context snapshots for heavy levels
//! - [`EntryFormatter`] / [`LogParser`] - The text format, both directions
//! - [`LogWriter`] - Append with size-triggered rotation
//! - [`LogFilter`] - Linear filtering over parsed entries
//!
//! ## Example
//!
//! ```no_run
//! use rail_logs::{Details, LogFilter, LogLevel, Logger, read_log_file};
//!
//! let mut log = Logger::new("validate");
//! log.declare_health_total(20);
//! log.check("config present", true, 10, Details::new().with("path", "/etc/rail"));
//!
//! let parsed = read_log_file(log.log_path()).unwrap();
//! let filter = LogFilter::new().with_level(LogLevel::Check);
//! assert_eq!(parsed.entries.iter().filter(|e| filter.matches(e)).count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod format;
pub mod health;
pub mod logger;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export main types
pub use config::{ConfigSource, LogCategory, RailConfig, Settings, load_config};
pub use context::{HostFacts, LiveHost, SystemContext, compose_context};
pub use error::{LogError, Result};
pub use filter::{LogFilter, TimeRange};
pub use format::EntryFormatter;
pub use health::{HealthBand, HealthScore, SeverityBands, health_bar};
pub use logger::{CommandOutcome, Logger, LoggerBuilder};
pub use parser::{LogParser, ParsedLog, read_log_file, read_log_history};
pub use types::{Details, Identity, LogEntry, LogEntryBuilder, LogLevel, Metadata};
pub use writer::{LogWriter, RotationPolicy};
