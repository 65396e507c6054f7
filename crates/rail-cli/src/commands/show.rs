//! Show command implementation.
//!
//! Lists parsed entries, optionally filtered.

use std::io::Write;

use serde::Serialize;

use rail_logs::{LogEntry, LogFilter, LogLevel, Settings};

use crate::cli::ShowArgs;
use crate::commands::load_entries;
use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay, truncate};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Handler for the show command.
pub struct ShowCommand<'a> {
    settings: &'a Settings,
}

impl<'a> ShowCommand<'a> {
    /// Creates a new show command handler.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Executes the show command.
    ///
    /// # Errors
    ///
    /// Returns an error if a level is unknown, the file cannot be opened, or
    /// output fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ShowArgs,
    ) -> Result<(), CliError> {
        let filter = build_filter(args)?;
        let parsed = load_entries(self.settings, &args.file, args.history)?;
        let entries: Vec<LogEntry> = filter.apply(&parsed.entries).cloned().collect();

        let output = ShowOutput {
            total: parsed.entries.len(),
            entries,
            warning: parsed.error.map(|e| e.to_string()),
        };
        format.write(out, &output)
    }
}

fn build_filter(args: &ShowArgs) -> Result<LogFilter, CliError> {
    let mut filter = LogFilter::new();
    for level in &args.level {
        filter = filter.with_level(level.parse::<LogLevel>()?);
    }
    for component in &args.component {
        filter = filter.with_component(component.as_str());
    }
    for context in &args.context {
        filter = filter.with_context_id(context.as_str());
    }
    if let Some(text) = &args.contains {
        filter = filter.with_contains(text.as_str());
    }
    Ok(filter)
}

/// Entries selected by the show command.
#[derive(Debug, Clone, Serialize)]
pub struct ShowOutput {
    /// Entries read before filtering.
    pub total: usize,
    /// Matching entries, in file order.
    pub entries: Vec<LogEntry>,
    /// Parse problem met while reading, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl TableDisplay for ShowOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.entries.is_empty() {
            writeln!(writer, "No matching entries ({} read)", self.total)?;
        } else {
            writeln!(
                writer,
                "{:<23}  {:<9}  {:<16}  {:>6}  EVENT",
                "TIMESTAMP", "LEVEL", "COMPONENT", "HEALTH"
            )?;
            writeln!(writer, "{}", "─".repeat(96))?;
            for entry in &self.entries {
                writeln!(
                    writer,
                    "{:<23}  {:<9}  {:<16}  {:>5}%  {}",
                    entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    entry.level.as_str(),
                    truncate(&entry.component, 16),
                    entry.normalized_health,
                    entry.event
                )?;
            }
            writeln!(writer)?;
            writeln!(writer, "Showing {} of {} entries", self.entries.len(), self.total)?;
        }
        if let Some(warning) = &self.warning {
            writeln!(writer, "warning: {warning}")?;
        }
        Ok(())
    }
}
