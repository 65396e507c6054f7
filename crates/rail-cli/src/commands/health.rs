//! Health command implementation.
//!
//! Groups entries by context id and reports where each run ended up.

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use rail_logs::{LogEntry, LogLevel, SeverityBands, Settings, health_bar};

use crate::cli::HealthArgs;
use crate::commands::load_entries;
use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay, truncate};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Handler for the health command.
pub struct HealthCommand<'a> {
    settings: &'a Settings,
}

impl<'a> HealthCommand<'a> {
    /// Creates a new health command handler.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Executes the health command.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or output fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &HealthArgs,
    ) -> Result<(), CliError> {
        let parsed = load_entries(self.settings, &args.file, args.history)?;
        let report = HealthReport {
            runs: summarize(&parsed.entries, &self.settings.severity_bands()),
            warning: parsed.error.map(|e| e.to_string()),
        };
        format.write(out, &report)
    }
}

/// Final health of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunHealth {
    /// Context id of the run.
    pub context_id: String,
    /// Component that wrote it.
    pub component: String,
    /// Number of entries.
    pub entries: usize,
    /// FAILURE and ERROR entries.
    pub failures: usize,
    /// First entry timestamp.
    pub started: String,
    /// Last entry timestamp.
    pub finished: String,
    /// Raw health after the last entry.
    pub raw_health: i64,
    /// Normalized health after the last entry.
    pub health: i64,
    /// Severity indicator for `health`.
    pub indicator: String,
}

/// Per-run summary of a log.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Runs in order of first appearance.
    pub runs: Vec<RunHealth>,
    /// Parse problem met while reading, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Groups entries by context id, keeping first-appearance order.
pub fn summarize(entries: &[LogEntry], bands: &SeverityBands) -> Vec<RunHealth> {
    let mut runs: Vec<RunHealth> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        let timestamp = entry.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let slot = *index.entry(entry.context_id.as_str()).or_insert_with(|| {
            runs.push(RunHealth {
                context_id: entry.context_id.clone(),
                component: entry.component.clone(),
                entries: 0,
                failures: 0,
                started: timestamp.clone(),
                finished: String::new(),
                raw_health: 0,
                health: 0,
                indicator: String::new(),
            });
            runs.len() - 1
        });

        let run = &mut runs[slot];
        run.entries += 1;
        if matches!(entry.level, LogLevel::Failure | LogLevel::Error) {
            run.failures += 1;
        }
        run.finished = timestamp;
        run.raw_health = entry.raw_health;
        run.health = entry.normalized_health;
        run.indicator = bands.indicator(entry.normalized_health).to_string();
    }
    runs
}

impl TableDisplay for HealthReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.runs.is_empty() {
            writeln!(writer, "No runs found")?;
        } else {
            writeln!(
                writer,
                "{:<40}  {:<16}  {:>7}  {:>8}  {:<19}  HEALTH",
                "CONTEXT", "COMPONENT", "ENTRIES", "FAILURES", "FINISHED"
            )?;
            writeln!(writer, "{}", "─".repeat(120))?;
            for run in &self.runs {
                writeln!(
                    writer,
                    "{:<40}  {:<16}  {:>7}  {:>8}  {:<19}  {:>4}% {} {}",
                    truncate(&run.context_id, 40),
                    truncate(&run.component, 16),
                    run.entries,
                    run.failures,
                    run.finished,
                    run.health,
                    run.indicator,
                    health_bar(run.health)
                )?;
            }
            writeln!(writer)?;
            writeln!(writer, "Total: {} run(s)", self.runs.len())?;
        }
        if let Some(warning) = &self.warning {
            writeln!(writer, "warning: {warning}")?;
        }
        Ok(())
    }
}
