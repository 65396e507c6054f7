//! Config command implementation.
//!
//! Prints the effective settings after fallback resolution.

use std::io::Write;

use serde::Serialize;

use rail_logs::config::RoutingConfig;
use rail_logs::{ConfigSource, Settings};

use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for the config command.
pub struct ConfigCommand<'a> {
    settings: &'a Settings,
}

impl<'a> ConfigCommand<'a> {
    /// Creates a new config command handler.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Executes the config command.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    pub fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let s = self.settings;
        let source = match s.source() {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Inline => "inline".to_string(),
            ConfigSource::Defaults => "built-in defaults".to_string(),
        };
        let policy = s.rotation_policy();
        let routing = if s.is_loaded() {
            s.config().routing.clone()
        } else {
            RoutingConfig::default()
        };
        let report = ConfigReport {
            loaded: s.is_loaded(),
            source,
            base_dir: s.base_dir().display().to_string(),
            timestamp_format: s.timestamp_format().to_string(),
            entry_separator: s.entry_separator().to_string(),
            log_extension: s.log_extension().to_string(),
            rotation_enabled: policy.enabled,
            rotation_max_bytes: policy.max_bytes,
            rotation_max_archives: policy.max_archives,
            routing,
        };
        format.write(out, &report)
    }
}

/// Effective configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    /// Whether a config file was loaded.
    pub loaded: bool,
    /// Where the values came from.
    pub source: String,
    /// Base directory of `logs/`.
    pub base_dir: String,
    /// Timestamp format of entry headers.
    pub timestamp_format: String,
    /// Entry separator line.
    pub entry_separator: String,
    /// Log file extension.
    pub log_extension: String,
    /// Whether rotation is on.
    pub rotation_enabled: bool,
    /// Rotation threshold in bytes.
    pub rotation_max_bytes: u64,
    /// Archives kept.
    pub rotation_max_archives: u32,
    /// Component routing lists.
    pub routing: RoutingConfig,
}

impl TableDisplay for ConfigReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Rail Configuration")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Source:           {}", self.source)?;
        writeln!(writer, "Loaded:           {}", self.loaded)?;
        writeln!(writer, "Base dir:         {}", self.base_dir)?;
        writeln!(writer)?;
        writeln!(writer, "Format")?;
        writeln!(writer, "  Timestamp:      {}", self.timestamp_format)?;
        writeln!(writer, "  Separator:      {}", self.entry_separator)?;
        writeln!(writer, "  Extension:      {}", self.log_extension)?;
        writeln!(writer)?;
        writeln!(writer, "Rotation")?;
        writeln!(writer, "  Enabled:        {}", self.rotation_enabled)?;
        writeln!(writer, "  Max bytes:      {}", self.rotation_max_bytes)?;
        writeln!(writer, "  Archives:       {}", self.rotation_max_archives)?;
        writeln!(writer)?;
        writeln!(writer, "Routing")?;
        writeln!(writer, "  commands/:      {}", self.routing.commands.join(", "))?;
        writeln!(writer, "  scripts/:       {}", self.routing.scripts.join(", "))?;
        writeln!(writer, "  libraries/:     {}", self.routing.libraries.join(", "))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    #[test]
    fn defaults_report() {
        let settings = Settings::defaults();
        let mut out = Vec::new();
        ConfigCommand::new(&settings)
            .execute(&mut out, &OutputFormat::default())
            .expect("config");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("built-in defaults"));
        assert!(text.contains("Archives:       5"));
        assert!(text.contains("validate, test, status, diagnose"));
    }

    #[test]
    fn loaded_report_as_json() {
        let settings = Settings::from_toml("[rotation]\nmax_files = 2\nmax_size_mb = 1")
            .expect("config");
        let mut out = Vec::new();
        ConfigCommand::new(&settings)
            .execute(&mut out, &OutputFormat::new(Format::Json))
            .expect("config");
        let json: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(json["loaded"], true);
        assert_eq!(json["rotation_max_archives"], 2);
        assert_eq!(json["rotation_max_bytes"], 1_048_576);
    }
}
