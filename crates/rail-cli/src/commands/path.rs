//! Path command implementation.

use std::io::Write;

use serde::Serialize;

use rail_logs::Settings;

use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for the path command.
pub struct PathCommand<'a> {
    settings: &'a Settings,
}

impl<'a> PathCommand<'a> {
    /// Creates a new path command handler.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Executes the path command.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        component: &str,
    ) -> Result<(), CliError> {
        let path = self.settings.log_path(component);
        let info = PathInfo {
            component: component.to_string(),
            category: self.settings.route(component).dir_name().to_string(),
            exists: path.exists(),
            path: path.display().to_string(),
        };
        format.write(out, &info)
    }
}

/// Where a component logs.
#[derive(Debug, Clone, Serialize)]
pub struct PathInfo {
    /// Component name.
    pub component: String,
    /// Routed subdirectory.
    pub category: String,
    /// Live log file.
    pub path: String,
    /// Whether the file exists yet.
    pub exists: bool,
}

impl TableDisplay for PathInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.path)?;
        Ok(())
    }
}
