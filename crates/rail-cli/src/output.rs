//! Output formatting for CLI commands.
//!
//! Every command result is `Serialize` for `--format json` and implements
//! [`TableDisplay`] for the default human-readable form.

use std::io::Write;

use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Writes command results in the selected format.
#[derive(Debug, Clone, Default)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Formatter for `format`.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Writes `value` as pretty JSON or as its table form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }
}

/// Human-readable rendering of a command result.
pub trait TableDisplay {
    /// Writes the value as text.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Shortens `s` to `max` characters, marking the cut with `…`.
#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Archive {
        index: u32,
    }

    impl TableDisplay for Archive {
        fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
            writeln!(writer, "archive .{}", self.index)?;
            Ok(())
        }
    }

    fn render(format: Format) -> String {
        let mut out = Vec::new();
        OutputFormat::new(format)
            .write(&mut out, &Archive { index: 2 })
            .expect("write");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn table_form() {
        assert_eq!(render(Format::Table), "archive .2\n");
    }

    #[test]
    fn json_form() {
        let json: serde_json::Value = serde_json::from_str(&render(Format::Json)).expect("json");
        assert_eq!(json["index"], 2);
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer string", 5), "a lo…");
        assert_eq!(truncate("ünïcödé", 3), "ün…");
    }
}
