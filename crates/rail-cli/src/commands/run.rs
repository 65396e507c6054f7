//! Run command implementation.
//!
//! Wraps one external command in a logger so the run leaves an operation
//! entry and a success or failure entry behind.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use rail_logs::{LogError, Logger, Settings};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for the run command.
pub struct RunCommand {
    settings: Arc<Settings>,
}

impl RunCommand {
    /// Creates a new run command handler.
    #[must_use]
    pub const fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Executes the run command and returns the child's exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started or output fails.
    /// A non-zero exit is reported through the returned code instead.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &RunArgs,
    ) -> Result<i32, CliError> {
        let Some((program, rest)) = args.command.split_first() else {
            return Err(CliError::InvalidArgument("no command given".to_string()));
        };
        let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

        let mut logger = Logger::builder(args.component.as_str())
            .settings(Arc::clone(&self.settings))
            .build();

        let (exit_code, stdout, stderr) = match logger.log_command(program, &rest) {
            Ok(outcome) => (outcome.exit_code, Some(outcome.stdout), Some(outcome.stderr)),
            Err(LogError::CommandFailed { exit_code, .. }) => (exit_code, None, None),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            component = %args.component,
            program = %program,
            exit_code,
            "command finished"
        );

        let report = RunReport {
            component: logger.component().to_string(),
            command: args.command.join(" "),
            exit_code,
            context_id: logger.context_id().to_string(),
            log_path: logger.log_path().display().to_string(),
            health: logger.health(),
            raw_health: logger.raw_health(),
            stdout,
            stderr,
        };
        format.write(out, &report)?;
        Ok(exit_code)
    }
}

/// Outcome of a logged run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Component the logger was bound to.
    pub component: String,
    /// Command line as given.
    pub command: String,
    /// Child exit code, -1 when killed by a signal.
    pub exit_code: i32,
    /// Context id of the run.
    pub context_id: String,
    /// Log file the entries went to.
    pub log_path: String,
    /// Normalized health after the run.
    pub health: i64,
    /// Raw health after the run.
    pub raw_health: i64,
    /// Child standard output, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Child standard error, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl TableDisplay for RunReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if let Some(stdout) = &self.stdout {
            write!(writer, "{stdout}")?;
        }
        if self.exit_code != 0 {
            writeln!(
                writer,
                "`{}` failed with exit code {} (see {})",
                self.command, self.exit_code, self.log_path
            )?;
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::cli::Format;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Arc<Settings> {
        let toml = format!("[paths]\nbase_dir = \"{}\"", dir.path().display());
        Arc::new(Settings::from_toml(&toml).expect("config"))
    }

    fn args(component: &str, command: &[&str]) -> RunArgs {
        RunArgs {
            component: component.to_string(),
            command: command.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn passes_stdout_through() {
        let dir = TempDir::new().expect("tempdir");
        let mut out = Vec::new();
        let code = RunCommand::new(settings(&dir))
            .execute(&mut out, &OutputFormat::default(), &args("demo", &["echo", "hello"]))
            .expect("run");

        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(out).expect("utf8"), "hello\n");

        let log = dir.path().join("logs/system/demo.log");
        let parsed = rail_logs::read_log_file(&log).expect("read");
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[1].details.get("output"), Some("hello"));
    }

    #[test]
    fn mirrors_exit_code() {
        let dir = TempDir::new().expect("tempdir");
        let mut out = Vec::new();
        let code = RunCommand::new(settings(&dir))
            .execute(
                &mut out,
                &OutputFormat::new(Format::Json),
                &args("build", &["sh", "-c", "exit 3"]),
            )
            .expect("run");

        assert_eq!(code, 3);
        let json: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(json["exit_code"], 3);
        assert!(json.get("stdout").is_none());
        assert!(json["log_path"].as_str().expect("path").ends_with("logs/scripts/build.log"));
    }

    #[test]
    fn missing_program_is_error() {
        let dir = TempDir::new().expect("tempdir");
        let result = RunCommand::new(settings(&dir)).execute(
            &mut Vec::new(),
            &OutputFormat::default(),
            &args("demo", &["/nonexistent/rail-test-program"]),
        );
        assert!(matches!(result, Err(CliError::Log(LogError::Spawn { .. }))));
    }
}
