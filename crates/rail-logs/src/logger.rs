//! The logger facade.
//!
//! A [`Logger`] is bound to one component for one unit of work. Each leveled
//! method applies its health delta, captures a full context for heavy levels,
//! formats the entry and appends it to the component's log file. None of them
//! can fail: problems on the write path are reported on stderr (or through
//! `tracing`) and the caller carries on.
//!
//! ```no_run
//! use rail_logs::{Details, Logger};
//!
//! let mut log = Logger::new("demo");
//! log.declare_health_total(100);
//! log.operation("deploy", &["--dry-run"], 5);
//! log.success("Deploy finished", 20, Details::new().with("files", 12));
//! assert_eq!(log.health(), 25);
//! ```

use std::backtrace::Backtrace;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::config::{self, Settings, render};
use crate::context::{CaptureSettings, HostFacts, LiveHost, capture_identity, compose_context};
use crate::error::{LogError, Result};
use crate::format::EntryFormatter;
use crate::health::{HealthScore, health_bar};
use crate::types::{Details, Identity, LogEntry, LogLevel, Metadata};
use crate::writer::{LogWriter, report};

/// Result of a command run through [`Logger::log_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Process exit code.
    pub exit_code: i32,
    /// Wall time the command took.
    pub duration: Duration,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Builder for a [`Logger`] with non-default collaborators.
pub struct LoggerBuilder {
    component: String,
    settings: Option<Arc<Settings>>,
    base_dir: Option<PathBuf>,
    facts: Option<Box<dyn HostFacts>>,
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("component", &self.component)
            .field("settings", &self.settings)
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl LoggerBuilder {
    /// Uses `settings` instead of the process-wide configuration.
    #[must_use]
    pub fn settings(mut self, settings: Arc<Settings>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Writes under `base_dir` instead of the configured base directory.
    #[must_use]
    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Reads host facts through `facts`.
    #[must_use]
    pub fn facts(mut self, facts: Box<dyn HostFacts>) -> Self {
        self.facts = Some(facts);
        self
    }

    /// Resolves the log path, prepares its directory and captures identity.
    #[must_use]
    pub fn build(self) -> Logger {
        let settings = self.settings.unwrap_or_else(config::global);
        let facts = self.facts.unwrap_or_else(|| Box::new(LiveHost));
        let base_dir = self.base_dir.unwrap_or_else(|| settings.base_dir());
        let path = settings.log_path_in(&base_dir, &self.component);

        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                report(&format!("failed to create log directory {}: {e}", dir.display()));
            }
        }

        let capture = settings.capture_settings();
        let identity = capture_identity(facts.as_ref(), &capture.unknown);
        let context_id = new_context_id(settings.context_id_format(), &self.component, identity.pid);
        tracing::debug!(
            component = %self.component,
            category = settings.route(&self.component).dir_name(),
            path = %path.display(),
            "logger attached"
        );

        Logger {
            writer: LogWriter::new(path, settings.rotation_policy()),
            formatter: EntryFormatter::from_settings(&settings),
            component: self.component,
            context_id,
            identity,
            health: HealthScore::new(),
            capture,
            facts,
            settings,
        }
    }
}

fn new_context_id(template: &str, component: &str, pid: u32) -> String {
    let nanos = Local::now().timestamp_nanos_opt().unwrap_or_default();
    render(
        template,
        &[
            ("component", component),
            ("pid", &pid.to_string()),
            ("nanos", &nanos.to_string()),
        ],
    )
}

/// Cuts `text` to at most `max` bytes without splitting a character.
fn truncate_at_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Structured logger bound to one component.
pub struct Logger {
    component: String,
    context_id: String,
    identity: Identity,
    health: HealthScore,
    settings: Arc<Settings>,
    formatter: EntryFormatter,
    writer: LogWriter,
    capture: CaptureSettings,
    facts: Box<dyn HostFacts>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .field("context_id", &self.context_id)
            .field("identity", &self.identity)
            .field("health", &self.health)
            .field("path", &self.writer.path())
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Logger for `component` using the process-wide configuration.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self::builder(component).build()
    }

    /// Starts building a logger for `component`.
    #[must_use]
    pub fn builder(component: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder {
            component: component.into(),
            settings: None,
            base_dir: None,
            facts: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Component this logger is bound to.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Context id shared by every entry of this logger.
    #[must_use]
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Identity captured at construction.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Live log file.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.writer.path()
    }

    /// Normalized health, `-100..=100`.
    #[must_use]
    pub const fn health(&self) -> i64 {
        self.health.normalized()
    }

    /// Cumulative raw health.
    #[must_use]
    pub const fn raw_health(&self) -> i64 {
        self.health.raw()
    }

    /// Declared denominator, 0 when undeclared.
    #[must_use]
    pub const fn health_total(&self) -> i64 {
        self.health.total()
    }

    /// Sets the denominator used to normalize health.
    pub fn declare_health_total(&mut self, total: i64) {
        self.health.declare_total(total);
    }

    /// Indicator symbol and bar for the current health.
    #[must_use]
    pub fn health_indicator(&self) -> String {
        let health = self.health();
        format!(
            "{} {}",
            self.formatter.bands().indicator(health),
            health_bar(health)
        )
    }

    // ------------------------------------------------------------------
    // Leveled methods
    // ------------------------------------------------------------------

    /// An operation is starting. `args` are joined into the logged command
    /// line.
    pub fn operation(&mut self, command: &str, args: &[&str], impact: i64) {
        let messages = self.settings.messages();
        let event = render(&messages.event_op_start, &[("command", command)]);
        let full = self.command_line(command, args);
        self.write_entry(
            LogLevel::Operation,
            event,
            impact,
            Details::new().with("command", full),
            None,
        );
    }

    /// Something worked.
    pub fn success(&mut self, event: &str, impact: i64, details: Details) {
        self.write_entry(LogLevel::Success, event.to_string(), impact, details, None);
    }

    /// Something did not work, for a known reason.
    pub fn failure(&mut self, event: &str, reason: &str, impact: i64, details: Details) {
        let details = with_leading("reason", reason, details);
        self.write_entry(LogLevel::Failure, event.to_string(), impact, details, None);
    }

    /// An unexpected error. Records the error, its source chain and a
    /// backtrace cut to the configured size.
    pub fn error(&mut self, event: &str, err: &dyn std::error::Error, impact: i64) {
        let mut details = Details::new().with("error", err);

        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        if !causes.is_empty() {
            details.insert("caused_by", causes.join("\n"));
        }

        let trace = Backtrace::force_capture().to_string();
        let limit = self.settings.stack_buffer_size();
        details.insert(
            "stack_trace",
            truncate_at_boundary(&trace, limit).trim_end(),
        );

        self.write_entry(LogLevel::Error, event.to_string(), impact, details, None);
    }

    /// A verification result.
    pub fn check(&mut self, what: &str, result: bool, impact: i64, details: Details) {
        let event = render(&self.settings.messages().event_check, &[("what", what)]);
        let details = with_leading("result", result, details);
        self.write_entry(LogLevel::Check, event, impact, details, None);
    }

    /// Records a full system state snapshot.
    pub fn snapshot_state(&mut self, label: &str, impact: i64) {
        let event = render(&self.settings.messages().event_snapshot, &[("label", label)]);
        self.write_entry(LogLevel::Context, event, impact, Details::new(), None);
    }

    /// Internal state for debugging.
    pub fn debug(&mut self, event: &str, impact: i64, state: Details) {
        self.write_entry(LogLevel::Debug, event.to_string(), impact, state, None);
    }

    /// [`Logger::success`] with semantic metadata.
    pub fn success_with_metadata(
        &mut self,
        event: &str,
        impact: i64,
        details: Details,
        metadata: Metadata,
    ) {
        self.write_entry(
            LogLevel::Success,
            event.to_string(),
            impact,
            details,
            Some(metadata),
        );
    }

    /// [`Logger::failure`] with semantic metadata.
    pub fn failure_with_metadata(
        &mut self,
        event: &str,
        reason: &str,
        impact: i64,
        details: Details,
        metadata: Metadata,
    ) {
        let details = with_leading("reason", reason, details);
        self.write_entry(
            LogLevel::Failure,
            event.to_string(),
            impact,
            details,
            Some(metadata),
        );
    }

    /// [`Logger::check`] with semantic metadata.
    pub fn check_with_metadata(
        &mut self,
        what: &str,
        result: bool,
        impact: i64,
        details: Details,
        metadata: Metadata,
    ) {
        let event = render(&self.settings.messages().event_check, &[("what", what)]);
        let details = with_leading("result", result, details);
        self.write_entry(LogLevel::Check, event, impact, details, Some(metadata));
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Runs `program` with `args`, logging an operation entry before and a
    /// success or failure entry after.
    ///
    /// The result reflects only the command. Logging problems never change
    /// it.
    ///
    /// # Errors
    ///
    /// [`LogError::Spawn`] if the program could not be started, or
    /// [`LogError::CommandFailed`] if it exited non-zero or was killed by a
    /// signal (exit code -1).
    pub fn log_command(&mut self, program: &str, args: &[&str]) -> Result<CommandOutcome> {
        let messages = self.settings.messages();
        let impacts = self.settings.health_impacts();
        let command_line = self.command_line(program, args);
        let failed_event = render(&messages.event_cmd_failed, &[("command", program)]);

        self.operation(program, args, impacts.cmd_operation_impact);

        let started = Instant::now();
        let output = match Command::new(program).args(args).output() {
            Ok(output) => output,
            Err(source) => {
                self.failure(
                    &failed_event,
                    &source.to_string(),
                    impacts.cmd_failure_impact,
                    Details::new().with("command", &command_line),
                );
                return Err(LogError::Spawn {
                    command: command_line,
                    source,
                });
            }
        };
        let duration = started.elapsed();

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let combined = format!("{stdout}{stderr}");
        let ms = duration.as_millis().to_string();
        let details = Details::new()
            .with("command", &command_line)
            .with("exit_code", exit_code)
            .with("duration", render(&messages.duration_format, &[("ms", &ms)]))
            .with("output", combined.trim_end());

        if output.status.success() {
            let event = render(&messages.event_cmd_success, &[("command", program)]);
            self.success(&event, impacts.cmd_success_impact, details);
            Ok(CommandOutcome {
                exit_code,
                duration,
                stdout,
                stderr,
            })
        } else {
            self.failure(
                &failed_event,
                &format!("exit code: {exit_code}"),
                impacts.cmd_failure_impact,
                details,
            );
            Err(LogError::CommandFailed {
                command: command_line,
                exit_code,
            })
        }
    }

    // ------------------------------------------------------------------
    // Shared write path
    // ------------------------------------------------------------------

    fn command_line(&self, command: &str, args: &[&str]) -> String {
        if args.is_empty() {
            return command.to_string();
        }
        render(
            &self.settings.messages().cmd_full_format,
            &[("command", command), ("args", &args.join(" "))],
        )
    }

    fn write_entry(
        &mut self,
        level: LogLevel,
        event: String,
        impact: i64,
        details: Details,
        semantic: Option<Metadata>,
    ) {
        self.health.update(impact);
        let context = self
            .settings
            .is_heavy(level)
            .then(|| compose_context(&self.identity, self.facts.as_ref(), &self.capture));

        let entry = LogEntry::builder()
            .timestamp(Local::now())
            .level(level)
            .component(self.component.as_str())
            .identity(self.identity.clone())
            .context_id(self.context_id.as_str())
            .event(event)
            .details(details)
            .context(context)
            .semantic(semantic)
            .health(&self.health, impact)
            .build();
        match entry {
            Ok(entry) => self.writer.write(&self.formatter.format(&entry)),
            Err(e) => report(&format!("failed to build log entry: {e}")),
        }
    }
}

/// Prefix for a caller detail whose key the logger itself sets.
const CALLER_KEY_PREFIX: &str = "caller_";

/// Puts `key: value` first. A caller detail under the same key is kept under
/// the prefixed name instead of replacing it.
fn with_leading(key: &str, value: impl fmt::Display, rest: Details) -> Details {
    let mut details = Details::new().with(key, value);
    for (k, v) in rest.iter() {
        if k == key {
            details.insert(format!("{CALLER_KEY_PREFIX}{k}"), v);
        } else {
            details.insert(k, v);
        }
    }
    details
}
