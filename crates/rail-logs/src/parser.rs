//! Reads formatted log text back into [`LogEntry`] values.
//!
//! The parser is a line-oriented state machine:
//! - a header line starts a new entry, flushing the one in progress
//! - section lines (`EVENT:`, `DETAILS:`, `CONTEXT:`, `SEMANTIC:`) switch
//!   the current section
//! - indented lines fill the current section
//! - the separator line, or the end of input, flushes the entry
//!
//! Damage is local. A line that looks like a header but does not parse
//! flushes the entry in progress, is remembered as the first error, and
//! parsing continues with the next line.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{DEFAULT_ENTRY_SEPARATOR, DEFAULT_TIMESTAMP_FORMAT, Settings};
use crate::context::{ResourceMetrics, SecurityContext, ShellContext, SystemContext};
use crate::error::{LogError, Result};
use crate::format::{
    BLOCK_MARKER, CTX_CWD, CTX_ENVIRONMENT, CTX_RESOURCES, CTX_SECURITY, CTX_SHELL,
    SECTION_CONTEXT, SECTION_DETAILS, SECTION_EVENT, SECTION_SEMANTIC, SEM_ACTUAL,
    SEM_ERROR_DETAILS, SEM_EXPECTED, SEM_RECOVERY_PARAMS, checked_timestamp_format,
};
use crate::types::{Details, Identity, LogEntry, LogLevel, Metadata};
use crate::writer::rotated_name;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[(?P<ts>[^\]]+)\] (?P<level>\S+) \| (?P<component>.*?) \| (?P<identity>.*?) \| (?P<ctx>.*?) \| HEALTH: (?P<norm>-?\d+)% \(raw: (?P<raw>-?\d+), Δ(?P<delta>[+-]?\d+)\)",
    )
    .unwrap_or_else(|e| unreachable!("header regex is valid: {e}"))
});

const FIELD_INDENT: usize = 4;
const NESTED_INDENT: usize = 6;

/// Entries recovered from a log, plus the first problem met, if any.
#[derive(Debug, Default)]
pub struct ParsedLog {
    /// Entries in file order.
    pub entries: Vec<LogEntry>,
    /// First malformed header or read error.
    pub error: Option<LogError>,
}

impl ParsedLog {
    /// Whether the whole input parsed cleanly.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

/// Parser matching the formatter's timestamp format and separator.
#[derive(Debug, Clone)]
pub struct LogParser {
    timestamp_format: String,
    separator: String,
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_FORMAT, DEFAULT_ENTRY_SEPARATOR)
    }
}

impl LogParser {
    /// Creates a parser for the given timestamp format and separator.
    #[must_use]
    pub fn new(timestamp_format: &str, separator: &str) -> Self {
        Self {
            timestamp_format: checked_timestamp_format(timestamp_format),
            separator: separator.to_string(),
        }
    }

    /// Parser configured from `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.timestamp_format(), settings.entry_separator())
    }

    /// Parses in-memory text.
    #[must_use]
    pub fn parse_str(&self, text: &str) -> ParsedLog {
        let mut state = ParseState::new(self);
        for (index, line) in text.lines().enumerate() {
            state.feed(index + 1, line);
        }
        state.finish()
    }

    /// Parses one log file.
    ///
    /// A read error part way through stops parsing; the entries gathered so
    /// far are returned together with the error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file cannot be opened.
    pub fn read_log_file(&self, path: impl AsRef<Path>) -> Result<ParsedLog> {
        let file = File::open(path.as_ref())?;
        let mut state = ParseState::new(self);
        for (index, line) in BufReader::new(file).lines().enumerate() {
            match line {
                Ok(line) => state.feed(index + 1, &line),
                Err(e) => {
                    state.record(LogError::Io(e));
                    break;
                }
            }
        }
        Ok(state.finish())
    }

    /// Parses the archives of `path`, oldest first, then the live file.
    ///
    /// Missing archives are skipped. The first error from any file is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the live file nor any archive can be
    /// opened.
    pub fn read_log_history(&self, path: impl AsRef<Path>, max_archives: u32) -> Result<ParsedLog> {
        let path = path.as_ref();
        let mut files: Vec<_> = (1..=max_archives)
            .rev()
            .map(|index| rotated_name(path, index))
            .filter(|p| p.exists())
            .collect();
        let live_exists = path.exists();
        if live_exists || files.is_empty() {
            files.push(path.to_path_buf());
        }

        let mut combined = ParsedLog::default();
        for file in files {
            let parsed = self.read_log_file(&file)?;
            combined.entries.extend(parsed.entries);
            if combined.error.is_none() {
                combined.error = parsed.error;
            }
        }
        Ok(combined)
    }

    fn parse_timestamp(&self, text: &str) -> Option<DateTime<Local>> {
        let naive = NaiveDateTime::parse_from_str(text, &self.timestamp_format).ok()?;
        Local.from_local_datetime(&naive).earliest()
    }

    fn parse_header(&self, line: &str) -> std::result::Result<Draft, String> {
        let caps = HEADER_RE
            .captures(line)
            .ok_or_else(|| "malformed header".to_string())?;
        let timestamp = self
            .parse_timestamp(&caps["ts"])
            .ok_or_else(|| format!("bad timestamp `{}`", &caps["ts"]))?;
        let level: LogLevel = caps["level"].parse().map_err(|e: LogError| e.to_string())?;
        let identity: Identity = caps["identity"]
            .parse()
            .map_err(|_| format!("bad identity `{}`", &caps["identity"]))?;
        let number = |name: &str| {
            caps[name]
                .parse::<i64>()
                .map_err(|e| format!("bad {name} `{}`: {e}", &caps[name]))
        };
        Ok(Draft {
            timestamp,
            level,
            component: caps["component"].to_string(),
            identity,
            context_id: caps["ctx"].to_string(),
            normalized: number("norm")?,
            raw: number("raw")?,
            delta: number("delta")?,
            event: String::new(),
            details: Details::new(),
            context: None,
            semantic: None,
        })
    }
}

/// Reads every entry of `path` with default settings.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn read_log_file(path: impl AsRef<Path>) -> Result<ParsedLog> {
    LogParser::default().read_log_file(path)
}

/// Reads `path` and its archives, oldest first, with default settings.
///
/// # Errors
///
/// Returns an error if nothing can be opened.
pub fn read_log_history(path: impl AsRef<Path>) -> Result<ParsedLog> {
    LogParser::default().read_log_history(path, crate::config::DEFAULT_MAX_ARCHIVES)
}

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Details,
    Context,
    Semantic,
}

/// An entry under construction.
#[derive(Debug)]
struct Draft {
    timestamp: DateTime<Local>,
    level: LogLevel,
    component: String,
    identity: Identity,
    context_id: String,
    normalized: i64,
    raw: i64,
    delta: i64,
    event: String,
    details: Details,
    context: Option<ContextDraft>,
    semantic: Option<Metadata>,
}

impl Draft {
    fn into_entry(self) -> LogEntry {
        let context = self.context.map(|c| c.into_context(self.identity.clone()));
        LogEntry {
            timestamp: self.timestamp,
            level: self.level,
            component: self.component,
            identity: self.identity,
            context_id: self.context_id,
            event: self.event,
            details: self.details,
            context,
            semantic: self.semantic,
            raw_health: self.raw,
            normalized_health: self.normalized,
            health_impact: self.delta,
        }
    }
}

#[derive(Debug, Default)]
struct ContextDraft {
    shell: Option<ShellContext>,
    cwd: String,
    environment: BTreeMap<String, String>,
    security: BTreeMap<String, String>,
    resources: BTreeMap<String, String>,
}

impl ContextDraft {
    fn into_context(mut self, identity: Identity) -> SystemContext {
        let take = |map: &mut BTreeMap<String, String>, key: &str| {
            map.remove(key).unwrap_or_default()
        };
        let security = SecurityContext {
            installed: take(&mut self.security, "installed") == "true",
            valid: take(&mut self.security, "valid") == "true",
            permissions: take(&mut self.security, "permissions"),
        };
        let resources = ResourceMetrics {
            load: take(&mut self.resources, "load"),
            memory: take(&mut self.resources, "memory"),
            disk: take(&mut self.resources, "disk"),
        };
        SystemContext {
            identity,
            shell: self.shell.unwrap_or(ShellContext {
                kind: String::new(),
                interactive: false,
                login: false,
            }),
            cwd: self.cwd,
            environment: self.environment,
            security,
            resources,
        }
    }
}

struct ParseState<'p> {
    parser: &'p LogParser,
    entries: Vec<LogEntry>,
    error: Option<LogError>,
    current: Option<Draft>,
    section: Section,
    submap: Option<String>,
    block: Option<(String, bool)>,
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn split_field(content: &str) -> Option<(&str, &str)> {
    content
        .split_once(':')
        .map(|(key, value)| (key.trim(), value.trim()))
}

impl<'p> ParseState<'p> {
    fn new(parser: &'p LogParser) -> Self {
        Self {
            parser,
            entries: Vec::new(),
            error: None,
            current: None,
            section: Section::Header,
            submap: None,
            block: None,
        }
    }

    fn record(&mut self, error: LogError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn flush(&mut self) {
        if let Some(draft) = self.current.take() {
            self.entries.push(draft.into_entry());
        }
        self.section = Section::Header;
        self.submap = None;
        self.block = None;
    }

    fn finish(mut self) -> ParsedLog {
        self.flush();
        ParsedLog {
            entries: self.entries,
            error: self.error,
        }
    }

    fn feed(&mut self, line_no: usize, line: &str) {
        let line = line.trim_end_matches('\r');

        if line.starts_with('[') && line.contains(" | ") {
            self.flush();
            match self.parser.parse_header(line) {
                Ok(draft) => self.current = Some(draft),
                Err(message) => self.record(LogError::Parse {
                    line: line_no,
                    message,
                }),
            }
            return;
        }

        if line.trim_end() == self.parser.separator {
            self.flush();
            return;
        }

        if self.current.is_none() {
            return;
        }
        if line.trim().is_empty() {
            // blank lines only matter inside a multi-line detail block
            if self.block.is_some() && line.len() >= NESTED_INDENT {
                self.field_line(line, NESTED_INDENT);
            }
            return;
        }

        let indent = indent_of(line);
        if indent == 2 {
            self.enter_section(line.trim());
        } else if indent >= FIELD_INDENT {
            self.field_line(line, indent);
        }
    }

    fn enter_section(&mut self, content: &str) {
        self.submap = None;
        self.block = None;
        let Some(draft) = self.current.as_mut() else {
            return;
        };
        if let Some(event) = content.strip_prefix(SECTION_EVENT) {
            draft.event = event.trim().to_string();
            self.section = Section::Header;
        } else if content == SECTION_DETAILS {
            self.section = Section::Details;
        } else if content == SECTION_CONTEXT {
            draft.context.get_or_insert_with(ContextDraft::default);
            self.section = Section::Context;
        } else if content == SECTION_SEMANTIC {
            draft.semantic.get_or_insert_with(Metadata::default);
            self.section = Section::Semantic;
        }
    }

    fn field_line(&mut self, line: &str, indent: usize) {
        let Some(draft) = self.current.as_mut() else {
            return;
        };
        match self.section {
            Section::Header => {}
            Section::Details => {
                if indent >= NESTED_INDENT {
                    if let Some((key, started)) = self.block.as_mut() {
                        let text = line.get(NESTED_INDENT..).unwrap_or_default();
                        if *started {
                            draft.details.append_line(key, text);
                        } else {
                            draft.details.insert(key.as_str(), text);
                            *started = true;
                        }
                    }
                    return;
                }
                self.block = None;
                if let Some((key, value)) = split_field(line.trim()) {
                    if value == BLOCK_MARKER {
                        draft.details.insert(key, "");
                        self.block = Some((key.to_string(), false));
                    } else {
                        draft.details.insert(key, value);
                    }
                }
            }
            Section::Context => {
                let Some(context) = draft.context.as_mut() else {
                    return;
                };
                let content = line.trim();
                if indent >= NESTED_INDENT {
                    let Some((key, value)) = split_field(content) else {
                        return;
                    };
                    let map = match self.submap.as_deref() {
                        Some(CTX_ENVIRONMENT) => &mut context.environment,
                        Some(CTX_SECURITY) => &mut context.security,
                        Some(CTX_RESOURCES) => &mut context.resources,
                        _ => return,
                    };
                    map.insert(key.to_string(), value.to_string());
                    return;
                }
                self.submap = None;
                match content.trim_end_matches(':') {
                    name @ (CTX_ENVIRONMENT | CTX_SECURITY | CTX_RESOURCES) => {
                        self.submap = Some(name.to_string());
                    }
                    _ => {
                        if let Some((key, value)) = split_field(content) {
                            match key {
                                CTX_SHELL => context.shell = ShellContext::parse(value),
                                CTX_CWD => context.cwd = value.to_string(),
                                _ => {}
                            }
                        }
                    }
                }
            }
            Section::Semantic => {
                let Some(semantic) = draft.semantic.as_mut() else {
                    return;
                };
                let content = line.trim();
                if indent >= NESTED_INDENT {
                    let Some((key, value)) = split_field(content) else {
                        return;
                    };
                    let map = match self.submap.as_deref() {
                        Some(SEM_ERROR_DETAILS) => &mut semantic.error_details,
                        Some(SEM_RECOVERY_PARAMS) => &mut semantic.recovery_params,
                        Some(SEM_EXPECTED) => &mut semantic.expected,
                        Some(SEM_ACTUAL) => &mut semantic.actual,
                        _ => return,
                    };
                    map.insert(key, value);
                    return;
                }
                self.submap = None;
                match content.trim_end_matches(':') {
                    name @ (SEM_ERROR_DETAILS | SEM_RECOVERY_PARAMS | SEM_EXPECTED
                    | SEM_ACTUAL) => {
                        self.submap = Some(name.to_string());
                    }
                    _ => {
                        let Some((key, value)) = split_field(content) else {
                            return;
                        };
                        let slot = match key {
                            "operation_type" => &mut semantic.operation_type,
                            "operation_subtype" => &mut semantic.operation_subtype,
                            "error_type" => &mut semantic.error_type,
                            "recovery_hint" => &mut semantic.recovery_hint,
                            "recovery_strategy" => &mut semantic.recovery_strategy,
                            _ => return,
                        };
                        *slot = Some(value.to_string());
                    }
                }
            }
        }
    }
}
