//! Canonical text form of a [`LogEntry`].
//!
//! ```text
//! [2025-11-21 14:03:05.120] SUCCESS | validate | alice@host:4821 | validate-4821-169 | HEALTH: 42% (raw: 21, Δ+10) 🤍 [████████░░░░░░░░░░░░]
//!   EVENT: Validation passed
//!   DETAILS:
//!     files_checked: 15
//!   CONTEXT:
//!     Shell: bash (interactive, login)
//!     CWD: /home/alice/project
//!     ...
//!   SEMANTIC:
//!     operation_type: file_validation
//! ---
//! ```
//!
//! Sections without content are left out. [`crate::parser::LogParser`] reads
//! this format back.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

use crate::config::{DEFAULT_ENTRY_SEPARATOR, DEFAULT_TIMESTAMP_FORMAT, Settings};
use crate::context::SystemContext;
use crate::health::{SeverityBands, health_bar};
use crate::types::{Details, LogEntry, Metadata};

pub(crate) const SECTION_EVENT: &str = "EVENT:";
pub(crate) const SECTION_DETAILS: &str = "DETAILS:";
pub(crate) const SECTION_CONTEXT: &str = "CONTEXT:";
pub(crate) const SECTION_SEMANTIC: &str = "SEMANTIC:";

pub(crate) const CTX_SHELL: &str = "Shell";
pub(crate) const CTX_CWD: &str = "CWD";
pub(crate) const CTX_ENVIRONMENT: &str = "Environment";
pub(crate) const CTX_SECURITY: &str = "Security";
pub(crate) const CTX_RESOURCES: &str = "Resources";

pub(crate) const SEM_ERROR_DETAILS: &str = "error_details";
pub(crate) const SEM_RECOVERY_PARAMS: &str = "recovery_params";
pub(crate) const SEM_EXPECTED: &str = "expected";
pub(crate) const SEM_ACTUAL: &str = "actual";

/// Marker value introducing an indented multi-line block.
pub(crate) const BLOCK_MARKER: &str = "|";

const SECTION_INDENT: &str = "  ";
const FIELD_INDENT: &str = "    ";
const NESTED_INDENT: &str = "      ";

/// Returns `format` if chrono can both render it and read a full date and
/// time back from the result, else the default format.
pub(crate) fn checked_timestamp_format(format: &str) -> String {
    let renders = !StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
    if renders && reads_back(format) {
        format.to_string()
    } else {
        tracing::debug!(format, "unusable timestamp format; using default");
        DEFAULT_TIMESTAMP_FORMAT.to_string()
    }
}

fn reads_back(format: &str) -> bool {
    let Some(sample) =
        NaiveDate::from_ymd_opt(2001, 2, 3).and_then(|d| d.and_hms_milli_opt(4, 5, 6, 789))
    else {
        return false;
    };
    let text = sample.format(format).to_string();
    NaiveDateTime::parse_from_str(&text, format).is_ok()
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Serializes entries into the multi-line text format.
#[derive(Debug, Clone)]
pub struct EntryFormatter {
    timestamp_format: String,
    separator: String,
    bands: SeverityBands,
}

impl Default for EntryFormatter {
    fn default() -> Self {
        Self::new(
            DEFAULT_TIMESTAMP_FORMAT,
            DEFAULT_ENTRY_SEPARATOR,
            SeverityBands::default(),
        )
    }
}

impl EntryFormatter {
    /// Creates a formatter. An unusable timestamp format falls back to the
    /// default one.
    #[must_use]
    pub fn new(timestamp_format: &str, separator: &str, bands: SeverityBands) -> Self {
        Self {
            timestamp_format: checked_timestamp_format(timestamp_format),
            separator: separator.to_string(),
            bands,
        }
    }

    /// Formatter configured from `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.timestamp_format(),
            settings.entry_separator(),
            settings.severity_bands(),
        )
    }

    /// Severity bands used for the header indicator.
    #[must_use]
    pub const fn bands(&self) -> &SeverityBands {
        &self.bands
    }

    /// Renders `entry`, ending with the separator line (no trailing newline).
    #[must_use]
    pub fn format(&self, entry: &LogEntry) -> String {
        let mut out = String::with_capacity(512);
        self.write_header(&mut out, entry);
        let _ = writeln!(out, "{SECTION_INDENT}{SECTION_EVENT} {}", single_line(&entry.event));

        if !entry.details.is_empty() {
            let _ = writeln!(out, "{SECTION_INDENT}{SECTION_DETAILS}");
            write_details(&mut out, &entry.details);
        }
        if let Some(context) = &entry.context {
            write_context(&mut out, context);
        }
        if let Some(semantic) = &entry.semantic {
            write_semantic(&mut out, semantic);
        }

        out.push_str(&self.separator);
        out
    }

    fn write_header(&self, out: &mut String, entry: &LogEntry) {
        let health = entry.normalized_health;
        let _ = writeln!(
            out,
            "[{}] {} | {} | {} | {} | HEALTH: {health}% (raw: {}, Δ{:+}) {} {}",
            entry.timestamp.format(&self.timestamp_format),
            entry.level,
            entry.component,
            entry.identity,
            entry.context_id,
            entry.raw_health,
            entry.health_impact,
            self.bands.indicator(health),
            health_bar(health),
        );
    }
}

fn write_details(out: &mut String, details: &Details) {
    for (key, value) in details.iter() {
        if value.contains('\n') {
            let _ = writeln!(out, "{FIELD_INDENT}{key}: {BLOCK_MARKER}");
            for line in value.split('\n') {
                let _ = writeln!(out, "{NESTED_INDENT}{}", line.trim_end_matches('\r'));
            }
        } else if value.trim() == BLOCK_MARKER {
            // a bare marker value is written as a one-line block
            let _ = writeln!(out, "{FIELD_INDENT}{key}: {BLOCK_MARKER}");
            let _ = writeln!(out, "{NESTED_INDENT}{BLOCK_MARKER}");
        } else {
            let _ = writeln!(out, "{FIELD_INDENT}{key}: {}", value.trim());
        }
    }
}

fn write_submap<'a>(
    out: &mut String,
    name: &str,
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) {
    let mut pairs = pairs.into_iter().peekable();
    if pairs.peek().is_none() {
        return;
    }
    let _ = writeln!(out, "{FIELD_INDENT}{name}:");
    for (key, value) in pairs {
        let _ = writeln!(out, "{NESTED_INDENT}{key}: {}", single_line(value));
    }
}

fn write_context(out: &mut String, context: &SystemContext) {
    let _ = writeln!(out, "{SECTION_INDENT}{SECTION_CONTEXT}");
    let _ = writeln!(out, "{FIELD_INDENT}{CTX_SHELL}: {}", context.shell);
    let _ = writeln!(out, "{FIELD_INDENT}{CTX_CWD}: {}", single_line(&context.cwd));
    write_submap(
        out,
        CTX_ENVIRONMENT,
        context
            .environment
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );

    let security = &context.security;
    let installed = security.installed.to_string();
    let valid = security.valid.to_string();
    write_submap(
        out,
        CTX_SECURITY,
        [
            ("installed", installed.as_str()),
            ("valid", valid.as_str()),
            ("permissions", security.permissions.as_str()),
        ],
    );

    let resources = &context.resources;
    write_submap(
        out,
        CTX_RESOURCES,
        [
            ("load", resources.load.as_str()),
            ("memory", resources.memory.as_str()),
            ("disk", resources.disk.as_str()),
        ],
    );
}

fn write_semantic(out: &mut String, semantic: &Metadata) {
    let _ = writeln!(out, "{SECTION_INDENT}{SECTION_SEMANTIC}");
    let scalars = [
        ("operation_type", &semantic.operation_type),
        ("operation_subtype", &semantic.operation_subtype),
        ("error_type", &semantic.error_type),
        ("recovery_hint", &semantic.recovery_hint),
        ("recovery_strategy", &semantic.recovery_strategy),
    ];
    for (key, value) in scalars {
        if let Some(value) = value {
            let _ = writeln!(out, "{FIELD_INDENT}{key}: {}", single_line(value));
        }
    }
    write_submap(out, SEM_ERROR_DETAILS, semantic.error_details.iter());
    write_submap(out, SEM_RECOVERY_PARAMS, semantic.recovery_params.iter());
    write_submap(out, SEM_EXPECTED, semantic.expected.iter());
    write_submap(out, SEM_ACTUAL, semantic.actual.iter());
}
