//! Core types for the logging rail.
//!
//! This module provides:
//! - [`LogLevel`] - The fixed level vocabulary
//! - [`Identity`] - `user@host:pid` of the process that wrote an entry
//! - [`Details`] - Insertion-ordered key/value details
//! - [`Metadata`] - Optional semantic block for automated routing
//! - [`LogEntry`] - One logged event
//! - [`LogEntryBuilder`] - Builder with required-field checking

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::context::SystemContext;
use crate::error::LogError;
use crate::health::HealthScore;

/// Entry levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// An operation is starting.
    Operation,
    /// Something worked.
    Success,
    /// Something did not work, for a known reason.
    Failure,
    /// An unexpected error, with a backtrace.
    Error,
    /// A verification result.
    Check,
    /// A system state snapshot.
    Context,
    /// Internal state for debugging.
    Debug,
}

impl LogLevel {
    /// Every level, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Operation,
        Self::Success,
        Self::Failure,
        Self::Error,
        Self::Check,
        Self::Context,
        Self::Debug,
    ];

    /// Text form used in log headers.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Operation => "OPERATION",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Error => "ERROR",
            Self::Check => "CHECK",
            Self::Context => "CONTEXT",
            Self::Debug => "DEBUG",
        }
    }

    /// Whether this level carries a full context when the config says nothing.
    #[must_use]
    pub const fn captures_context_by_default(&self) -> bool {
        !matches!(self, Self::Success | Self::Check)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LogError::InvalidLevel(s.to_string()))
    }
}

/// Who wrote an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    /// Username.
    pub user: String,
    /// Hostname.
    pub host: String,
    /// Process id.
    pub pid: u32,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.pid)
    }
}

impl FromStr for Identity {
    type Err = LogError;

    /// Parses `user@host:pid`. The user ends at the first `@`, the pid starts
    /// after the last `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LogError::Parse {
            line: 0,
            message: format!("invalid identity `{s}`"),
        };
        let (user, rest) = s.trim().split_once('@').ok_or_else(invalid)?;
        let (host, pid) = rest.rsplit_once(':').ok_or_else(invalid)?;
        let pid = pid.parse().map_err(|_| invalid())?;
        Ok(Self {
            user: user.to_string(),
            host: host.to_string(),
            pid,
        })
    }
}

/// Insertion-ordered key → value details.
///
/// Inserting an existing key replaces its value in place, so the first
/// insertion fixes the position. Keys are stored trimmed, with `:` and line
/// breaks replaced by `_`, so every key reads back from the text format
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Details {
    pairs: Vec<(String, String)>,
}

impl Details {
    /// Empty details.
    #[must_use]
    pub const fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        let key = normalize_key(&key.into());
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Looks up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = normalize_key(key);
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Appends a line to the value of `key`, creating it if needed.
    pub(crate) fn append_line(&mut self, key: &str, line: &str) {
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, value)) => {
                value.push('\n');
                value.push_str(line);
            }
            None => self.pairs.push((key.to_string(), line.to_string())),
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().replace([':', '\n', '\r'], "_")
}

impl<K: Into<String>, V: fmt::Display> FromIterator<(K, V)> for Details {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut details = Self::new();
        for (key, value) in iter {
            details.insert(key, value);
        }
        details
    }
}

impl Serialize for Details {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Semantic metadata attached to an entry for automated routing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Primary category, e.g. `file_validation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    /// Granular sub-type, e.g. `permission_check`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_subtype: Option<String>,
    /// Error classification, e.g. `permission_denied`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Structured error context.
    #[serde(skip_serializing_if = "Details::is_empty")]
    pub error_details: Details,
    /// Routing hint, e.g. `automated_fix`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_hint: Option<String>,
    /// Concrete recovery strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_strategy: Option<String>,
    /// Parameters for the recovery strategy.
    #[serde(skip_serializing_if = "Details::is_empty")]
    pub recovery_params: Details,
    /// Expected state.
    #[serde(skip_serializing_if = "Details::is_empty")]
    pub expected: Details,
    /// Actual state.
    #[serde(skip_serializing_if = "Details::is_empty")]
    pub actual: Details,
}

impl Metadata {
    /// Empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operation type.
    #[must_use]
    pub fn operation_type(mut self, value: impl Into<String>) -> Self {
        self.operation_type = Some(value.into());
        self
    }

    /// Sets the operation subtype.
    #[must_use]
    pub fn operation_subtype(mut self, value: impl Into<String>) -> Self {
        self.operation_subtype = Some(value.into());
        self
    }

    /// Sets the error type.
    #[must_use]
    pub fn error_type(mut self, value: impl Into<String>) -> Self {
        self.error_type = Some(value.into());
        self
    }

    /// Adds an error detail.
    #[must_use]
    pub fn error_detail(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.error_details.insert(key, value);
        self
    }

    /// Sets the recovery hint.
    #[must_use]
    pub fn recovery_hint(mut self, value: impl Into<String>) -> Self {
        self.recovery_hint = Some(value.into());
        self
    }

    /// Sets the recovery strategy.
    #[must_use]
    pub fn recovery_strategy(mut self, value: impl Into<String>) -> Self {
        self.recovery_strategy = Some(value.into());
        self
    }

    /// Adds a recovery parameter.
    #[must_use]
    pub fn recovery_param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.recovery_params.insert(key, value);
        self
    }

    /// Adds an expected-state value.
    #[must_use]
    pub fn expected(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.expected.insert(key, value);
        self
    }

    /// Adds an actual-state value.
    #[must_use]
    pub fn actual(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.actual.insert(key, value);
        self
    }
}

/// One logged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// When the entry was created.
    pub timestamp: DateTime<Local>,
    /// Entry level.
    pub level: LogLevel,
    /// Component the writing logger is bound to.
    pub component: String,
    /// Writer identity.
    pub identity: Identity,
    /// Context id correlating all entries of one run.
    pub context_id: String,
    /// Human description.
    pub event: String,
    /// Caller-supplied details.
    pub details: Details,
    /// Full context snapshot, only for heavy levels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<SystemContext>,
    /// Semantic block, only when supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic: Option<Metadata>,
    /// Raw health after this entry's delta.
    pub raw_health: i64,
    /// Normalized health after this entry's delta.
    pub normalized_health: i64,
    /// This entry's delta.
    pub health_impact: i64,
}

impl LogEntry {
    /// Creates a new log entry builder.
    #[must_use]
    pub fn builder() -> LogEntryBuilder {
        LogEntryBuilder::default()
    }
}

/// Builder for constructing log entries.
#[derive(Debug, Default)]
pub struct LogEntryBuilder {
    timestamp: Option<DateTime<Local>>,
    level: Option<LogLevel>,
    component: Option<String>,
    identity: Option<Identity>,
    context_id: Option<String>,
    event: Option<String>,
    details: Details,
    context: Option<SystemContext>,
    semantic: Option<Metadata>,
    raw_health: i64,
    normalized_health: i64,
    health_impact: i64,
}

impl LogEntryBuilder {
    /// Sets the timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the level.
    #[must_use]
    pub const fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the component.
    #[must_use]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Sets the writer identity.
    #[must_use]
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Sets the context id.
    #[must_use]
    pub fn context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    /// Sets the event text.
    #[must_use]
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Replaces the details.
    #[must_use]
    pub fn details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    /// Adds one detail.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.details.insert(key, value);
        self
    }

    /// Attaches or clears the full context.
    #[must_use]
    pub fn context(mut self, context: Option<SystemContext>) -> Self {
        self.context = context;
        self
    }

    /// Attaches or clears semantic metadata.
    #[must_use]
    pub fn semantic(mut self, semantic: Option<Metadata>) -> Self {
        self.semantic = semantic;
        self
    }

    /// Records `score` as it stands after applying `impact`.
    #[must_use]
    pub const fn health(mut self, score: &HealthScore, impact: i64) -> Self {
        self.raw_health = score.raw();
        self.normalized_health = score.normalized();
        self.health_impact = impact;
        self
    }

    /// Builds the log entry, returning an error if required fields are missing.
    ///
    /// # Errors
    ///
    /// Returns an error if any required field is not set.
    pub fn build(self) -> Result<LogEntry, LogError> {
        let timestamp = self
            .timestamp
            .ok_or(LogError::MissingField("timestamp"))?;
        let level = self.level.ok_or(LogError::MissingField("level"))?;
        let component = self
            .component
            .ok_or(LogError::MissingField("component"))?;
        let identity = self.identity.ok_or(LogError::MissingField("identity"))?;
        let context_id = self
            .context_id
            .ok_or(LogError::MissingField("context_id"))?;
        let event = self.event.ok_or(LogError::MissingField("event"))?;

        Ok(LogEntry {
            timestamp,
            level,
            component,
            identity,
            context_id,
            event,
            details: self.details,
            context: self.context,
            semantic: self.semantic,
            raw_health: self.raw_health,
            normalized_health: self.normalized_health,
            health_impact: self.health_impact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn identity() -> Identity {
        Identity {
            user: "alice".to_string(),
            host: "box".to_string(),
            pid: 4821,
        }
    }

    // ===========================================
    // LogLevel Tests
    // ===========================================

    #[test_case("OPERATION", LogLevel::Operation)]
    #[test_case("success", LogLevel::Success)]
    #[test_case(" Failure ", LogLevel::Failure)]
    #[test_case("ERROR", LogLevel::Error)]
    #[test_case("CHECK", LogLevel::Check)]
    #[test_case("CONTEXT", LogLevel::Context)]
    #[test_case("DEBUG", LogLevel::Debug)]
    fn level_from_str(input: &str, expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>().ok(), Some(expected));
    }

    #[test]
    fn level_from_str_rejects_unknown() {
        let err = "LOUD".parse::<LogLevel>();
        assert!(matches!(err, Err(LogError::InvalidLevel(_))));
    }

    #[test]
    fn level_display_round_trips() {
        for level in LogLevel::ALL {
            assert_eq!(level.to_string().parse::<LogLevel>().ok(), Some(level));
        }
    }

    #[test]
    fn level_serializes_uppercase() {
        let json = serde_json::to_string(&LogLevel::Success).expect("serialize");
        assert_eq!(json, "\"SUCCESS\"");
    }

    // ===========================================
    // Identity Tests
    // ===========================================

    #[test]
    fn identity_display_and_parse() {
        let id = identity();
        assert_eq!(id.to_string(), "alice@box:4821");
        assert_eq!("alice@box:4821".parse::<Identity>().ok(), Some(id));
    }

    #[test]
    fn identity_parse_host_with_colons() {
        let id: Identity = "bob@fe80::1:77".parse().expect("parse");
        assert_eq!(id.user, "bob");
        assert_eq!(id.host, "fe80::1");
        assert_eq!(id.pid, 77);
    }

    #[test]
    fn identity_parse_rejects_garbage() {
        assert!("no-at-sign".parse::<Identity>().is_err());
        assert!("a@b:notanumber".parse::<Identity>().is_err());
    }

    // ===========================================
    // Details Tests
    // ===========================================

    #[test]
    fn details_keep_insertion_order() {
        let details = Details::new()
            .with("zeta", 1)
            .with("alpha", "two")
            .with("mid", true);

        let keys: Vec<&str> = details.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(details.get("mid"), Some("true"));
    }

    #[test]
    fn details_replace_in_place() {
        let details = Details::new().with("a", 1).with("b", 2).with("a", 3);
        assert_eq!(details.len(), 2);
        assert_eq!(details.iter().next(), Some(("a", "3")));
    }

    #[test]
    fn details_keys_are_normalized() {
        let details = Details::new()
            .with("url:port", "x")
            .with("  indented", "v")
            .with("multi\nline", 1);

        let keys: Vec<&str> = details.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["url_port", "indented", "multi_line"]);
        assert_eq!(details.get("url:port"), Some("x"));
        assert_eq!(details.get("indented"), Some("v"));
    }

    #[test]
    fn details_from_iterator() {
        let details: Details = [("x", 1), ("y", 2)].into_iter().collect();
        assert_eq!(details.get("y"), Some("2"));
    }

    #[test]
    fn details_serialize_as_ordered_map() {
        let details = Details::new().with("b", 1).with("a", 2);
        let json = serde_json::to_string(&details).expect("serialize");
        assert_eq!(json, r#"{"b":"1","a":"2"}"#);
    }

    // ===========================================
    // Builder Tests
    // ===========================================

    #[test]
    fn builder_requires_fields() {
        let result = LogEntry::builder().level(LogLevel::Debug).build();
        assert!(matches!(result, Err(LogError::MissingField("timestamp"))));

        let result = LogEntry::builder()
            .timestamp(Local::now())
            .level(LogLevel::Debug)
            .component("demo")
            .identity(identity())
            .context_id("demo-1-2")
            .build();
        assert!(matches!(result, Err(LogError::MissingField("event"))));
    }

    #[test]
    fn builder_builds_complete_entry() {
        let mut score = HealthScore::new();
        score.declare_total(50);
        score.update(5);
        score.update(20);

        let entry = LogEntry::builder()
            .timestamp(Local::now())
            .level(LogLevel::Success)
            .component("demo")
            .identity(identity())
            .context_id("demo-4821-1")
            .event("done")
            .detail("files", 3)
            .semantic(Some(Metadata::new().operation_type("build")))
            .health(&score, 20)
            .build()
            .expect("build");

        assert_eq!(entry.level, LogLevel::Success);
        assert_eq!(entry.details.get("files"), Some("3"));
        assert!(entry.context.is_none());
        assert_eq!(
            entry.semantic.and_then(|m| m.operation_type),
            Some("build".to_string())
        );
        assert_eq!(entry.raw_health, 25);
        assert_eq!(entry.normalized_health, 50);
        assert_eq!(entry.health_impact, 20);
    }
}
