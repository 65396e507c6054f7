//! Linear filtering over parsed entries.

use chrono::{DateTime, Local};

use crate::types::{LogEntry, LogLevel};

/// Time range for filtering entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub start: Option<DateTime<Local>>,
    /// End of the range (exclusive).
    pub end: Option<DateTime<Local>>,
}

impl TimeRange {
    /// Creates a time range with the given bounds.
    #[must_use]
    pub const fn new(start: Option<DateTime<Local>>, end: Option<DateTime<Local>>) -> Self {
        Self { start, end }
    }

    /// Everything from `start` on.
    #[must_use]
    pub const fn since(start: DateTime<Local>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Checks if a timestamp falls within this range.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Local>) -> bool {
        self.start.is_none_or(|start| timestamp >= start)
            && self.end.is_none_or(|end| timestamp < end)
    }
}

/// Filter criteria. Empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Accepted levels.
    pub levels: Vec<LogLevel>,
    /// Accepted components.
    pub components: Vec<String>,
    /// Accepted context ids.
    pub context_ids: Vec<String>,
    /// Case-insensitive text searched in the event and detail values.
    pub contains: Option<String>,
    /// Time range.
    pub time_range: TimeRange,
}

impl LogFilter {
    /// A filter that matches every entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.levels.push(level);
        self
    }

    /// Adds a component.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Adds a context id.
    #[must_use]
    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_ids.push(context_id.into());
        self
    }

    /// Sets the text search.
    #[must_use]
    pub fn with_contains(mut self, text: impl Into<String>) -> Self {
        self.contains = Some(text.into());
        self
    }

    /// Sets the time range.
    #[must_use]
    pub const fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    /// Checks `entry` against every criterion.
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if !self.levels.is_empty() && !self.levels.contains(&entry.level) {
            return false;
        }
        if !self.components.is_empty() && !self.components.contains(&entry.component) {
            return false;
        }
        if !self.context_ids.is_empty() && !self.context_ids.contains(&entry.context_id) {
            return false;
        }
        if let Some(search) = &self.contains {
            let needle = search.to_lowercase();
            let hit = entry.event.to_lowercase().contains(&needle)
                || entry
                    .details
                    .iter()
                    .any(|(_, value)| value.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        self.time_range.contains(entry.timestamp)
    }

    /// Entries that match, in their original order.
    pub fn apply<'a>(&'a self, entries: &'a [LogEntry]) -> impl Iterator<Item = &'a LogEntry> + 'a {
        entries.iter().filter(move |entry| self.matches(entry))
    }
}
