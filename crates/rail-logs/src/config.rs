//! Rail configuration.
//!
//! Settings come from a TOML file loaded at most once per process:
//! - `$RAIL_CONFIG` when set
//! - otherwise `~/.rail/config/logging.toml`
//!
//! Every section derives its `Default` from hardcoded constants and is
//! `#[serde(default)]`, so a file only has to name the fields it changes.
//! When the file is missing or malformed the rail runs on [`Settings::defaults`]
//! and [`Settings::is_loaded`] reports `false`.
//!
//! Readers go through the resolving accessors on [`Settings`], which apply the
//! layered fallback per field: a loaded, non-empty value wins, anything else
//! falls back to the constant.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::context::CaptureSettings;
use crate::error::{LogError, Result};
use crate::health::{HealthBand, SeverityBands};
use crate::types::LogLevel;
use crate::writer::RotationPolicy;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "RAIL_CONFIG";

const RAIL_HOME_DIR: &str = ".rail";
const CONFIG_SUBDIR: &str = "config";
const CONFIG_FILE_NAME: &str = "logging.toml";

pub(crate) const DEFAULT_BASE_DIR: &str = ".rail/system";
pub(crate) const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
pub(crate) const DEFAULT_ENTRY_SEPARATOR: &str = "---";
pub(crate) const DEFAULT_LOG_EXTENSION: &str = "log";
pub(crate) const DEFAULT_CONTEXT_ID_FORMAT: &str = "{component}-{pid}-{nanos}";
pub(crate) const DEFAULT_SECURITY_FILE: &str = "/etc/sudoers.d/90-rail-safe-operations";
pub(crate) const DEFAULT_SECURITY_MODE: &str = "0440";
pub(crate) const DEFAULT_ENV_PREFIX: &str = "RAIL_";
pub(crate) const DEFAULT_UNKNOWN: &str = "unknown";
pub(crate) const DEFAULT_STACK_BUFFER_SIZE: usize = 4096;

pub(crate) const DEFAULT_EVENT_OP_START: &str = "Starting operation: {command}";
pub(crate) const DEFAULT_EVENT_CHECK: &str = "Checking: {what}";
pub(crate) const DEFAULT_EVENT_SNAPSHOT: &str = "System state snapshot: {label}";
pub(crate) const DEFAULT_EVENT_CMD_FAILED: &str = "Command failed: {command}";
pub(crate) const DEFAULT_EVENT_CMD_SUCCESS: &str = "Command completed: {command}";
pub(crate) const DEFAULT_CMD_FULL_FORMAT: &str = "{command} {args}";
pub(crate) const DEFAULT_DURATION_FORMAT: &str = "{ms}ms";

pub(crate) const DEFAULT_CMD_OPERATION_IMPACT: i64 = 0;
pub(crate) const DEFAULT_CMD_FAILURE_IMPACT: i64 = -10;
pub(crate) const DEFAULT_CMD_SUCCESS_IMPACT: i64 = 10;

pub(crate) const DEFAULT_MAX_SIZE_MB: u64 = 10;
pub(crate) const DEFAULT_MAX_ARCHIVES: u32 = 5;

const DEFAULT_COMMANDS: &[&str] = &["validate", "test", "status", "diagnose"];
const DEFAULT_SCRIPTS: &[&str] = &["build"];
const DEFAULT_LIBRARIES: &[&str] = &[
    "operations",
    "sudoers",
    "environment",
    "display",
    "logging",
    "debugging",
];

const DEFAULT_ENV_VARS: &[&str] = &[
    "DEBIAN_FRONTEND",
    "NEEDRESTART_MODE",
    "NEEDRESTART_SUSPEND",
    "PIP_NO_INPUT",
    "NPM_CONFIG_YES",
    "GIT_EDITOR",
    "EDITOR",
    "VISUAL",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Full-context flags used when the config does not provide a map.
#[must_use]
pub fn default_full_context() -> BTreeMap<String, bool> {
    LogLevel::ALL
        .iter()
        .map(|level| (level.as_str().to_string(), level.captures_context_by_default()))
        .collect()
}

// ============================================================================
// File sections
// ============================================================================

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Base directory for logs. Relative paths are resolved under the home
    /// directory.
    pub base_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: DEFAULT_BASE_DIR.to_string(),
        }
    }
}

/// `[format]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// `chrono` format string for entry timestamps.
    pub timestamp_format: String,
    /// Line terminating every entry.
    pub entry_separator: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            entry_separator: DEFAULT_ENTRY_SEPARATOR.to_string(),
        }
    }
}

/// `[files]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Log file extension without the dot.
    pub log_file_extension: String,
    /// Template for context ids. Placeholders: `{component}`, `{pid}`, `{nanos}`.
    pub context_id_format: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            log_file_extension: DEFAULT_LOG_EXTENSION.to_string(),
            context_id_format: DEFAULT_CONTEXT_ID_FORMAT.to_string(),
        }
    }
}

/// `[context_capture]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextCaptureConfig {
    /// File whose presence and mode make up the security triple.
    pub security_file: String,
    /// Required octal mode for the security file, e.g. `"0440"`.
    pub security_required_mode: String,
    /// Prefix of framework environment variables captured wholesale.
    pub framework_env_prefix: String,
    /// Individually captured environment variables.
    pub env_vars: Vec<String>,
    /// Sentinel written for facts that could not be captured.
    pub unknown_value: String,
}

impl Default for ContextCaptureConfig {
    fn default() -> Self {
        Self {
            security_file: DEFAULT_SECURITY_FILE.to_string(),
            security_required_mode: DEFAULT_SECURITY_MODE.to_string(),
            framework_env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            env_vars: strings(DEFAULT_ENV_VARS),
            unknown_value: DEFAULT_UNKNOWN.to_string(),
        }
    }
}

/// `[behavior]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Maximum bytes of backtrace kept on ERROR entries.
    pub stack_buffer_size: usize,
    /// Level name → whether entries at that level carry a full context.
    pub log_level_full_context: BTreeMap<String, bool>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            stack_buffer_size: DEFAULT_STACK_BUFFER_SIZE,
            log_level_full_context: default_full_context(),
        }
    }
}

/// `[messages]` section. Templates use named `{placeholders}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Operation start event. Placeholder: `{command}`.
    pub event_op_start: String,
    /// Check event. Placeholder: `{what}`.
    pub event_check: String,
    /// Snapshot event. Placeholder: `{label}`.
    pub event_snapshot: String,
    /// Failed command event. Placeholder: `{command}`.
    pub event_cmd_failed: String,
    /// Completed command event. Placeholder: `{command}`.
    pub event_cmd_success: String,
    /// Command line rendering. Placeholders: `{command}`, `{args}`.
    pub cmd_full_format: String,
    /// Duration rendering. Placeholder: `{ms}`.
    pub duration_format: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            event_op_start: DEFAULT_EVENT_OP_START.to_string(),
            event_check: DEFAULT_EVENT_CHECK.to_string(),
            event_snapshot: DEFAULT_EVENT_SNAPSHOT.to_string(),
            event_cmd_failed: DEFAULT_EVENT_CMD_FAILED.to_string(),
            event_cmd_success: DEFAULT_EVENT_CMD_SUCCESS.to_string(),
            cmd_full_format: DEFAULT_CMD_FULL_FORMAT.to_string(),
            duration_format: DEFAULT_DURATION_FORMAT.to_string(),
        }
    }
}

/// `[health_impacts]` section: deltas for entries the rail generates itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthImpactsConfig {
    /// Delta of the operation entry written before a command runs.
    pub cmd_operation_impact: i64,
    /// Delta when a command fails.
    pub cmd_failure_impact: i64,
    /// Delta when a command succeeds.
    pub cmd_success_impact: i64,
}

impl Default for HealthImpactsConfig {
    fn default() -> Self {
        Self {
            cmd_operation_impact: DEFAULT_CMD_OPERATION_IMPACT,
            cmd_failure_impact: DEFAULT_CMD_FAILURE_IMPACT,
            cmd_success_impact: DEFAULT_CMD_SUCCESS_IMPACT,
        }
    }
}

/// `[rotation]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Whether size-triggered rotation runs at all.
    pub enabled: bool,
    /// Live file size, in MiB, at which it is rotated.
    pub max_size_mb: u64,
    /// Number of numbered archives kept.
    pub max_files: u32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            max_files: DEFAULT_MAX_ARCHIVES,
        }
    }
}

/// `[routing]` section: component names per output subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Components logged under `commands/`.
    pub commands: Vec<String>,
    /// Components logged under `scripts/`.
    pub scripts: Vec<String>,
    /// Components logged under `libraries/`.
    pub libraries: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            commands: strings(DEFAULT_COMMANDS),
            scripts: strings(DEFAULT_SCRIPTS),
            libraries: strings(DEFAULT_LIBRARIES),
        }
    }
}

/// `[health]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Severity bands, highest threshold first.
    pub ranges: Vec<HealthBand>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            ranges: SeverityBands::default().into_bands(),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailConfig {
    /// Output locations.
    pub paths: PathsConfig,
    /// Entry text format.
    pub format: FormatConfig,
    /// File naming.
    pub files: FilesConfig,
    /// Context capture.
    pub context_capture: ContextCaptureConfig,
    /// Behavioral switches.
    pub behavior: BehaviorConfig,
    /// Message templates.
    pub messages: MessagesConfig,
    /// Health deltas for generated entries.
    pub health_impacts: HealthImpactsConfig,
    /// Rotation thresholds.
    pub rotation: RotationConfig,
    /// Component routing.
    pub routing: RoutingConfig,
    /// Severity bands.
    pub health: HealthConfig,
}

// ============================================================================
// Settings
// ============================================================================

/// Where a [`Settings`] value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Decoded from a file on disk.
    File(PathBuf),
    /// Decoded from an in-memory TOML string.
    Inline,
    /// Hardcoded defaults; nothing was loaded.
    Defaults,
}

/// Output subdirectory a component's log is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// `commands/`
    Commands,
    /// `scripts/`
    Scripts,
    /// `libraries/`
    Libraries,
    /// `system/`, the default bucket.
    System,
}

impl LogCategory {
    /// Directory name for this category.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Commands => "commands",
            Self::Scripts => "scripts",
            Self::Libraries => "libraries",
            Self::System => "system",
        }
    }
}

/// A configuration plus the knowledge of whether it was actually loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    config: RailConfig,
    source: ConfigSource,
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Settings {
    /// Settings built purely from hardcoded defaults.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            config: RailConfig::default(),
            source: ConfigSource::Defaults,
        }
    }

    /// Wraps an already-built configuration and treats it as loaded.
    #[must_use]
    pub const fn from_config(config: RailConfig) -> Self {
        Self {
            config,
            source: ConfigSource::Inline,
        }
    }

    /// Reads and decodes a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// the config schema.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LogError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        let config: RailConfig = toml::from_str(&content)?;
        Ok(Self {
            config,
            source: ConfigSource::File(path.to_path_buf()),
        })
    }

    /// Decodes a TOML configuration string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid for the config schema.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RailConfig = toml::from_str(content)?;
        Ok(Self::from_config(config))
    }

    /// Loads settings from the default location, falling back to
    /// [`Settings::defaults`] on any failure.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            tracing::debug!("no home directory; using default rail config");
            return Self::defaults();
        };
        match Self::from_file(&path) {
            Ok(settings) => {
                tracing::debug!(path = %path.display(), "loaded rail config");
                settings
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "using default rail config");
                Self::defaults()
            }
        }
    }

    /// Whether the configuration came from a file or string rather than the
    /// hardcoded defaults.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.source != ConfigSource::Defaults
    }

    /// Where this configuration came from.
    #[must_use]
    pub const fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Raw configuration values, before fallback resolution.
    #[must_use]
    pub const fn config(&self) -> &RailConfig {
        &self.config
    }

    fn pick<'a>(&'a self, value: &'a str, fallback: &'static str) -> &'a str {
        if self.is_loaded() && !value.is_empty() {
            value
        } else {
            fallback
        }
    }

    fn pick_list<'a>(&'a self, value: &'a [String], fallback: &'static [&'static str]) -> Vec<&'a str> {
        if self.is_loaded() && !value.is_empty() {
            value.iter().map(String::as_str).collect()
        } else {
            fallback.to_vec()
        }
    }

    /// Root directory that holds `logs/`.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        let configured = Path::new(self.pick(&self.config.paths.base_dir, DEFAULT_BASE_DIR));
        if configured.is_absolute() {
            return configured.to_path_buf();
        }
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(configured)
    }

    /// Timestamp format for entry headers.
    #[must_use]
    pub fn timestamp_format(&self) -> &str {
        self.pick(&self.config.format.timestamp_format, DEFAULT_TIMESTAMP_FORMAT)
    }

    /// Separator line terminating entries.
    #[must_use]
    pub fn entry_separator(&self) -> &str {
        self.pick(&self.config.format.entry_separator, DEFAULT_ENTRY_SEPARATOR)
    }

    /// Log file extension without the dot.
    #[must_use]
    pub fn log_extension(&self) -> &str {
        self.pick(&self.config.files.log_file_extension, DEFAULT_LOG_EXTENSION)
    }

    /// Context id template.
    #[must_use]
    pub fn context_id_format(&self) -> &str {
        self.pick(&self.config.files.context_id_format, DEFAULT_CONTEXT_ID_FORMAT)
    }

    /// Whether entries at `level` carry a full system context.
    ///
    /// A loaded, non-empty map is authoritative (levels missing from it are
    /// lightweight); otherwise the built-in flags apply.
    #[must_use]
    pub fn is_heavy(&self, level: LogLevel) -> bool {
        let map = &self.config.behavior.log_level_full_context;
        if self.is_loaded() && !map.is_empty() {
            map.get(level.as_str()).copied().unwrap_or(false)
        } else {
            level.captures_context_by_default()
        }
    }

    /// Routes a component name to its output subdirectory.
    #[must_use]
    pub fn route(&self, component: &str) -> LogCategory {
        let routing = &self.config.routing;
        if self.pick_list(&routing.commands, DEFAULT_COMMANDS).contains(&component) {
            LogCategory::Commands
        } else if self.pick_list(&routing.scripts, DEFAULT_SCRIPTS).contains(&component) {
            LogCategory::Scripts
        } else if self.pick_list(&routing.libraries, DEFAULT_LIBRARIES).contains(&component) {
            LogCategory::Libraries
        } else {
            LogCategory::System
        }
    }

    /// Full path of the live log file for `component` under `base_dir`.
    #[must_use]
    pub fn log_path_in(&self, base_dir: &Path, component: &str) -> PathBuf {
        base_dir
            .join("logs")
            .join(self.route(component).dir_name())
            .join(format!("{component}.{}", self.log_extension()))
    }

    /// Full path of the live log file for `component`.
    #[must_use]
    pub fn log_path(&self, component: &str) -> PathBuf {
        self.log_path_in(&self.base_dir(), component)
    }

    /// Message templates with per-field fallback applied.
    #[must_use]
    pub fn messages(&self) -> MessagesConfig {
        let m = &self.config.messages;
        MessagesConfig {
            event_op_start: self.pick(&m.event_op_start, DEFAULT_EVENT_OP_START).to_string(),
            event_check: self.pick(&m.event_check, DEFAULT_EVENT_CHECK).to_string(),
            event_snapshot: self.pick(&m.event_snapshot, DEFAULT_EVENT_SNAPSHOT).to_string(),
            event_cmd_failed: self.pick(&m.event_cmd_failed, DEFAULT_EVENT_CMD_FAILED).to_string(),
            event_cmd_success: self
                .pick(&m.event_cmd_success, DEFAULT_EVENT_CMD_SUCCESS)
                .to_string(),
            cmd_full_format: self.pick(&m.cmd_full_format, DEFAULT_CMD_FULL_FORMAT).to_string(),
            duration_format: self.pick(&m.duration_format, DEFAULT_DURATION_FORMAT).to_string(),
        }
    }

    /// Health deltas for generated entries.
    #[must_use]
    pub fn health_impacts(&self) -> HealthImpactsConfig {
        if self.is_loaded() {
            self.config.health_impacts
        } else {
            HealthImpactsConfig::default()
        }
    }

    /// Rotation policy derived from the `[rotation]` section.
    #[must_use]
    pub fn rotation_policy(&self) -> RotationPolicy {
        let r = if self.is_loaded() {
            self.config.rotation
        } else {
            RotationConfig::default()
        };
        let max_mb = if r.max_size_mb == 0 { DEFAULT_MAX_SIZE_MB } else { r.max_size_mb };
        let max_archives = if r.max_files == 0 { DEFAULT_MAX_ARCHIVES } else { r.max_files };
        RotationPolicy {
            enabled: r.enabled,
            max_bytes: max_mb.saturating_mul(1024 * 1024),
            max_archives,
        }
    }

    /// Severity bands, from config when present.
    #[must_use]
    pub fn severity_bands(&self) -> SeverityBands {
        let ranges = &self.config.health.ranges;
        if self.is_loaded() && !ranges.is_empty() {
            SeverityBands::new(ranges.clone())
        } else {
            SeverityBands::default()
        }
    }

    /// Inputs for the context capturer.
    #[must_use]
    pub fn capture_settings(&self) -> CaptureSettings {
        let c = &self.config.context_capture;
        let mode_text = self.pick(&c.security_required_mode, DEFAULT_SECURITY_MODE);
        let required_mode = u32::from_str_radix(mode_text, 8).unwrap_or(0o440);
        CaptureSettings {
            security_file: PathBuf::from(self.pick(&c.security_file, DEFAULT_SECURITY_FILE)),
            required_mode,
            env_prefix: self.pick(&c.framework_env_prefix, DEFAULT_ENV_PREFIX).to_string(),
            env_vars: self
                .pick_list(&c.env_vars, DEFAULT_ENV_VARS)
                .into_iter()
                .map(str::to_string)
                .collect(),
            unknown: self.pick(&c.unknown_value, DEFAULT_UNKNOWN).to_string(),
        }
    }

    /// Maximum backtrace bytes kept on ERROR entries.
    #[must_use]
    pub fn stack_buffer_size(&self) -> usize {
        let size = self.config.behavior.stack_buffer_size;
        if self.is_loaded() && size > 0 {
            size
        } else {
            DEFAULT_STACK_BUFFER_SIZE
        }
    }
}

// ============================================================================
// Process-wide settings
// ============================================================================

static GLOBAL: Lazy<Arc<Settings>> = Lazy::new(|| Arc::new(Settings::load()));

/// Location of the config file, if a home directory can be resolved.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| {
        home.join(RAIL_HOME_DIR)
            .join(CONFIG_SUBDIR)
            .join(CONFIG_FILE_NAME)
    })
}

/// Process-wide settings, loaded on first use and never again.
pub fn global() -> Arc<Settings> {
    Arc::clone(&GLOBAL)
}

/// Forces the one-time load and returns the process-wide settings.
///
/// Safe to call from any number of call sites and threads.
pub fn load_config() -> Arc<Settings> {
    global()
}

/// Substitutes `{name}` placeholders in `template`.
pub(crate) fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp file");
        file
    }

    #[test]
    fn defaults_are_not_loaded() {
        let settings = Settings::defaults();
        assert!(!settings.is_loaded());
        assert_eq!(settings.source(), &ConfigSource::Defaults);
        assert_eq!(settings.timestamp_format(), DEFAULT_TIMESTAMP_FORMAT);
        assert_eq!(settings.entry_separator(), "---");
        assert_eq!(settings.log_extension(), "log");
    }

    #[test]
    fn parse_minimal_config_keeps_other_defaults() {
        let settings = Settings::from_toml(
            r#"
            [routing]
            commands = ["deploy"]
            "#,
        )
        .expect("should parse");

        assert!(settings.is_loaded());
        assert_eq!(settings.route("deploy"), LogCategory::Commands);
        // untouched sections keep their hardcoded values
        assert_eq!(settings.route("build"), LogCategory::Scripts);
        assert_eq!(settings.config().rotation.max_files, 5);
        assert_eq!(settings.health_impacts().cmd_failure_impact, -10);
    }

    #[test]
    fn empty_string_falls_back_per_field() {
        let settings = Settings::from_toml(
            r#"
            [format]
            timestamp_format = ""
            entry_separator = "==="
            "#,
        )
        .expect("should parse");

        assert_eq!(settings.timestamp_format(), DEFAULT_TIMESTAMP_FORMAT);
        assert_eq!(settings.entry_separator(), "===");
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(
            r#"
            [paths]
            base_dir = "/var/log/rail"

            [rotation]
            max_size_mb = 2
            max_files = 3
            "#,
        );

        let settings = Settings::from_file(file.path()).expect("should load");
        assert_eq!(settings.source(), &ConfigSource::File(file.path().to_path_buf()));
        assert_eq!(settings.base_dir(), PathBuf::from("/var/log/rail"));

        let policy = settings.rotation_policy();
        assert!(policy.enabled);
        assert_eq!(policy.max_bytes, 2 * 1024 * 1024);
        assert_eq!(policy.max_archives, 3);
    }

    #[test]
    fn from_file_missing_is_error() {
        let result = Settings::from_file("/nonexistent/rail/logging.toml");
        assert!(matches!(result, Err(LogError::Config(_))));
    }

    #[test]
    fn malformed_toml_is_error() {
        let result = Settings::from_toml("[rotation\nmax_files = ");
        assert!(matches!(result, Err(LogError::Config(_))));
    }

    #[test]
    fn wrong_type_is_error() {
        let result = Settings::from_toml("[rotation]\nmax_files = \"five\"");
        assert!(result.is_err());
    }

    #[test_case("validate", LogCategory::Commands ; "command")]
    #[test_case("build", LogCategory::Scripts ; "script")]
    #[test_case("sudoers", LogCategory::Libraries ; "library")]
    #[test_case("demo", LogCategory::System ; "unrouted")]
    #[test_case("Validate", LogCategory::System ; "exact match only")]
    fn default_routing(component: &str, expected: LogCategory) {
        assert_eq!(Settings::defaults().route(component), expected);
    }

    #[test]
    fn log_path_uses_routed_subdirectory() {
        let settings = Settings::defaults();
        let base = Path::new("/tmp/rail-base");

        assert_eq!(
            settings.log_path_in(base, "demo"),
            PathBuf::from("/tmp/rail-base/logs/system/demo.log")
        );
        assert_eq!(
            settings.log_path_in(base, "status"),
            PathBuf::from("/tmp/rail-base/logs/commands/status.log")
        );
    }

    #[test]
    fn heavy_levels_default() {
        let settings = Settings::defaults();
        assert!(settings.is_heavy(LogLevel::Operation));
        assert!(!settings.is_heavy(LogLevel::Success));
        assert!(settings.is_heavy(LogLevel::Failure));
        assert!(settings.is_heavy(LogLevel::Error));
        assert!(!settings.is_heavy(LogLevel::Check));
        assert!(settings.is_heavy(LogLevel::Context));
        assert!(settings.is_heavy(LogLevel::Debug));
    }

    #[test]
    fn heavy_levels_from_config_map() {
        let settings = Settings::from_toml(
            r#"
            [behavior.log_level_full_context]
            SUCCESS = true
            "#,
        )
        .expect("should parse");

        assert!(settings.is_heavy(LogLevel::Success));
        // a configured map is authoritative; absent levels are lightweight
        assert!(!settings.is_heavy(LogLevel::Operation));
    }

    #[test]
    fn custom_severity_bands() {
        let settings = Settings::from_toml(
            r#"
            [[health.ranges]]
            threshold = 0
            emoji = "+"
            description = "fine"

            [[health.ranges]]
            threshold = -100
            emoji = "-"
            description = "bad"
            "#,
        )
        .expect("should parse");

        let bands = settings.severity_bands();
        assert_eq!(bands.indicator(50), "+");
        assert_eq!(bands.indicator(-1), "-");
    }

    #[test]
    fn partial_band_row_keeps_sibling_sections() {
        let settings = Settings::from_toml(
            r#"
            [routing]
            commands = ["deploy"]

            [[health.ranges]]
            threshold = 0
            emoji = "x"
            "#,
        )
        .expect("partial band row decodes");

        assert!(settings.is_loaded());
        assert_eq!(settings.route("deploy"), LogCategory::Commands);
        let bands = settings.severity_bands();
        assert_eq!(bands.indicator(3), "x");
        assert_eq!(bands.describe(3), "");
    }

    #[test]
    fn partial_band_file_still_loads() {
        let file = create_temp_config(
            "[routing]\nscripts = [\"ship\"]\n[[health.ranges]]\nthreshold = 50\n",
        );
        let settings = Settings::from_file(file.path()).expect("load");
        assert_eq!(settings.route("ship"), LogCategory::Scripts);
        assert_eq!(settings.severity_bands().indicator(70), "❓");
    }

    #[test]
    fn messages_fallback_when_empty() {
        let settings = Settings::from_toml(
            r#"
            [messages]
            event_check = ""
            event_op_start = "Begin {command}"
            "#,
        )
        .expect("should parse");

        let messages = settings.messages();
        assert_eq!(messages.event_check, DEFAULT_EVENT_CHECK);
        assert_eq!(messages.event_op_start, "Begin {command}");
    }

    #[test]
    fn capture_settings_parse_octal_mode() {
        let settings = Settings::from_toml(
            r#"
            [context_capture]
            security_required_mode = "0600"
            "#,
        )
        .expect("should parse");
        assert_eq!(settings.capture_settings().required_mode, 0o600);
        assert_eq!(Settings::defaults().capture_settings().required_mode, 0o440);
    }

    #[test]
    fn zero_rotation_values_fall_back() {
        let settings = Settings::from_toml("[rotation]\nmax_size_mb = 0\nmax_files = 0")
            .expect("should parse");
        let policy = settings.rotation_policy();
        assert_eq!(policy.max_bytes, DEFAULT_MAX_SIZE_MB * 1024 * 1024);
        assert_eq!(policy.max_archives, DEFAULT_MAX_ARCHIVES);
    }

    #[test]
    fn global_is_loaded_once() {
        let first = global();
        let second = load_config();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn global_is_shared_across_threads() {
        let handles: Vec<_> = (0..8).map(|_| std::thread::spawn(global)).collect();
        let first = global();
        for handle in handles {
            let settings = handle.join().expect("thread panicked");
            assert!(Arc::ptr_eq(&first, &settings));
        }
    }

    #[test]
    fn render_substitutes_named_placeholders() {
        assert_eq!(
            render("{command} {args}", &[("command", "git"), ("args", "status -s")]),
            "git status -s"
        );
        assert_eq!(render("no placeholders", &[("x", "y")]), "no placeholders");
    }

    #[test]
    fn default_config_serializes_to_toml() {
        let text = toml::to_string(&RailConfig::default()).expect("serialize");
        let back: RailConfig = toml::from_str(&text).expect("deserialize");
        assert_eq!(back, RailConfig::default());
    }
}
