//! System context capture.
//!
//! Every fact is read by its own [`HostFacts`] method and may independently be
//! missing; [`compose_context`] turns each missing fact into the configured
//! `unknown` sentinel without touching the others.

use std::collections::BTreeMap;
use std::fmt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sysinfo::{Disks, System};

use crate::types::Identity;

const LOGIN_SHELL_PREFIX: char = '-';
const LOGIN_SHELL_LEVEL: &str = "1";

/// Inputs the capturer takes from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// File whose presence and mode form the security triple.
    pub security_file: PathBuf,
    /// Required permission bits for that file.
    pub required_mode: u32,
    /// Prefix of environment variables captured wholesale.
    pub env_prefix: String,
    /// Individually captured environment variables.
    pub env_vars: Vec<String>,
    /// Sentinel for missing facts.
    pub unknown: String,
}

/// Shell type and mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellContext {
    /// Shell program name, e.g. `bash`.
    pub kind: String,
    /// Whether stdin is a terminal.
    pub interactive: bool,
    /// Whether this looks like a login shell.
    pub login: bool,
}

impl fmt::Display for ShellContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interactive = if self.interactive {
            "interactive"
        } else {
            "non-interactive"
        };
        let login = if self.login { "login" } else { "non-login" };
        write!(f, "{} ({interactive}, {login})", self.kind)
    }
}

impl ShellContext {
    /// Parses the `kind (interactive, login)` form written by `Display`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (kind, modes) = text.trim().rsplit_once(" (")?;
        let modes = modes.strip_suffix(')')?;
        let (interactive, login) = modes.split_once(", ")?;
        Some(Self {
            kind: kind.to_string(),
            interactive: interactive == "interactive",
            login: login == "login",
        })
    }
}

/// State of the security file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityContext {
    /// The file exists and its metadata is readable.
    pub installed: bool,
    /// Installed and set to exactly the required mode.
    pub valid: bool,
    /// Octal permissions, or the unknown sentinel.
    pub permissions: String,
}

/// Resource usage snapshot. Each field may be the unknown sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceMetrics {
    /// Load averages, `1m, 5m, 15m`.
    pub load: String,
    /// Memory, `usedMB / totalMB`.
    pub memory: String,
    /// Disk holding the cwd, `used / total (pct%)`.
    pub disk: String,
}

/// Full context snapshot attached to heavy entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemContext {
    /// Who captured it.
    pub identity: Identity,
    /// Shell type and mode.
    pub shell: ShellContext,
    /// Working directory.
    pub cwd: String,
    /// Selected environment variables.
    pub environment: BTreeMap<String, String>,
    /// Security file triple.
    pub security: SecurityContext,
    /// Resource metrics.
    pub resources: ResourceMetrics,
}

/// Source of individual host facts. Every method may fail on its own.
pub trait HostFacts: Send + Sync {
    /// Value of an environment variable, `None` when unset or empty.
    fn env_var(&self, name: &str) -> Option<String>;

    /// All environment variables whose name starts with `prefix`.
    fn env_with_prefix(&self, prefix: &str) -> Vec<(String, String)>;

    /// Current working directory.
    fn cwd(&self) -> Option<PathBuf>;

    /// Whether stdin is attached to a terminal.
    fn stdin_is_terminal(&self) -> bool;

    /// Permission bits of a file, `None` when it cannot be stat'ed.
    fn file_mode(&self, path: &Path) -> Option<u32>;

    /// Load averages formatted as `1m, 5m, 15m`.
    fn load_average(&self) -> Option<String>;

    /// Memory usage formatted as `usedMB / totalMB`.
    fn memory_usage(&self) -> Option<String>;

    /// Usage of the volume holding `path`, formatted as `used / total (pct%)`.
    fn disk_usage(&self, path: &Path) -> Option<String>;
}

/// [`HostFacts`] backed by the real host.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveHost;

impl HostFacts for LiveHost {
    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn env_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        std::env::vars()
            .filter(|(name, _)| name.starts_with(prefix))
            .collect()
    }

    fn cwd(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }

    fn stdin_is_terminal(&self) -> bool {
        std::io::stdin().is_terminal()
    }

    #[cfg(unix)]
    fn file_mode(&self, path: &Path) -> Option<u32> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .ok()
            .map(|m| m.permissions().mode() & 0o7777)
    }

    #[cfg(not(unix))]
    fn file_mode(&self, _path: &Path) -> Option<u32> {
        None
    }

    fn load_average(&self) -> Option<String> {
        if cfg!(windows) {
            return None;
        }
        let load = System::load_average();
        Some(format!(
            "{:.2}, {:.2}, {:.2}",
            load.one, load.five, load.fifteen
        ))
    }

    fn memory_usage(&self) -> Option<String> {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return None;
        }
        let used = total.saturating_sub(sys.available_memory());
        Some(format!(
            "{}MB / {}MB",
            used / 1024 / 1024,
            total / 1024 / 1024
        ))
    }

    fn disk_usage(&self, path: &Path) -> Option<String> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .filter(|d| path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())?;
        let total = disk.total_space();
        if total == 0 {
            return None;
        }
        let used = total.saturating_sub(disk.available_space());
        let pct = used * 100 / total;
        Some(format!(
            "{} / {} ({pct}%)",
            human_bytes(used),
            human_bytes(total)
        ))
    }
}

/// Renders a byte count the way `df -h` does.
#[must_use]
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "K", "M", "G", "T", "P"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Resolves username, hostname and pid for the current process.
pub fn capture_identity(facts: &dyn HostFacts, unknown: &str) -> Identity {
    let user = facts
        .env_var("USER")
        .or_else(|| facts.env_var("USERNAME"))
        .unwrap_or_else(|| unknown.to_string());
    let host = hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| unknown.to_string());
    Identity {
        user,
        host,
        pid: std::process::id(),
    }
}

// ============================================================================
// Per-fact capture
// ============================================================================

fn capture_shell(facts: &dyn HostFacts, unknown: &str) -> ShellContext {
    let kind = facts
        .env_var("SHELL")
        .and_then(|shell| {
            Path::new(&shell)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| unknown.to_string());
    let login = facts
        .env_var("0")
        .is_some_and(|arg0| arg0.starts_with(LOGIN_SHELL_PREFIX))
        || facts.env_var("SHLVL").as_deref() == Some(LOGIN_SHELL_LEVEL);
    ShellContext {
        kind,
        interactive: facts.stdin_is_terminal(),
        login,
    }
}

fn capture_environment(facts: &dyn HostFacts, settings: &CaptureSettings) -> BTreeMap<String, String> {
    let mut environment: BTreeMap<String, String> = settings
        .env_vars
        .iter()
        .filter_map(|name| facts.env_var(name).map(|value| (name.clone(), value)))
        .collect();
    if !settings.env_prefix.is_empty() {
        environment.extend(facts.env_with_prefix(&settings.env_prefix));
    }
    environment
}

fn capture_security(facts: &dyn HostFacts, settings: &CaptureSettings) -> SecurityContext {
    match facts.file_mode(&settings.security_file) {
        Some(mode) => SecurityContext {
            installed: true,
            valid: mode & 0o777 == settings.required_mode,
            permissions: format!("{:04o}", mode & 0o7777),
        },
        None => SecurityContext {
            installed: false,
            valid: false,
            permissions: settings.unknown.clone(),
        },
    }
}

fn capture_resources(facts: &dyn HostFacts, cwd: Option<&Path>, unknown: &str) -> ResourceMetrics {
    let or_unknown = |fact: Option<String>| fact.unwrap_or_else(|| unknown.to_string());
    ResourceMetrics {
        load: or_unknown(facts.load_average()),
        memory: or_unknown(facts.memory_usage()),
        disk: or_unknown(cwd.and_then(|dir| facts.disk_usage(dir))),
    }
}

/// Captures a full snapshot. Identity is passed in because it is resolved
/// once per logger; everything else is read fresh.
pub fn compose_context(
    identity: &Identity,
    facts: &dyn HostFacts,
    settings: &CaptureSettings,
) -> SystemContext {
    let cwd = facts.cwd();
    SystemContext {
        identity: identity.clone(),
        shell: capture_shell(facts, &settings.unknown),
        cwd: cwd
            .as_ref()
            .map_or_else(|| settings.unknown.clone(), |p| p.display().to_string()),
        environment: capture_environment(facts, settings),
        security: capture_security(facts, settings),
        resources: capture_resources(facts, cwd.as_deref(), &settings.unknown),
    }
}
