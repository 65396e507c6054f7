//! Append-only log file writer with size-triggered rotation.
//!
//! Each write stats the live file, rotates it into numbered archives when it
//! has reached the threshold, appends the entry and closes the file again.
//! Nothing is held open between writes.
//!
//! Archives are named `<file>.1` (newest) through `<file>.N` (oldest).
//!
//! The write path never returns errors: every failure is reported on the
//! side channel and the write is abandoned.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// When and how far a log file is rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Whether rotation runs at all.
    pub enabled: bool,
    /// Live file size, in bytes, at which the file is rotated.
    pub max_bytes: u64,
    /// Number of archives kept.
    pub max_archives: u32,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bytes: 10 * 1024 * 1024,
            max_archives: 5,
        }
    }
}

/// Path of archive number `index` for `base`.
#[must_use]
pub fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Reports a write-path failure without failing the caller.
///
/// Goes through `tracing` when a subscriber is installed, else straight to
/// stderr.
pub(crate) fn report(message: &str) {
    if tracing::dispatcher::has_been_set() {
        tracing::warn!("{message}");
    } else {
        eprintln!("WARNING: {message}");
    }
}

/// Writes entries to one log file.
#[derive(Debug, Clone)]
pub struct LogWriter {
    path: PathBuf,
    policy: RotationPolicy,
}

impl LogWriter {
    /// Creates a writer for `path`. The file is not touched until the first
    /// write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    /// The live file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The rotation policy in use.
    #[must_use]
    pub const fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Appends `text` plus a newline, rotating first if needed.
    pub fn write(&self, text: &str) {
        if self.policy.enabled {
            self.rotate_if_needed();
        }
        if let Err(e) = self.append(text) {
            report(&format!("failed to write log {}: {e}", self.path.display()));
        }
    }

    fn append(&self, text: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut buf = String::with_capacity(text.len() + 1);
        buf.push_str(text);
        buf.push('\n');
        file.write_all(buf.as_bytes())
    }

    fn rotate_if_needed(&self) {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                report(&format!("failed to stat log {}: {e}", self.path.display()));
                return;
            }
        };
        if size >= self.policy.max_bytes {
            self.rotate();
        }
    }

    /// Shifts the archives up by one and moves the live file to `.1`.
    ///
    /// Failures are reported and skipped so a stuck archive never blocks
    /// writing.
    pub fn rotate(&self) {
        let keep = self.policy.max_archives;
        if keep == 0 {
            if let Err(e) = fs::remove_file(&self.path) {
                report(&format!("failed to remove log {}: {e}", self.path.display()));
            }
            return;
        }

        let oldest = rotated_name(&self.path, keep);
        if let Err(e) = fs::remove_file(&oldest) {
            if e.kind() != io::ErrorKind::NotFound {
                report(&format!("failed to remove archive {}: {e}", oldest.display()));
            }
        }

        for index in (1..keep).rev() {
            let from = rotated_name(&self.path, index);
            let to = rotated_name(&self.path, index + 1);
            if let Err(e) = fs::rename(&from, &to) {
                if e.kind() != io::ErrorKind::NotFound {
                    report(&format!(
                        "failed to rename {} to {}: {e}",
                        from.display(),
                        to.display()
                    ));
                }
            }
        }

        let first = rotated_name(&self.path, 1);
        if let Err(e) = fs::rename(&self.path, &first) {
            report(&format!(
                "failed to rotate {} to {}: {e}",
                self.path.display(),
                first.display()
            ));
        } else {
            tracing::debug!(path = %self.path.display(), "rotated log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_policy() -> RotationPolicy {
        RotationPolicy {
            enabled: true,
            max_bytes: 16,
            max_archives: 5,
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).expect("read")
    }

    #[test]
    fn rotated_name_appends_index() {
        assert_eq!(
            rotated_name(Path::new("/var/log/demo.log"), 3),
            PathBuf::from("/var/log/demo.log.3")
        );
    }

    #[test]
    fn write_creates_and_appends() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("demo.log");
        let writer = LogWriter::new(&path, RotationPolicy::default());

        writer.write("one");
        writer.write("two");

        assert_eq!(read(&path), "one\ntwo\n");
        assert!(!rotated_name(&path, 1).exists());
    }

    #[test]
    fn crossing_threshold_rotates_once_before_append() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("demo.log");
        let writer = LogWriter::new(&path, small_policy());

        fs::write(rotated_name(&path, 1), "old1\n").expect("seed");
        fs::write(rotated_name(&path, 2), "old2\n").expect("seed");
        fs::write(&path, "x".repeat(20)).expect("seed");

        writer.write("fresh");

        assert_eq!(read(&path), "fresh\n");
        assert_eq!(read(&rotated_name(&path, 1)), "x".repeat(20));
        assert_eq!(read(&rotated_name(&path, 2)), "old1\n");
        assert_eq!(read(&rotated_name(&path, 3)), "old2\n");
        assert!(!rotated_name(&path, 4).exists());
    }

    #[test]
    fn below_threshold_does_not_rotate() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("demo.log");
        let writer = LogWriter::new(&path, small_policy());

        writer.write("short");
        writer.write("x");

        assert_eq!(read(&path), "short\nx\n");
        assert!(!rotated_name(&path, 1).exists());
    }

    #[test]
    fn six_rotations_keep_five_archives() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("demo.log");
        let writer = LogWriter::new(&path, small_policy());

        for round in 0..6 {
            fs::write(&path, format!("{round:0>20}")).expect("seed");
            writer.rotate();
        }

        for index in 1..=5 {
            assert!(rotated_name(&path, index).exists(), "archive {index}");
        }
        assert!(!rotated_name(&path, 6).exists());
        // round 0 fell off the end
        assert_eq!(read(&rotated_name(&path, 1)), format!("{:0>20}", 5));
        assert_eq!(read(&rotated_name(&path, 5)), format!("{:0>20}", 1));
    }

    #[test]
    fn disabled_policy_never_rotates() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("demo.log");
        let writer = LogWriter::new(
            &path,
            RotationPolicy {
                enabled: false,
                ..small_policy()
            },
        );

        writer.write(&"y".repeat(40));
        writer.write("more");

        assert!(read(&path).ends_with("more\n"));
        assert!(!rotated_name(&path, 1).exists());
    }

    #[test]
    fn write_to_missing_directory_is_silent() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("no/such/dir/demo.log");
        let writer = LogWriter::new(&path, RotationPolicy::default());

        writer.write("lost");

        assert!(!path.exists());
    }
}
