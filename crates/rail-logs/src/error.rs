//! Error types for the logging rail.

use thiserror::Error;

/// Errors that can occur in the logging rail.
///
/// The write path never surfaces these to callers; they appear when reading
/// log files, loading configuration explicitly, building entries by hand, or
/// running a command through [`crate::Logger::log_command`].
#[derive(Debug, Error)]
pub enum LogError {
    /// A required field was not provided to the entry builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be read or decoded.
    #[error("config error: {0}")]
    Config(String),

    /// A log line could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number in the source text.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// A level string is not part of the level vocabulary.
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    /// An external command could not be started.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// Full command line.
        command: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// An external command ran but did not exit successfully.
    #[error("`{command}` failed with exit code {exit_code}")]
    CommandFailed {
        /// Full command line.
        command: String,
        /// Exit code, or -1 when the process was terminated by a signal.
        exit_code: i32,
    },
}

impl From<toml::de::Error> for LogError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for rail operations.
pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = LogError::MissingField("timestamp");
        assert_eq!(err.to_string(), "missing required field: timestamp");

        let err = LogError::InvalidLevel("LOUD".to_string());
        assert_eq!(err.to_string(), "invalid log level: LOUD");

        let err = LogError::Parse {
            line: 7,
            message: "bad header".to_string(),
        };
        assert_eq!(err.to_string(), "parse error at line 7: bad header");

        let err = LogError::CommandFailed {
            command: "make test".to_string(),
            exit_code: 2,
        };
        assert_eq!(err.to_string(), "`make test` failed with exit code 2");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogError>();
    }

    #[test]
    fn error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LogError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn error_toml_conversion() {
        let toml_err = toml::from_str::<toml::Value>("= nope").expect_err("invalid toml");
        let err: LogError = toml_err.into();
        assert!(matches!(err, LogError::Config(_)));
    }

    #[test]
    fn spawn_error_keeps_source() {
        use std::error::Error as _;

        let err = LogError::Spawn {
            command: "missing-tool".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("missing-tool"));
    }
}
