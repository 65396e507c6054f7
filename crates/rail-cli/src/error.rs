//! CLI error types.

use thiserror::Error;

use rail_logs::LogError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error from the logging rail.
    #[error(transparent)]
    Log(#[from] LogError),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_invalid_argument() {
        let err = CliError::InvalidArgument("level LOUD".into());
        assert_eq!(err.to_string(), "invalid argument: level LOUD");
    }

    #[test]
    fn cli_error_wraps_log_error() {
        let err = CliError::from(LogError::InvalidLevel("LOUD".into()));
        assert_eq!(err.to_string(), "invalid log level: LOUD");
        assert!(matches!(err, CliError::Log(_)));
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
