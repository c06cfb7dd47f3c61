//! CLI-specific error types
//!
//! Every CLI error is fatal for the process: `main` prints it and exits
//! non-zero. Errors raised by individual requests never surface here; they
//! become error responses on stdout.

use std::fmt;
use std::io;

use crate::snapshot::SnapshotError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing, malformed or invalid
    ConfigError,
    /// I/O error on stdin/stdout
    IoError,
    /// Snapshot could not be loaded, saved or verified
    SnapshotError,
    /// Runtime could not be started
    BootFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "AERO_CLI_CONFIG_ERROR",
            Self::IoError => "AERO_CLI_IO_ERROR",
            Self::SnapshotError => "AERO_CLI_SNAPSHOT_ERROR",
            Self::BootFailed => "AERO_CLI_BOOT_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn snapshot_error(err: &SnapshotError) -> Self {
        Self::new(
            CliErrorCode::SnapshotError,
            format!("{}: {}", err.code(), err),
        )
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = CliError::config_error("log_level 'loud' is not a level");
        assert_eq!(err.code(), CliErrorCode::ConfigError);
        assert_eq!(
            err.to_string(),
            "AERO_CLI_CONFIG_ERROR: log_level 'loud' is not a level"
        );
    }

    #[test]
    fn test_snapshot_error_keeps_inner_code() {
        let inner = SnapshotError::corruption(8, "checksum mismatch");
        let err = CliError::snapshot_error(&inner);
        assert!(err.message().starts_with("AERO_SNAPSHOT_CORRUPTION"));
    }
}
