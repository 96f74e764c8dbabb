//! CLI error type and exit-code mapping.

use stackprobe_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Core(String),

    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Exit code for this error, following sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(e) => Self::Config(e.to_string()),
            other => Self::Core(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackprobe_core::{ConfigError, OrchestratorError};

    #[test]
    fn config_errors_exit_with_ex_config() {
        let err: CliError = CoreError::from(ConfigError::NoComponents).into();
        assert_eq!(err.exit_code(), 78);
        assert_eq!(err.to_string(), "Configuration error: No components configured");
    }

    #[test]
    fn other_core_errors_are_general_failures() {
        let err: CliError = CoreError::from(OrchestratorError::ChannelClosed).into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn io_errors_exit_with_ex_ioerr() {
        let err: CliError = std::io::Error::other("disk full").into();
        assert_eq!(err.exit_code(), 74);
    }
}
