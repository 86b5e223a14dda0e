//! CLI-specific error types and exit code mappings.

use biosvc_core::SettingsError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Settings are missing, unreadable or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error outside the settings file.
    #[error("IO error: {0}")]
    Io(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow sysexits.h:
    /// - 74: EX_IOERR
    /// - 78: EX_CONFIG
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 74,
            Self::Config(_) => 78,
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
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

    #[test]
    fn test_settings_error_is_config_error() {
        let err = CliError::from(SettingsError::MissingLauncherPath);
        assert_eq!(err.exit_code(), 78);
        assert!(err.to_string().contains("launcherPath"));
    }

    #[test]
    fn test_io_exit_code() {
        let err = CliError::from(std::io::Error::other("disk gone"));
        assert_eq!(err.exit_code(), 74);
    }

    #[test]
    fn test_exit_code_through_anyhow() {
        let err = anyhow::Error::from(CliError::Config("bad".to_string()));
        assert_eq!(crate::exit_code_for(&err), 78);

        let other = anyhow::anyhow!("something else");
        assert_eq!(crate::exit_code_for(&other), 1);
    }
}
