//! Settings file loading.
//!
//! The settings file holds `key=value` lines (`#` comments, optional
//! quoting). It is parsed with `dotenvy` without touching this process's own
//! environment; interpretation of the keys is left to
//! [`ServiceSettings`].

use std::path::{Path, PathBuf};

use biosvc_core::{LaunchSpec, ServiceSettings};
use tracing::debug;

use crate::error::CliError;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV_VAR: &str = "BIOSVC_CONFIG";

/// Settings file looked up next to the executable.
pub const DEFAULT_CONFIG_FILE: &str = "biosvc.env";

/// `biosvc.env` in the directory holding the running executable.
pub fn default_config_path() -> Result<PathBuf, CliError> {
    let exe = std::env::current_exe()
        .map_err(|e| CliError::Io(format!("Unable to locate executable: {e}")))?;

    let dir = exe.parent().ok_or_else(|| {
        CliError::Config(format!(
            "Executable {} has no parent directory",
            exe.display()
        ))
    })?;

    Ok(dir.join(DEFAULT_CONFIG_FILE))
}

/// The explicit path if given, the default location otherwise.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// Read the settings file at `path`.
pub fn load_settings(path: &Path) -> Result<ServiceSettings, CliError> {
    let entries = dotenvy::from_path_iter(path).map_err(|e| {
        CliError::Config(format!(
            "Unable to read settings file {}: {e}",
            path.display()
        ))
    })?;

    let pairs = entries
        .collect::<Result<Vec<(String, String)>, _>>()
        .map_err(|e| {
            CliError::Config(format!("Invalid settings file {}: {e}", path.display()))
        })?;

    debug!(path = %path.display(), entries = pairs.len(), "Loaded settings file");
    Ok(ServiceSettings::from_pairs(pairs))
}

/// Read and validate the settings, producing the launch plan.
pub fn load_launch_spec(explicit: Option<&Path>) -> Result<LaunchSpec, CliError> {
    let path = resolve_config_path(explicit)?;
    let spec = load_settings(&path)?.launch_spec()?;
    Ok(spec)
}
