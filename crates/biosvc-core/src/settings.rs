//! Service settings and the resolved launch plan.
//!
//! Settings arrive as flat key/value pairs (the configuration provider is
//! responsible for reading them from disk). This module interprets them and
//! produces the [`LaunchSpec`] the runtime uses to start the supervisor.
//!
//! These are pure domain types with no infrastructure dependencies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Setting holding the path to the launcher executable (required).
pub const LAUNCHER_PATH_KEY: &str = "launcherPath";

/// Setting holding extra arguments appended after [`LAUNCHER_SUBCOMMAND`].
pub const LAUNCHER_ARGS_KEY: &str = "launcherArgs";

/// Setting toggling verbose diagnostics in the child.
pub const DEBUG_KEY: &str = "debug";

/// Setting naming the supervisor binary spawned by the launcher.
pub const SUPERVISOR_NAME_KEY: &str = "supervisorName";

/// Prefix marking a setting as an environment variable for the child.
pub const ENV_PREFIX: &str = "ENV_";

/// Subcommand always passed to the launcher.
pub const LAUNCHER_SUBCOMMAND: &str = "run";

/// Glyph style variable. There is no console to detect terminal capabilities
/// from, so the child is always told to render plain ASCII.
pub const GLYPH_STYLE_VAR: &str = "HAB_GLYPH_STYLE";

/// Value forced into [`GLYPH_STYLE_VAR`].
pub const GLYPH_STYLE_ASCII: &str = "ascii";

/// Log filter variable read by the child.
pub const CHILD_LOG_VAR: &str = "RUST_LOG";

/// Value of [`CHILD_LOG_VAR`] when debug is enabled.
pub const CHILD_DEBUG_FILTER: &str = "debug";

/// Base name of the supervisor binary the launcher spawns.
pub const DEFAULT_SUPERVISOR_NAME: &str = "bio-sup";

/// Environment changes applied on top of the inherited environment.
///
/// `Some(value)` sets the variable, `None` removes it from the child's
/// environment.
pub type EnvOverrides = BTreeMap<String, Option<String>>;

/// Raw service settings as supplied by the configuration provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Path to the launcher executable.
    pub launcher_path: Option<String>,
    /// Extra launcher arguments, whitespace separated.
    pub launcher_args: Option<String>,
    /// Debug flag. Anything but a case-insensitive `false` enables it.
    pub debug: Option<String>,
    /// Name of the supervisor process to wait for after an unexpected exit.
    pub supervisor_name: Option<String>,
    /// `ENV_*` settings with the prefix stripped and the name upper-cased.
    pub env: BTreeMap<String, String>,
}

impl ServiceSettings {
    /// Build settings from key/value pairs.
    ///
    /// Keys are trimmed and matched case-insensitively. Unknown keys are
    /// ignored. When a key repeats, the last value wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Self::default();

        for (key, value) in pairs {
            let key = key.as_ref().trim();
            let value = value.into();

            if key.eq_ignore_ascii_case(LAUNCHER_PATH_KEY) {
                settings.launcher_path = Some(value);
            } else if key.eq_ignore_ascii_case(LAUNCHER_ARGS_KEY) {
                settings.launcher_args = Some(value);
            } else if key.eq_ignore_ascii_case(DEBUG_KEY) {
                settings.debug = Some(value);
            } else if key.eq_ignore_ascii_case(SUPERVISOR_NAME_KEY) {
                settings.supervisor_name = Some(value);
            } else {
                let upper = key.to_ascii_uppercase();
                if let Some(name) = upper.strip_prefix(ENV_PREFIX) {
                    if !name.is_empty() {
                        settings.env.insert(name.to_string(), value);
                    }
                }
            }
        }

        settings
    }

    /// Whether verbose diagnostics should be enabled in the child.
    pub fn debug_enabled(&self) -> bool {
        self.debug
            .as_deref()
            .is_some_and(|v| !v.eq_ignore_ascii_case("false"))
    }

    /// Full launcher argument list: the fixed subcommand followed by any
    /// configured extra arguments.
    pub fn launcher_arguments(&self) -> Vec<String> {
        let mut args = vec![LAUNCHER_SUBCOMMAND.to_string()];
        if let Some(extra) = self.launcher_args.as_deref() {
            args.extend(extra.split_whitespace().map(str::to_string));
        }
        args
    }

    /// Environment overrides for the child.
    ///
    /// Applied in order: debug flag, `ENV_*` settings, glyph style. A later
    /// step replaces an earlier one for the same variable.
    pub fn environment(&self) -> EnvOverrides {
        let mut env = EnvOverrides::new();

        let log_filter = self
            .debug_enabled()
            .then(|| CHILD_DEBUG_FILTER.to_string());
        env.insert(CHILD_LOG_VAR.to_string(), log_filter);

        for (name, value) in &self.env {
            env.insert(name.clone(), Some(value.clone()));
        }

        env.insert(
            GLYPH_STYLE_VAR.to_string(),
            Some(GLYPH_STYLE_ASCII.to_string()),
        );

        env
    }

    /// Process name of the supervisor binary on this platform.
    pub fn supervisor_process_name(&self) -> String {
        self.supervisor_name.clone().unwrap_or_else(|| {
            format!("{DEFAULT_SUPERVISOR_NAME}{}", std::env::consts::EXE_SUFFIX)
        })
    }

    /// Validate the settings and resolve the launch plan.
    pub fn launch_spec(&self) -> Result<LaunchSpec, SettingsError> {
        let path = self
            .launcher_path
            .as_deref()
            .ok_or(SettingsError::MissingLauncherPath)?;

        if path.trim().is_empty() {
            return Err(SettingsError::EmptyLauncherPath);
        }

        Ok(LaunchSpec {
            program: PathBuf::from(path.trim()),
            args: self.launcher_arguments(),
            env: self.environment(),
            descendant_name: self.supervisor_process_name(),
        })
    }
}

/// Everything needed to start the supervised child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments, starting with the launcher subcommand.
    pub args: Vec<String>,
    /// Environment overrides merged into the inherited environment.
    pub env: EnvOverrides,
    /// Process name of descendants to wait for after an unexpected exit.
    pub descendant_name: String,
}

impl LaunchSpec {
    /// Create a launch spec with no arguments or overrides.
    pub fn new(program: impl Into<PathBuf>, descendant_name: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: EnvOverrides::new(),
            descendant_name: descendant_name.into(),
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), Some(value.into()));
        self
    }

    /// Remove an environment variable from the child's environment.
    #[must_use]
    pub fn without_env(mut self, key: impl Into<String>) -> Self {
        self.env.insert(key.into(), None);
        self
    }

    /// Arguments joined for display.
    pub fn display_args(&self) -> String {
        self.args.join(" ")
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Missing 'launcherPath' setting in config")]
    MissingLauncherPath,

    #[error("'launcherPath' setting cannot be empty")]
    EmptyLauncherPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> ServiceSettings {
        ServiceSettings::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_launch_spec_from_full_settings() {
        let s = settings(&[
            ("launcherPath", "/usr/bin/child-sup"),
            ("launcherArgs", "--foo"),
            ("debug", "true"),
        ]);

        let spec = s.launch_spec().unwrap();
        assert_eq!(spec.program, PathBuf::from("/usr/bin/child-sup"));
        assert_eq!(spec.args, vec!["run", "--foo"]);
        assert_eq!(
            spec.env.get(CHILD_LOG_VAR),
            Some(&Some("debug".to_string()))
        );
        assert_eq!(
            spec.env.get(GLYPH_STYLE_VAR),
            Some(&Some("ascii".to_string()))
        );
    }

    #[test]
    fn test_env_prefixed_settings_become_child_variables() {
        let s = settings(&[("launcherPath", "/bin/true"), ("ENV_FOO_BAR", "baz")]);
        let spec = s.launch_spec().unwrap();
        assert_eq!(spec.env.get("FOO_BAR"), Some(&Some("baz".to_string())));
    }

    #[test]
    fn test_env_prefix_is_case_normalized() {
        let s = settings(&[(" env_log_dir ", "C:\\Logs")]);
        assert_eq!(s.env.get("LOG_DIR"), Some(&"C:\\Logs".to_string()));
    }

    #[test]
    fn test_bare_env_prefix_is_ignored() {
        let s = settings(&[("ENV_", "x")]);
        assert!(s.env.is_empty());
    }

    #[test]
    fn test_missing_launcher_path() {
        let s = settings(&[("launcherArgs", "--foo")]);
        assert_eq!(s.launch_spec(), Err(SettingsError::MissingLauncherPath));
    }

    #[test]
    fn test_empty_launcher_path() {
        let s = settings(&[("launcherPath", "   ")]);
        assert_eq!(s.launch_spec(), Err(SettingsError::EmptyLauncherPath));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let s = settings(&[("LAUNCHERPATH", "/opt/launcher"), ("Debug", "yes")]);
        assert_eq!(s.launcher_path.as_deref(), Some("/opt/launcher"));
        assert!(s.debug_enabled());
    }

    #[test]
    fn test_debug_false_clears_child_log_filter() {
        for value in ["false", "FALSE", "False"] {
            let s = settings(&[("debug", value)]);
            assert!(!s.debug_enabled());
            assert_eq!(s.environment().get(CHILD_LOG_VAR), Some(&None));
        }
    }

    #[test]
    fn test_debug_absent_clears_child_log_filter() {
        let s = ServiceSettings::default();
        assert!(!s.debug_enabled());
        assert_eq!(s.environment().get(CHILD_LOG_VAR), Some(&None));
    }

    #[test]
    fn test_env_setting_overrides_debug_but_not_glyph_style() {
        let s = settings(&[
            ("debug", "true"),
            ("ENV_RUST_LOG", "trace"),
            ("ENV_HAB_GLYPH_STYLE", "unicode"),
        ]);
        let env = s.environment();
        assert_eq!(env.get(CHILD_LOG_VAR), Some(&Some("trace".to_string())));
        assert_eq!(env.get(GLYPH_STYLE_VAR), Some(&Some("ascii".to_string())));
    }

    #[test]
    fn test_launcher_args_split_on_whitespace() {
        let s = settings(&[("launcherArgs", "  --listen-gossip 0.0.0.0:9638\t--no-color ")]);
        assert_eq!(
            s.launcher_arguments(),
            vec!["run", "--listen-gossip", "0.0.0.0:9638", "--no-color"]
        );
    }

    #[test]
    fn test_default_supervisor_name() {
        let s = ServiceSettings::default();
        assert_eq!(
            s.supervisor_process_name(),
            format!("bio-sup{}", std::env::consts::EXE_SUFFIX)
        );

        let s = settings(&[("supervisorName", "custom-sup")]);
        assert_eq!(s.supervisor_process_name(), "custom-sup");
    }

    #[test]
    fn test_launch_spec_serializes_cleared_variables_as_null() {
        let spec = LaunchSpec::new("/bin/launcher", "bio-sup").without_env("RUST_LOG");
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json["env"]["RUST_LOG"].is_null());
        assert_eq!(json["descendant_name"], "bio-sup");
    }
}
