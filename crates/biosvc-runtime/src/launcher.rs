//! Starting the supervised child.
//!
//! The child gets piped stdout/stderr, a detached stdin and the current
//! environment merged with the launch plan's overrides. The output relays
//! and the exit watcher are attached before [`ChildLauncher::start`]
//! returns, so no line or exit event can be missed.

use crate::child::{SupervisedChild, spawn_exit_watcher};
use crate::platform;
use crate::relay::spawn_relays;
use biosvc_core::{LaunchError, LaunchSpec, LogSinkPort};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Spawns the child described by a [`LaunchSpec`] and wires its output to a
/// log sink.
#[derive(Clone)]
pub struct ChildLauncher {
    sink: Arc<dyn LogSinkPort>,
}

impl ChildLauncher {
    pub fn new(sink: Arc<dyn LogSinkPort>) -> Self {
        Self { sink }
    }

    /// Start the child.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::SpawnFailed`] if the OS refuses to start the
    /// executable, or [`LaunchError::MissingPid`] if it started but its PID
    /// is unavailable (the process is killed in that case).
    pub fn start(&self, spec: &LaunchSpec) -> Result<SupervisedChild, LaunchError> {
        let program = spec.program.display().to_string();

        let mut child = build_command(spec)
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        let Some(pid) = child.id() else {
            let _ = child.start_kill();
            return Err(LaunchError::MissingPid(program));
        };

        let relays = spawn_relays(&mut child, pid, &self.sink);
        let control = spawn_exit_watcher(child, pid);

        debug!(pid, program = %program, "Launcher process started");

        Ok(SupervisedChild::new(control, relays))
    }
}

/// Build the child's command: arguments, environment overrides (a `None`
/// value removes the variable), stdio and platform creation flags.
pub(crate) fn build_command(spec: &LaunchSpec) -> Command {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);

    for (key, value) in &spec.env {
        match value {
            Some(value) => cmd.env(key, value),
            None => cmd.env_remove(key),
        };
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    platform::configure_command(&mut cmd);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::tests::RecordingSink;
    use biosvc_core::{ChildExit, OutputStream};
    use std::time::Duration;

    fn launcher(sink: &Arc<RecordingSink>) -> ChildLauncher {
        ChildLauncher::new(Arc::clone(sink) as Arc<dyn LogSinkPort>)
    }

    #[test]
    fn build_command_applies_plan() {
        let spec = LaunchSpec::new("/usr/bin/child-sup", "bio-sup")
            .with_args(["run", "--foo"])
            .with_env("RUST_LOG", "debug")
            .without_env("STALE");

        let cmd = build_command(&spec);
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "/usr/bin/child-sup");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, ["run", "--foo"]);

        let envs: Vec<_> = std_cmd.get_envs().collect();
        assert!(envs.contains(&("RUST_LOG".as_ref(), Some("debug".as_ref()))));
        assert!(envs.contains(&("STALE".as_ref(), None)));
    }

    #[tokio::test]
    async fn missing_executable_is_a_launch_error() {
        let sink = Arc::new(RecordingSink::default());
        let spec = LaunchSpec::new("/nonexistent/biosvc-launcher", "bio-sup");

        let err = launcher(&sink).start(&spec).unwrap_err();
        assert!(matches!(err, LaunchError::SpawnFailed { .. }));
        assert!(err.to_string().contains("/nonexistent/biosvc-launcher"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn child_sees_environment_overrides() {
        let sink = Arc::new(RecordingSink::default());
        let spec = LaunchSpec::new("sh", "bio-sup")
            .with_args([
                "-c",
                "echo \"glyph=$HAB_GLYPH_STYLE\"; echo \"log=${RUST_LOG:-unset}\"",
            ])
            .with_env("HAB_GLYPH_STYLE", "ascii")
            .without_env("RUST_LOG");

        let mut child = launcher(&sink).start(&spec).unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(5), child.control().exited())
            .await
            .expect("child did not exit");
        assert_eq!(exit, ChildExit::with_code(0));

        for relay in child.take_relays() {
            relay.await.unwrap();
        }

        assert_eq!(
            sink.lines(),
            vec![
                (OutputStream::Stdout, "glyph=ascii".to_string()),
                (OutputStream::Stdout, "log=unset".to_string()),
            ]
        );
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn child_has_no_stdin() {
        let sink = Arc::new(RecordingSink::default());
        let spec = LaunchSpec::new("sh", "bio-sup").with_args(["-c", "cat; exit 5"]);

        let child = launcher(&sink).start(&spec).unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(5), child.control().exited())
            .await
            .expect("child blocked on stdin");

        assert_eq!(exit, ChildExit::with_code(5));
    }
}
