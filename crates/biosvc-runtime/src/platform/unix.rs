//! Unix: the child leads its own process group and is interrupted with
//! `SIGINT` sent to that group.

use biosvc_core::{CooperativeTermination, TerminationError};
use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::process::Command;
use tracing::debug;

/// Sends `SIGINT` to the child's process group.
///
/// There is no console to attach to, so the attach, handler and detach
/// steps have nothing to do: the wrapper is not a member of the group it
/// signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixTermination;

impl CooperativeTermination for UnixTermination {
    fn send_cooperative_signal(&self, pid: u32) -> Result<(), TerminationError> {
        let pgid = i32::try_from(pid).map_err(|_| TerminationError::SignalFailed {
            pid,
            reason: "PID out of range".to_string(),
        })?;

        match killpg(Pid::from_raw(pgid), Signal::SIGINT) {
            Ok(()) => Ok(()),
            // Group already gone; the exit wait will observe it.
            Err(Errno::ESRCH) => {
                debug!(pid, "Process group already exited");
                Ok(())
            }
            Err(e) => Err(TerminationError::SignalFailed {
                pid,
                reason: e.to_string(),
            }),
        }
    }
}

/// Put the child in a new process group with itself as leader.
pub fn configure_command(cmd: &mut Command) {
    cmd.process_group(0);
}

/// Register as child subreaper so descendants orphaned by the child are
/// re-parented to this process.
#[cfg(target_os = "linux")]
pub fn prepare_host() {
    match nix::sys::prctl::set_child_subreaper(true) {
        Ok(()) => debug!("Registered as child subreaper"),
        Err(e) => tracing::warn!(error = %e, "Failed to register as child subreaper"),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn prepare_host() {}

/// Parent PIDs a descendant may report: the child itself, or this process
/// once the child has exited and the descendant was adopted.
#[cfg(target_os = "linux")]
pub fn descendant_parents(child_pid: u32) -> Vec<u32> {
    vec![child_pid, std::process::id()]
}

#[cfg(not(target_os = "linux"))]
pub fn descendant_parents(child_pid: u32) -> Vec<u32> {
    vec![child_pid]
}

/// Reap `pid` if it is an exited process adopted by this one.
#[cfg(target_os = "linux")]
pub fn reap_adopted(pid: u32) {
    use nix::sys::wait::{WaitPidFlag, waitpid};

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };

    match waitpid(Pid::from_raw(raw), Some(WaitPidFlag::WNOHANG)) {
        Ok(status) => debug!(pid, ?status, "Reaped adopted descendant"),
        // Not our child: its parent reaps it.
        Err(Errno::ECHILD) => {}
        Err(e) => debug!(pid, error = %e, "Failed to reap descendant"),
    }
}

#[cfg(not(target_os = "linux"))]
pub const fn reap_adopted(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::time::Duration;

    #[tokio::test]
    async fn sigint_reaches_process_group() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "trap 'exit 7' INT; while :; do sleep 0.1; done"])
            .stdout(Stdio::null());
        configure_command(&mut cmd);

        let mut child = cmd.spawn().expect("failed to spawn sh");
        let pid = child.id().expect("no PID");

        // Let the shell install its trap.
        tokio::time::sleep(Duration::from_millis(300)).await;

        UnixTermination.send_cooperative_signal(pid).unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("child ignored SIGINT")
            .unwrap();

        assert_eq!(status.code(), Some(7));
    }

    #[tokio::test]
    async fn signalling_exited_group_is_not_an_error() {
        let mut cmd = Command::new("true");
        configure_command(&mut cmd);

        let mut child = cmd.spawn().expect("failed to spawn true");
        let pid = child.id().expect("no PID");
        child.wait().await.unwrap();

        assert!(UnixTermination.send_cooperative_signal(pid).is_ok());
    }

    #[test]
    fn detach_is_a_no_op() {
        assert!(UnixTermination.detach().is_ok());
    }

    #[test]
    fn child_is_always_a_candidate_parent() {
        assert!(descendant_parents(42).contains(&42));
    }
}
