//! The single supervised child process.
//!
//! The `tokio::process::Child` itself is owned by a dedicated exit watcher
//! task. Everybody else talks to it through a [`ChildControl`]: exit is a
//! single-fire `watch` notification, and forceful termination is a request
//! the watcher executes on the handle it owns.

use biosvc_core::{ChildExit, StopError};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type KillReply = oneshot::Sender<std::io::Result<()>>;

/// Cheap, cloneable access to a running child: its PID, its exit
/// notification and the forceful-kill request channel.
#[derive(Debug, Clone)]
pub struct ChildControl {
    pid: u32,
    exit_rx: watch::Receiver<Option<ChildExit>>,
    kill_tx: mpsc::Sender<KillReply>,
}

impl ChildControl {
    /// OS process identifier.
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status, if the child has terminated.
    pub fn exit_status(&self) -> Option<ChildExit> {
        *self.exit_rx.borrow()
    }

    /// Whether the child has terminated.
    pub fn has_exited(&self) -> bool {
        self.exit_status().is_some()
    }

    /// Wait until the child has terminated.
    ///
    /// Cancel safe.
    pub async fn exited(&self) -> ChildExit {
        let mut rx = self.exit_rx.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(exit) => (*exit).unwrap_or(ChildExit::UNKNOWN),
            // The watcher always publishes before it goes away.
            Err(_) => ChildExit::UNKNOWN,
        }
    }

    /// Forcefully terminate the child (`SIGKILL` / `TerminateProcess`).
    ///
    /// Returns once the kill was issued, not once the child is gone; use
    /// [`Self::exited`] for that. A child that has already been reaped is
    /// not an error.
    pub async fn kill(&self) -> Result<(), StopError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        if self.kill_tx.send(reply_tx).await.is_err() {
            debug!(pid = self.pid, "Kill requested after child was reaped");
            return Ok(());
        }

        match reply_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(StopError::KillFailed {
                pid: self.pid,
                reason: e.to_string(),
            }),
            // Watcher saw the exit before it got to our request.
            Err(_) => Ok(()),
        }
    }
}

/// The supervised child and everything attached to it.
#[derive(Debug)]
pub struct SupervisedChild {
    control: ChildControl,
    relays: Vec<JoinHandle<()>>,
}

impl SupervisedChild {
    pub(crate) fn new(control: ChildControl, relays: Vec<JoinHandle<()>>) -> Self {
        Self { control, relays }
    }

    /// OS process identifier.
    pub const fn pid(&self) -> u32 {
        self.control.pid
    }

    /// Control handle for waiting on and killing the child.
    pub fn control(&self) -> ChildControl {
        self.control.clone()
    }

    /// Exit status, if the child has terminated.
    pub fn exit_status(&self) -> Option<ChildExit> {
        self.control.exit_status()
    }

    /// Whether the child has terminated.
    pub fn has_exited(&self) -> bool {
        self.control.has_exited()
    }

    /// Take the output relay tasks for teardown.
    pub(crate) fn take_relays(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.relays)
    }
}

/// Spawn the task that owns `child`, reaps it and publishes its exit.
pub(crate) fn spawn_exit_watcher(child: Child, pid: u32) -> ChildControl {
    let (exit_tx, exit_rx) = watch::channel(None);
    let (kill_tx, kill_rx) = mpsc::channel(1);

    tokio::spawn(watch_exit(child, pid, exit_tx, kill_rx));

    ChildControl {
        pid,
        exit_rx,
        kill_tx,
    }
}

async fn watch_exit(
    mut child: Child,
    pid: u32,
    exit_tx: watch::Sender<Option<ChildExit>>,
    mut kill_rx: mpsc::Receiver<KillReply>,
) {
    let exit = loop {
        tokio::select! {
            status = child.wait() => {
                break match status {
                    Ok(status) => ChildExit::from(status),
                    Err(e) => {
                        warn!(pid, error = %e, "Failed to wait on child process");
                        ChildExit::UNKNOWN
                    }
                };
            }
            Some(reply) = kill_rx.recv() => {
                debug!(pid, "Issuing forceful kill");
                let _ = reply.send(child.start_kill());
            }
        }
    };

    debug!(pid, %exit, "Child process reaped");
    exit_tx.send_replace(Some(exit));
}
