//! Graceful termination of the child with cooperative signal → bounded wait
//! → forceful kill escalation.

use crate::child::ChildControl;
use biosvc_core::{ChildExit, CooperativeTermination, StopError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

/// How long the child gets to exit after the cooperative signal.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// How long a forcefully killed child gets before the stop is reported as
/// failed.
pub const KILL_CONFIRM_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the signalling and waiting half of a host-initiated stop.
///
/// The caller is responsible for moving the lifecycle phase and
/// unregistering the exit monitor first.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    terminator: Arc<dyn CooperativeTermination>,
    grace: Duration,
}

impl ShutdownCoordinator {
    pub fn new(terminator: Arc<dyn CooperativeTermination>) -> Self {
        Self::with_grace(terminator, SHUTDOWN_TIMEOUT)
    }

    pub(crate) fn with_grace(terminator: Arc<dyn CooperativeTermination>, grace: Duration) -> Self {
        Self { terminator, grace }
    }

    #[cfg(test)]
    pub(crate) fn set_grace(&mut self, grace: Duration) {
        self.grace = grace;
    }

    /// Upper bound on how long [`Self::shutdown`] can take.
    pub fn max_duration(&self) -> Duration {
        self.grace + KILL_CONFIRM_TIMEOUT
    }

    /// Signal the child, wait for it, kill it if it does not cooperate, and
    /// detach from it.
    ///
    /// Signal delivery failures are logged and the wait still happens. The
    /// detach step runs whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns a [`StopError`] if the forceful kill could not be issued or
    /// the child was still running after it.
    pub async fn shutdown(&self, child: &ChildControl) -> Result<ChildExit, StopError> {
        let pid = child.pid();

        match self.terminator.send_cooperative_signal(pid) {
            Ok(()) => debug!(pid, "Cooperative termination signal sent"),
            Err(e) => error!(pid, "{e}"),
        }

        let result = self.await_exit(child).await;

        if let Err(e) = self.terminator.detach() {
            error!(pid, "{e}");
        }

        result
    }

    async fn await_exit(&self, child: &ChildControl) -> Result<ChildExit, StopError> {
        let pid = child.pid();

        if let Ok(exit) = timeout(self.grace, child.exited()).await {
            debug!(pid, %exit, "Child exited after cooperative signal");
            return Ok(exit);
        }

        error!(
            pid,
            waited_secs = self.grace.as_secs(),
            "Supervisor did not exit within the shutdown timeout!"
        );
        error!(pid, "Forcefully terminating Supervisor process.");

        child.kill().await?;

        timeout(KILL_CONFIRM_TIMEOUT, child.exited())
            .await
            .map_err(|_| StopError::StillRunning {
                pid,
                waited_secs: KILL_CONFIRM_TIMEOUT.as_secs(),
            })
    }
}
