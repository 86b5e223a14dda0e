//! Reaction to the child exiting.
//!
//! The monitor only acts on an exit that happens while the service is
//! `Running`. A host-initiated stop cancels it under the state lock before
//! signalling the child, and the monitor re-checks the phase under the same
//! lock, so an induced exit can never be mistaken for an unexpected one.

use crate::child::ChildControl;
use crate::descendants::DescendantWaiter;
use crate::supervisor::Supervision;
use biosvc_core::{HostControl, LifecyclePhase};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub(crate) struct ExitMonitor {
    pub(crate) state: Arc<Mutex<Supervision>>,
    pub(crate) waiter: DescendantWaiter,
    pub(crate) host: Arc<dyn HostControl>,
    pub(crate) cancel: CancellationToken,
}

impl ExitMonitor {
    pub(crate) fn spawn(self, child: ChildControl) -> JoinHandle<()> {
        tokio::spawn(self.run(child))
    }

    async fn run(self, child: ChildControl) {
        let pid = child.pid();

        let exit = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(pid, "Exit monitor unregistered");
                return;
            }
            exit = child.exited() => exit,
        };

        {
            let mut state = self.state.lock().await;
            if self.cancel.is_cancelled() || state.phase.is_shutting_down() {
                debug!(pid, phase = %state.phase, "Child exit was expected");
                return;
            }
            state.phase = LifecyclePhase::SelfInitiatedShutdown;
        }

        error!(pid, %exit, "Supervisor launcher has exited with {exit}");

        self.waiter.wait_for_descendants(pid).await;

        debug!(pid, "Requesting service stop");
        self.host.request_stop();
    }
}
