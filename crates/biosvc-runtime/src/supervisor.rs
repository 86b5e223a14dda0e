//! The hosted service: one supervised child from `start` to `stop`.
//!
//! The `Supervisor` owns the child and the lifecycle phase behind a single
//! `tokio::sync::Mutex`. The host calls [`HostedService::start`] and
//! [`HostedService::stop`]; neither surfaces errors, everything is logged at
//! the routine boundary.
//!
//! Key rules:
//! - **At most one child** per service instance, never restarted
//! - **Phase before signal**: `stop` moves to `HostInitiatedShutdown` and
//!   unregisters the exit monitor under the lock, before anything is sent
//!   to the child
//! - **Self-stop**: an unexpected exit waits for descendants, then asks the
//!   host to stop the service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use biosvc_core::{
    ChildExit, CooperativeTermination, HostControl, HostedService, LaunchError, LaunchSpec,
    LifecyclePhase, LogSinkPort, ProcessTablePort,
};

use crate::child::{ChildControl, SupervisedChild};
use crate::descendants::DescendantWaiter;
use crate::launcher::ChildLauncher;
use crate::monitor::ExitMonitor;
use crate::platform::{self, PlatformTermination};
use crate::process_table::SysinfoProcessTable;
use crate::relay::TracingLogSink;
use crate::shutdown::ShutdownCoordinator;

/// How long relay tasks may keep draining once the child has exited.
pub const RELAY_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// State shared between the service entry points and the exit monitor.
pub(crate) struct Supervision {
    pub(crate) phase: LifecyclePhase,
    pub(crate) child: Option<SupervisedChild>,
    pub(crate) stopped: bool,
}

/// Collaborators the supervisor talks to.
#[derive(Clone)]
pub struct SupervisorDeps {
    /// Receives relayed child output.
    pub sink: Arc<dyn LogSinkPort>,
    /// Delivers the cooperative termination signal.
    pub terminator: Arc<dyn CooperativeTermination>,
    /// Used to find descendants after an unexpected exit.
    pub process_table: Arc<dyn ProcessTablePort>,
    /// Told when the service wants to stop itself.
    pub host: Arc<dyn HostControl>,
}

impl SupervisorDeps {
    /// Tracing sink, the host's termination mechanism and `sysinfo` process
    /// table.
    pub fn platform_defaults(host: Arc<dyn HostControl>) -> Self {
        Self {
            sink: Arc::new(TracingLogSink),
            terminator: Arc::new(PlatformTermination),
            process_table: Arc::new(SysinfoProcessTable::new()),
            host,
        }
    }
}

/// What a `stop` call has to do, decided under the lock.
enum StopPlan {
    /// Nothing was started, or the child already exited.
    Complete,
    /// First stop of a running child: run the shutdown protocol.
    Shutdown(ChildControl),
    /// Another stop is already signalling the child.
    AwaitOther(ChildControl),
}

/// Supervises a single launcher process as a host OS service.
pub struct Supervisor {
    spec: LaunchSpec,
    launcher: ChildLauncher,
    coordinator: ShutdownCoordinator,
    waiter: DescendantWaiter,
    host: Arc<dyn HostControl>,
    state: Arc<Mutex<Supervision>>,
    monitor_cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(spec: LaunchSpec, deps: SupervisorDeps) -> Self {
        let waiter = DescendantWaiter::new(deps.process_table, spec.descendant_name.clone());

        Self {
            launcher: ChildLauncher::new(deps.sink),
            coordinator: ShutdownCoordinator::new(deps.terminator),
            waiter,
            host: deps.host,
            spec,
            state: Arc::new(Mutex::new(Supervision {
                phase: LifecyclePhase::Running,
                child: None,
                stopped: false,
            })),
            monitor_cancel: CancellationToken::new(),
        }
    }

    /// Supervisor wired to this host's default collaborators.
    pub fn with_platform_defaults(spec: LaunchSpec, host: Arc<dyn HostControl>) -> Self {
        Self::new(spec, SupervisorDeps::platform_defaults(host))
    }

    #[cfg(test)]
    pub(crate) fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.coordinator.set_grace(grace);
        self
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> LifecyclePhase {
        self.state.lock().await.phase
    }

    /// PID of the child, once started.
    pub async fn child_pid(&self) -> Option<u32> {
        self.state.lock().await.child.as_ref().map(SupervisedChild::pid)
    }

    /// Exit status of the child, once it has terminated.
    pub async fn child_exit(&self) -> Option<ChildExit> {
        self.state
            .lock()
            .await
            .child
            .as_ref()
            .and_then(SupervisedChild::exit_status)
    }

    async fn launch(&self) -> Result<(), LaunchError> {
        let mut state = self.state.lock().await;

        if let Some(child) = &state.child {
            return Err(LaunchError::AlreadyStarted(child.pid()));
        }

        info!(
            "biosvc service is starting launcher at: {}",
            self.spec.program.display()
        );
        info!(
            "biosvc service is starting launcher with args: {}",
            self.spec.display_args()
        );

        platform::prepare_host();
        let child = self.launcher.start(&self.spec)?;

        ExitMonitor {
            state: Arc::clone(&self.state),
            waiter: self.waiter.clone(),
            host: Arc::clone(&self.host),
            cancel: self.monitor_cancel.clone(),
        }
        .spawn(child.control());

        state.child = Some(child);
        Ok(())
    }

    /// Steps 1 and 2 of the stop protocol, under the lock.
    async fn plan_stop(&self) -> Option<StopPlan> {
        let mut state = self.state.lock().await;

        if state.stopped {
            return None;
        }

        let Some(child) = state.child.as_ref() else {
            return Some(StopPlan::Complete);
        };

        if child.has_exited() {
            return Some(StopPlan::Complete);
        }

        let control = child.control();
        if state.phase == LifecyclePhase::HostInitiatedShutdown {
            return Some(StopPlan::AwaitOther(control));
        }

        state.phase = LifecyclePhase::HostInitiatedShutdown;
        self.monitor_cancel.cancel();
        Some(StopPlan::Shutdown(control))
    }

    /// Let the relays drain what the child wrote, then drop them. Returns
    /// `false` if another stop already tore down.
    async fn teardown(&self) -> bool {
        let relays = {
            let mut state = self.state.lock().await;
            if state.stopped {
                return false;
            }
            state.stopped = true;
            state
                .child
                .as_mut()
                .map(SupervisedChild::take_relays)
                .unwrap_or_default()
        };

        let deadline = Instant::now() + RELAY_DRAIN_TIMEOUT;
        for mut relay in relays {
            if timeout_at(deadline, &mut relay).await.is_err() {
                debug!("Output relay still open after child exit, aborting");
                relay.abort();
            }
        }
        true
    }
}

#[async_trait]
impl HostedService for Supervisor {
    async fn start(&self) {
        info!("biosvc service {}", env!("CARGO_PKG_VERSION"));

        if let Err(e) = self.launch().await {
            error!("Error occurred while starting: {e}");
            if !matches!(e, LaunchError::AlreadyStarted(_)) {
                self.host.request_stop();
            }
        }
    }

    async fn stop(&self) {
        let Some(plan) = self.plan_stop().await else {
            debug!("Service already stopped");
            return;
        };

        match plan {
            StopPlan::Complete => {}
            StopPlan::Shutdown(control) => {
                if let Err(e) = self.coordinator.shutdown(&control).await {
                    error!(fatal = true, "Error occurred while stopping: {e}");
                }
            }
            StopPlan::AwaitOther(control) => {
                debug!(pid = control.pid(), "Stop already in progress, waiting");
                if timeout(self.coordinator.max_duration(), control.exited())
                    .await
                    .is_err()
                {
                    warn!(pid = control.pid(), "Child still running after concurrent stop");
                }
                // The stop that owns the shutdown tears down and confirms.
                return;
            }
        }

        if self.teardown().await {
            info!("biosvc service stopped");
        }
    }
}
