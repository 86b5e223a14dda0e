//! Host adapter: maps the OS's termination requests onto
//! [`HostedService::stop`] and the service's own stop requests onto process
//! exit.

use biosvc_core::{HostControl, HostedService};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a service run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    /// The host (signal, console event) asked the service to stop.
    HostStop,
    /// The service stopped itself after the child exited.
    SelfStop,
}

impl ServiceOutcome {
    /// Process exit code: a self-initiated stop is reported as a failure so
    /// service managers can restart the unit.
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::HostStop => 0,
            Self::SelfStop => 1,
        }
    }
}

/// Drives a [`HostedService`] the way a service manager would.
#[derive(Debug, Clone, Default)]
pub struct ServiceHost {
    self_stop: CancellationToken,
}

impl ServiceHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `service` and stop it on the first OS termination request or
    /// self-stop request.
    pub async fn run(&self, service: &dyn HostedService) -> ServiceOutcome {
        self.run_until(service, shutdown_signal()).await
    }

    /// Like [`Self::run`], with `host_stop` standing in for the OS.
    pub async fn run_until<F>(&self, service: &dyn HostedService, host_stop: F) -> ServiceOutcome
    where
        F: Future<Output = ()>,
    {
        service.start().await;

        let outcome = tokio::select! {
            () = self.self_stop.cancelled() => ServiceOutcome::SelfStop,
            () = host_stop => {
                info!("Stop requested by host");
                ServiceOutcome::HostStop
            }
        };

        service.stop().await;
        outcome
    }
}

impl HostControl for ServiceHost {
    fn request_stop(&self) {
        debug!("Service requested its own stop");
        self.self_stop.cancel();
    }
}

/// Wait for Ctrl-C. A failure to listen waits forever instead of stopping.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = terminate => debug!("Received SIGTERM"),
        () = ctrl_c() => debug!("Received Ctrl-C"),
    }
}

#[cfg(windows)]
async fn shutdown_signal() {
    use tokio::signal::windows::{ctrl_close, ctrl_shutdown};

    let close = async {
        match ctrl_close() {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Unable to listen for console close");
                std::future::pending::<()>().await;
            }
        }
    };

    let shutdown = async {
        match ctrl_shutdown() {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Unable to listen for system shutdown");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c() => debug!("Received Ctrl-C"),
        () = close => debug!("Received console close"),
        () = shutdown => debug!("Received system shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records calls; optionally asks the host to stop from `start`.
    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<&'static str>>,
        host: Option<Arc<ServiceHost>>,
    }

    #[async_trait]
    impl HostedService for RecordingService {
        async fn start(&self) {
            self.calls.lock().unwrap().push("start");
            if let Some(host) = &self.host {
                host.request_stop();
            }
        }

        async fn stop(&self) {
            self.calls.lock().unwrap().push("stop");
        }
    }

    #[tokio::test]
    async fn test_host_stop_runs_stop_after_start() {
        let host = ServiceHost::new();
        let service = RecordingService::default();

        let outcome = host.run_until(&service, async {}).await;

        assert_eq!(outcome, ServiceOutcome::HostStop);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(*service.calls.lock().unwrap(), ["start", "stop"]);
        assert!(!host.self_stop.is_cancelled());
    }

    #[tokio::test]
    async fn test_self_stop_ends_the_run() {
        let host = Arc::new(ServiceHost::new());
        let service = RecordingService {
            host: Some(Arc::clone(&host)),
            ..RecordingService::default()
        };

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            host.run_until(&service, std::future::pending()),
        )
        .await
        .expect("self-stop was not observed");

        assert_eq!(outcome, ServiceOutcome::SelfStop);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(*service.calls.lock().unwrap(), ["start", "stop"]);
        assert!(host.self_stop.is_cancelled());
    }

    #[test]
    fn test_request_stop_is_idempotent() {
        let host = ServiceHost::new();
        host.request_stop();
        host.request_stop();
        assert!(host.self_stop.is_cancelled());
        assert_eq!(
            tokio_test::block_on(host.run_until(&RecordingService::default(), std::future::pending())),
            ServiceOutcome::SelfStop
        );
    }
}
