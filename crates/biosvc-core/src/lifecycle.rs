//! Lifecycle state of the supervised child.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::ExitStatus;

/// Why the service is currently waiting on the child.
///
/// The exit monitor reads this when the child terminates to decide whether
/// the exit was expected. The shutdown coordinator must move the phase to
/// [`LifecyclePhase::HostInitiatedShutdown`] before it signals the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// The child is running and no stop has been requested.
    Running,
    /// The host service manager asked the service to stop.
    HostInitiatedShutdown,
    /// The child exited on its own and the service is stopping itself.
    SelfInitiatedShutdown,
}

impl LifecyclePhase {
    /// Whether a stop of either kind is under way.
    pub const fn is_shutting_down(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::HostInitiatedShutdown => write!(f, "host-initiated shutdown"),
            Self::SelfInitiatedShutdown => write!(f, "self-initiated shutdown"),
        }
    }
}

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildExit {
    /// Exit code, if the child exited normally.
    pub code: Option<i32>,
    /// Terminating signal on Unix, if the child was killed by one.
    pub signal: Option<i32>,
}

impl ChildExit {
    /// Termination whose status could not be read.
    pub const UNKNOWN: Self = Self {
        code: None,
        signal: None,
    };

    /// Exit with a plain exit code.
    pub const fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };

        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => write!(f, "unknown status"),
        }
    }
}
