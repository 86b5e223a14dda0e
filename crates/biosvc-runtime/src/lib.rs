//! Process supervision and OS-level concerns for biosvc.
//!
//! [`Supervisor`] launches the configured launcher, relays its output,
//! reacts to its exit and runs the graceful shutdown protocol. Everything
//! host-specific sits in `platform`.

#![deny(unsafe_code)]

mod child;
pub mod descendants;
mod launcher;
#[cfg(test)]
mod log_capture;
mod monitor;
pub mod platform;
pub mod process_table;
pub mod relay;
pub mod shutdown;
mod supervisor;

// Re-export the service implementation
pub use supervisor::{RELAY_DRAIN_TIMEOUT, Supervisor, SupervisorDeps};

// Re-export child handles and the launcher
pub use child::{ChildControl, SupervisedChild};
pub use launcher::ChildLauncher;

// Re-export default port implementations
pub use platform::PlatformTermination;
pub use process_table::SysinfoProcessTable;
pub use relay::{CHILD_LOG_TARGET, TracingLogSink};

// Re-export shutdown primitives
pub use descendants::{DESCENDANT_POLL_INTERVAL, DescendantWaiter};
pub use shutdown::{KILL_CONFIRM_TIMEOUT, SHUTDOWN_TIMEOUT, ShutdownCoordinator};
