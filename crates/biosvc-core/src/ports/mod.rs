//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the supervision logic expects from the host.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No OS handles or process types in any signature (PIDs are plain `u32`)
//! - Host-specific behaviour (signals, consoles, process tables) lives behind
//!   a trait with one implementation per target host

pub mod host;
pub mod log_sink;
pub mod process_table;
pub mod termination;

use thiserror::Error;

pub use host::{HostControl, HostedService};
pub use log_sink::{LogSinkPort, OutputStream};
pub use process_table::ProcessTablePort;
pub use termination::CooperativeTermination;

/// Errors starting the supervised child.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A child has already been started for this service instance.
    #[error("Launcher already started (pid {0})")]
    AlreadyStarted(u32),

    /// The OS refused to start the executable.
    #[error("Failed to start {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    /// The child started but its PID could not be read.
    #[error("Started {0} but could not read its PID")]
    MissingPid(String),
}

/// Errors delivering the cooperative termination signal.
#[derive(Debug, Error)]
pub enum TerminationError {
    /// Could not attach to the child's console.
    #[error("Unable to attach to console of process {pid}: {reason}")]
    AttachFailed { pid: u32, reason: String },

    /// Could not stop this process from reacting to the signal itself.
    #[error("Failed to disable ctrl+c handling: {0}")]
    HandlerToggleFailed(String),

    /// The signal itself could not be sent.
    #[error("Failed to send interrupt to process {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },

    /// Could not detach from the child's console.
    #[error("Failed to detach from console: {0}")]
    DetachFailed(String),
}

/// Errors querying the host's process table.
#[derive(Debug, Error)]
pub enum ProcessTableError {
    /// The query itself failed.
    #[error("Process table query failed: {0}")]
    QueryFailed(String),

    /// The host offers no process table we can read.
    #[error("Process table unavailable: {0}")]
    Unavailable(String),
}

/// Fatal outcomes of the shutdown protocol.
#[derive(Debug, Error)]
pub enum StopError {
    /// The forceful kill could not be issued.
    #[error("Failed to kill process {pid}: {reason}")]
    KillFailed { pid: u32, reason: String },

    /// The child was killed but its exit was never observed.
    #[error("Process {pid} still running {waited_secs}s after forceful termination")]
    StillRunning { pid: u32, waited_secs: u64 },
}
