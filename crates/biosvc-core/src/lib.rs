//! Core domain types and port definitions for biosvc.
//!
//! `biosvc` runs a supervisor launcher as a host OS service. This crate holds
//! everything that does not touch the OS: settings interpretation, the
//! launch plan, lifecycle state, and the ports the runtime implements.

#![deny(unused_crate_dependencies)]

pub mod lifecycle;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use lifecycle::{ChildExit, LifecyclePhase};
pub use ports::{
    CooperativeTermination, HostControl, HostedService, LaunchError, LogSinkPort, OutputStream,
    ProcessTableError, ProcessTablePort, StopError, TerminationError,
};
pub use settings::{EnvOverrides, LaunchSpec, ServiceSettings, SettingsError};
