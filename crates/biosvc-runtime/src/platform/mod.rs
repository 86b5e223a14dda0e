//! Host-specific process behaviour.
//!
//! Each target host provides:
//! - a [`CooperativeTermination`](biosvc_core::CooperativeTermination)
//!   implementation (`PlatformTermination`)
//! - `configure_command`, applied to the child's `Command` before spawn
//! - `prepare_host`, run once before the child is launched
//! - `descendant_parents`, the parent PIDs a descendant may have after the
//!   child exits
//! - `reap_adopted`, collecting an adopted descendant once it has exited

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{
    UnixTermination as PlatformTermination, configure_command, descendant_parents, prepare_host,
    reap_adopted,
};
#[cfg(windows)]
pub use windows::{
    WindowsTermination as PlatformTermination, configure_command, descendant_parents,
    prepare_host, reap_adopted,
};
