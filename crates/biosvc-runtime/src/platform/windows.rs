//! Windows: the child runs without a window and is interrupted with a
//! Ctrl-C console event delivered through its console session.

#![allow(unsafe_code)]

use biosvc_core::{CooperativeTermination, TerminationError};
use tokio::process::Command;
use tracing::error;
use windows::Win32::Foundation::TRUE;
use windows::Win32::System::Console::{
    AttachConsole, CTRL_C_EVENT, FreeConsole, GenerateConsoleCtrlEvent, SetConsoleCtrlHandler,
};
use windows::Win32::System::Threading::CREATE_NO_WINDOW;

/// Attaches to the child's console and broadcasts `CTRL_C_EVENT` to it.
///
/// A process can be attached to one console at a time, so the wrapper gives
/// up its own console first and does not get it back after the stop.
/// Attach and handler failures are logged and the broadcast is attempted
/// anyway; only a failed broadcast is reported to the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsTermination;

impl CooperativeTermination for WindowsTermination {
    fn send_cooperative_signal(&self, pid: u32) -> Result<(), TerminationError> {
        // SAFETY: FreeConsole has no arguments. It fails when no console is
        // attached, which is the state we want anyway.
        let _ = unsafe { FreeConsole() };

        // SAFETY: AttachConsole takes a plain process id and has no memory
        // preconditions.
        if let Err(e) = unsafe { AttachConsole(pid) } {
            let err = TerminationError::AttachFailed {
                pid,
                reason: e.to_string(),
            };
            error!("{err}");
        }

        // SAFETY: a null handler with TRUE only toggles this process's
        // Ctrl-C handling; no callback is registered.
        if let Err(e) = unsafe { SetConsoleCtrlHandler(None, TRUE) } {
            let err = TerminationError::HandlerToggleFailed(e.to_string());
            error!("{err}");
        }

        // SAFETY: group id 0 targets every process sharing the attached
        // console; both arguments are plain integers.
        unsafe { GenerateConsoleCtrlEvent(CTRL_C_EVENT, 0) }.map_err(|e| {
            TerminationError::SignalFailed {
                pid,
                reason: e.to_string(),
            }
        })
    }

    fn detach(&self) -> Result<(), TerminationError> {
        // SAFETY: FreeConsole has no arguments; failing when no console is
        // attached is reported through the Result.
        unsafe { FreeConsole() }.map_err(|e| TerminationError::DetachFailed(e.to_string()))
    }
}

/// Start the child without a console window.
pub fn configure_command(cmd: &mut Command) {
    cmd.creation_flags(CREATE_NO_WINDOW.0);
}

pub const fn prepare_host() {}

/// Orphaned processes are not re-parented on Windows; only the child's
/// direct children are candidates.
pub fn descendant_parents(child_pid: u32) -> Vec<u32> {
    vec![child_pid]
}

pub const fn reap_adopted(_pid: u32) {}
