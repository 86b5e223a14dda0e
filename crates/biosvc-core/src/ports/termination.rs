//! Cooperative termination port.
//!
//! Delivering an interrupt to a child is host-specific (console control
//! events on Windows, process-group signals on Unix). The shutdown
//! coordinator only sees this trait.

use super::TerminationError;

/// Sends the cooperative termination signal to the supervised child.
pub trait CooperativeTermination: Send + Sync {
    /// Ask the child identified by `pid` to shut down in an orderly way.
    ///
    /// Implementations attach to whatever session the signal is scoped to,
    /// make sure the wrapper itself ignores the signal, and broadcast it.
    /// Failures of the preparatory steps are logged by the implementation;
    /// an `Err` means the signal was not delivered.
    fn send_cooperative_signal(&self, pid: u32) -> Result<(), TerminationError>;

    /// Release the session attached by [`Self::send_cooperative_signal`].
    ///
    /// Called once the child is gone. Hosts with nothing to release keep the
    /// default.
    fn detach(&self) -> Result<(), TerminationError> {
        Ok(())
    }
}
