//! Host service manager ports.
//!
//! The host drives the service through [`HostedService`]; the service talks
//! back to the host through [`HostControl`] when it needs to stop itself.

use async_trait::async_trait;

/// Entry points the host service manager invokes.
///
/// # Design Rules
///
/// - Neither method returns an error: failures are logged at the routine
///   boundary, never surfaced to the host
/// - `start` returns once the child is launched, it does not wait for it
/// - `stop` may block until the child is gone (bounded by the shutdown
///   timeout plus the kill confirmation)
#[async_trait]
pub trait HostedService: Send + Sync {
    /// Launch the supervised child.
    async fn start(&self);

    /// Run the graceful shutdown protocol.
    async fn stop(&self);
}

/// Requests the host service manager can act on.
pub trait HostControl: Send + Sync {
    /// Ask the host to stop this service. Used after the child exited on its
    /// own. Must not block.
    fn request_stop(&self);
}
