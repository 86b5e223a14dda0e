//! `biosvc run`: supervise the launcher until stopped.

use std::path::Path;
use std::sync::Arc;

use biosvc_runtime::Supervisor;

use crate::config::load_launch_spec;
use crate::error::CliError;
use crate::host::{ServiceHost, ServiceOutcome};

/// Load the settings, then run the supervisor under the host adapter.
///
/// Configuration errors are returned before anything is launched.
pub async fn execute(config: Option<&Path>) -> Result<ServiceOutcome, CliError> {
    let spec = load_launch_spec(config)?;

    let host = Arc::new(ServiceHost::new());
    let supervisor = Supervisor::with_platform_defaults(spec, host.clone());

    Ok(host.run(&supervisor).await)
}
