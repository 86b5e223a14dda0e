//! Host service entry point for biosvc.
//!
//! Loads the settings file, initialises logging and runs the
//! [`Supervisor`](biosvc_runtime::Supervisor) until the host or the child
//! ends it.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod host;
pub mod logging;
pub mod parser;

// Re-export primary types for convenient access
pub use commands::Commands;
pub use error::CliError;
pub use host::{ServiceHost, ServiceOutcome};
pub use parser::Cli;

/// Dispatch the parsed command line and return the process exit code.
/// `run` is the default command.
pub async fn run(cli: Cli) -> anyhow::Result<u8> {
    match cli.command.unwrap_or_default() {
        Commands::Run => {
            let outcome = handlers::run::execute(cli.config.as_deref()).await?;
            Ok(outcome.exit_code())
        }
        Commands::CheckConfig => {
            handlers::check_config::execute(cli.config.as_deref())?;
            Ok(0)
        }
    }
}

/// Exit code for an error that reached `main`.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
    u8::try_from(code).unwrap_or(1)
}
