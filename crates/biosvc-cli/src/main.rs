//! biosvc entry point - the composition root.
//!
//! Parses arguments, initialises logging, then hands over to the library.
//! Every error that reaches this point is logged as fatal and mapped to an
//! exit code.

use std::process::ExitCode;

use biosvc_cli::{Cli, exit_code_for, logging};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the file writer's guard alive until exit so buffered lines flush
    let _log_guard = logging::init_tracing(cli.log_dir.as_deref());

    match biosvc_cli::run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            logging::log_fatal(&err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}
