//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;
use crate::config::CONFIG_ENV_VAR;
use crate::logging::LOG_DIR_ENV_VAR;

/// Command-line interface of the biosvc service wrapper.
#[derive(Debug, Parser)]
#[command(name = "biosvc")]
#[command(about = "Run the supervisor launcher as a host OS service")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to biosvc.env next to the executable)
    #[arg(short = 'c', long = "config", env = CONFIG_ENV_VAR, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to a daily-rolling file in this directory
    #[arg(long = "log-dir", env = LOG_DIR_ENV_VAR, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
