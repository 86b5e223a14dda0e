//! Available subcommands.

use clap::Subcommand;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Start the launcher and supervise it until stopped
    #[default]
    Run,

    /// Validate the settings file and print the resolved launch plan
    CheckConfig,
}
