//! Log sink port for relayed child output.
//!
//! This port abstracts the destination for lines the supervised child
//! writes to stdout/stderr.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which captured stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    /// Stream name used in log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port for appending child output lines to a sink.
///
/// Implementations must be thread-safe and should not block: they are
/// called from the relay tasks for every line.
pub trait LogSinkPort: Send + Sync {
    /// Append one line (without trailing newline). Never called with an
    /// empty line.
    fn append(&self, stream: OutputStream, line: &str);
}
