//! Process table query port.

use super::ProcessTableError;

/// Read-only view of the host's process table.
///
/// Results are best-effort snapshots: a process created right after a query
/// is missed, and a reused PID may match an unrelated process.
pub trait ProcessTablePort: Send + Sync {
    /// PIDs of live processes named `name` whose parent PID is one of
    /// `parents`.
    fn find_children(&self, name: &str, parents: &[u32]) -> Result<Vec<u32>, ProcessTableError>;

    /// Whether `pid` still refers to a live (non-zombie) process.
    fn is_alive(&self, pid: u32) -> Result<bool, ProcessTableError>;
}
