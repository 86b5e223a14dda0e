//! Process table access backed by `sysinfo`.

use biosvc_core::{ProcessTableError, ProcessTablePort};
use std::ffi::OsStr;
use std::path::Path;
use sysinfo::{Pid, Process, ProcessStatus, ProcessesToUpdate, System};

/// [`ProcessTablePort`] over a fresh `sysinfo` snapshot per query.
///
/// Snapshots are best-effort: a process can appear or vanish between the
/// refresh and the caller acting on the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProcessTable;

impl SysinfoProcessTable {
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessTablePort for SysinfoProcessTable {
    fn find_children(&self, name: &str, parents: &[u32]) -> Result<Vec<u32>, ProcessTableError> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut pids: Vec<u32> = system
            .processes()
            .iter()
            .filter(|(_, process)| is_live(process))
            .filter(|(_, process)| {
                process
                    .parent()
                    .is_some_and(|parent| parents.contains(&parent.as_u32()))
            })
            .filter(|(_, process)| name_matches(process, name))
            .map(|(pid, _)| pid.as_u32())
            .collect();

        pids.sort_unstable();
        Ok(pids)
    }

    fn is_alive(&self, pid: u32) -> Result<bool, ProcessTableError> {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        Ok(system.process(pid).is_some_and(is_live))
    }
}

fn is_live(process: &Process) -> bool {
    !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
}

/// Match on the process name, falling back to the executable's file name
/// (Linux truncates `comm` to 15 bytes).
fn name_matches(process: &Process, name: &str) -> bool {
    let wanted = OsStr::new(name);
    if process.name() == wanted {
        return true;
    }

    process
        .exe()
        .and_then(Path::file_name)
        .is_some_and(|file_name| file_name == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_process_is_alive() {
        let table = SysinfoProcessTable::new();
        assert!(table.is_alive(std::process::id()).unwrap());
    }

    #[test]
    fn unknown_name_has_no_children() {
        let table = SysinfoProcessTable::new();
        let found = table
            .find_children("biosvc-no-such-process", &[std::process::id()])
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn finds_spawned_child_by_name() {
        use tokio::process::Command;

        let mut child = Command::new("sleep")
            .arg("5")
            .spawn()
            .expect("failed to spawn sleep");
        let pid = child.id().expect("no PID");

        let table = SysinfoProcessTable::new();
        let found = table
            .find_children("sleep", &[std::process::id()])
            .unwrap();
        assert!(found.contains(&pid));

        child.kill().await.unwrap();
    }
}
