//! procfs thread snapshots.
//!
//! Every `<root>/<pid>/task/<tid>/stat` on the host is read, regardless of
//! which process is being scanned; the enumerator does the filtering. Processes
//! and threads that vanish while the tree is walked are skipped.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::core::error::ScanError;
use crate::core::host::SnapshotSource;
use crate::core::record::ThreadEntry;

pub const DEFAULT_PROC_ROOT: &str = "/proc";

#[derive(Debug, Clone)]
pub struct ProcfsSource {
    root: PathBuf,
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcfsSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SnapshotSource for ProcfsSource {
    type Snapshot = std::vec::IntoIter<ThreadEntry>;

    fn take_snapshot(&self) -> Result<Self::Snapshot, ScanError> {
        let procs = fs::read_dir(&self.root).map_err(ScanError::Snapshot)?;

        let mut entries = Vec::new();
        for proc_entry in procs.flatten() {
            let Some(pid) = parse_id(&proc_entry.file_name()) else {
                continue;
            };
            read_tasks(pid, &proc_entry.path().join("task"), &mut entries);
        }

        if entries.is_empty() {
            return Err(ScanError::FirstEntry(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no threads listed under {}", self.root.display()),
            )));
        }

        Ok(entries.into_iter())
    }
}

fn read_tasks(pid: u32, task_dir: &Path, out: &mut Vec<ThreadEntry>) {
    let Ok(tasks) = fs::read_dir(task_dir) else {
        trace!(pid, "process exited during snapshot");
        return;
    };

    for task in tasks.flatten() {
        let Some(tid) = parse_id(&task.file_name()) else {
            continue;
        };
        let stat = match fs::read_to_string(task.path().join("stat")) {
            Ok(stat) => stat,
            Err(e) => {
                trace!(pid, tid, error = %e, "thread stat unreadable");
                continue;
            }
        };
        if let Some((priority, nice)) = parse_stat_priority(&stat) {
            out.push(ThreadEntry {
                thread_id: tid,
                owner_process_id: pid,
                base_priority: priority,
                priority_delta: nice,
            });
        }
    }
}

fn parse_id(name: &OsStr) -> Option<u32> {
    let name = name.to_str()?;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Extracts `(priority, nice)` (fields 18 and 19) from a `stat` line.
///
/// The command name in field 2 may contain spaces and parentheses, so fields
/// are counted from the last `)`.
pub fn parse_stat_priority(stat: &str) -> Option<(i32, i32)> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace().skip(15);
    let priority = fields.next()?.parse().ok()?;
    let nice = fields.next()?.parse().ok()?;
    Some((priority, nice))
}
