#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use threadscope::core::{
    AffinityError, AffinityQuery, CapabilityError, Platform, ScanError, SnapshotSource,
    ThreadEntry,
};
use threadscope::AffinityMask;

/// Which setup step of a fake host fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    None,
    Capability,
    Snapshot,
    FirstEntry,
}

/// In-memory host: a fixed thread table and a per-thread affinity map.
/// Threads without a mask behave like threads that exited after the snapshot.
pub struct FakePlatform {
    entries: Vec<ThreadEntry>,
    masks: HashMap<u32, u64>,
    failure: Failure,
    pub resolve_calls: Cell<usize>,
    pub snapshot_calls: Rc<Cell<usize>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            masks: HashMap::new(),
            failure: Failure::None,
            resolve_calls: Cell::new(0),
            snapshot_calls: Rc::new(Cell::new(0)),
        }
    }

    /// Adds a live thread with the given affinity mask.
    pub fn thread(mut self, pid: u32, tid: u32, priority: i32, mask: u64) -> Self {
        self.entries.push(entry(pid, tid, priority));
        self.masks.insert(tid, mask);
        self
    }

    /// Adds a thread that is in the snapshot but gone by the time it is queried.
    pub fn exited_thread(mut self, pid: u32, tid: u32, priority: i32) -> Self {
        self.entries.push(entry(pid, tid, priority));
        self
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = failure;
        self
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn entry(pid: u32, tid: u32, priority: i32) -> ThreadEntry {
    ThreadEntry {
        thread_id: tid,
        owner_process_id: pid,
        base_priority: priority,
        priority_delta: 0,
    }
}

pub struct FakeSource {
    entries: Vec<ThreadEntry>,
    failure: Failure,
    calls: Rc<Cell<usize>>,
}

impl SnapshotSource for FakeSource {
    type Snapshot = std::vec::IntoIter<ThreadEntry>;

    fn take_snapshot(&self) -> Result<Self::Snapshot, ScanError> {
        self.calls.set(self.calls.get() + 1);
        match self.failure {
            // ERROR_ACCESS_DENIED
            Failure::Snapshot => Err(ScanError::Snapshot(io::Error::from_raw_os_error(5))),
            // ERROR_NO_MORE_FILES
            Failure::FirstEntry => Err(ScanError::FirstEntry(io::Error::from_raw_os_error(18))),
            _ => Ok(self.entries.clone().into_iter()),
        }
    }
}

pub struct FakeQuery {
    masks: HashMap<u32, u64>,
}

impl AffinityQuery for FakeQuery {
    fn query_affinity(&self, thread_id: u32) -> Result<AffinityMask, AffinityError> {
        self.masks
            .get(&thread_id)
            .map(|&bits| AffinityMask::new(bits))
            .ok_or_else(|| AffinityError::Open(io::Error::from(io::ErrorKind::NotFound)))
    }
}

impl Platform for FakePlatform {
    type Source = FakeSource;
    type Query = FakeQuery;

    const QUERY_SYMBOL: &'static str = "FakeQueryThread";

    fn resolve_query(&self) -> Result<FakeQuery, CapabilityError> {
        self.resolve_calls.set(self.resolve_calls.get() + 1);
        if self.failure == Failure::Capability {
            return Err(CapabilityError::SymbolNotFound {
                module: "fake.dll",
                symbol: Self::QUERY_SYMBOL,
            });
        }
        Ok(FakeQuery {
            masks: self.masks.clone(),
        })
    }

    fn snapshot_source(&self) -> FakeSource {
        FakeSource {
            entries: self.entries.clone(),
            failure: self.failure,
            calls: Rc::clone(&self.snapshot_calls),
        }
    }
}

/// Thread ids printed in a report, sorted (snapshot order is not guaranteed).
pub fn thread_ids(report: &str) -> Vec<u32> {
    let mut ids: Vec<u32> = report
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("- thread id "))
        .filter_map(|rest| rest.split_whitespace().next())
        .filter_map(|id| id.parse().ok())
        .collect();
    ids.sort_unstable();
    ids
}
