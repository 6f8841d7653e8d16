use std::io;

use crate::util::AffinityMask;

/// One raw entry of a system-wide thread snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadEntry {
    pub thread_id: u32,
    pub owner_process_id: u32,
    pub base_priority: i32,
    pub priority_delta: i32,
}

/// A thread of the scanned process, built and printed within one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadRecord {
    pub thread_id: u32,
    pub owning_process_id: u32,
    pub base_priority: i32,
    pub priority_delta: i32,
    /// `None` only when the caller asked for distinguishable failures and the
    /// query failed. In the default mode a failure is `Some(EMPTY)`.
    pub affinity: Option<AffinityMask>,
}

impl ThreadRecord {
    pub fn new(entry: &ThreadEntry, affinity: Option<AffinityMask>) -> Self {
        Self {
            thread_id: entry.thread_id,
            owning_process_id: entry.owner_process_id,
            base_priority: entry.base_priority,
            priority_delta: entry.priority_delta,
            affinity,
        }
    }

    /// Mask with the zero sentinel standing in for an unavailable value.
    pub fn affinity_mask(&self) -> AffinityMask {
        self.affinity.unwrap_or(AffinityMask::EMPTY)
    }
}

/// Receiver of thread records as the enumerator discovers them.
pub trait ThreadSink {
    fn emit(&mut self, record: ThreadRecord) -> io::Result<()>;

    /// Called once after the walk with the number of records emitted.
    fn finish(&mut self, _pid: u32, _count: usize) -> io::Result<()> {
        Ok(())
    }
}

impl ThreadSink for Vec<ThreadRecord> {
    fn emit(&mut self, record: ThreadRecord) -> io::Result<()> {
        self.push(record);
        Ok(())
    }
}

impl<S: ThreadSink + ?Sized> ThreadSink for &mut S {
    fn emit(&mut self, record: ThreadRecord) -> io::Result<()> {
        (**self).emit(record)
    }

    fn finish(&mut self, pid: u32, count: usize) -> io::Result<()> {
        (**self).finish(pid, count)
    }
}
