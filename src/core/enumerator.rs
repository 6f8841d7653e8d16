use tracing::debug;

use crate::core::affinity::{AffinityMode, AffinityResolver};
use crate::core::error::ScanError;
use crate::core::host::{AffinityQuery, SnapshotSource};
use crate::core::record::{ThreadRecord, ThreadSink};

/// Walks a system-wide thread snapshot and streams the threads of one process.
pub struct ThreadEnumerator<'a, S, Q> {
    source: &'a S,
    resolver: &'a AffinityResolver<Q>,
    mode: AffinityMode,
}

impl<'a, S, Q> ThreadEnumerator<'a, S, Q>
where
    S: SnapshotSource,
    Q: AffinityQuery,
{
    pub fn new(source: &'a S, resolver: &'a AffinityResolver<Q>) -> Self {
        Self {
            source,
            resolver,
            mode: AffinityMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: AffinityMode) -> Self {
        self.mode = mode;
        self
    }

    /// Emits one record per thread owned by `pid`, in snapshot order, then
    /// calls [`ThreadSink::finish`]. Returns the number of matching threads.
    ///
    /// Zero matches (including a pid that does not exist) is a success.
    pub fn enumerate<K: ThreadSink>(&self, pid: u32, mut sink: K) -> Result<usize, ScanError> {
        let snapshot = self.source.take_snapshot()?;

        let mut visited = 0usize;
        let mut count = 0usize;
        for entry in snapshot {
            visited += 1;
            if entry.owner_process_id != pid {
                continue;
            }

            let affinity = self.resolver.resolve_with(entry.thread_id, self.mode);
            sink.emit(ThreadRecord::new(&entry, affinity))
                .map_err(ScanError::Output)?;
            count += 1;
        }

        debug!(pid, visited, count, "thread snapshot walked");
        sink.finish(pid, count).map_err(ScanError::Output)?;
        Ok(count)
    }

    /// Collects the records instead of streaming them.
    pub fn collect(&self, pid: u32) -> Result<Vec<ThreadRecord>, ScanError> {
        let mut records = Vec::new();
        self.enumerate(pid, &mut records)?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AffinityError;
    use crate::core::record::ThreadEntry;
    use crate::util::AffinityMask;
    use std::cell::Cell;
    use std::io;

    struct FixedSource {
        entries: Vec<ThreadEntry>,
        fail: bool,
    }

    impl SnapshotSource for FixedSource {
        type Snapshot = std::vec::IntoIter<ThreadEntry>;

        fn take_snapshot(&self) -> Result<Self::Snapshot, ScanError> {
            if self.fail {
                return Err(ScanError::FirstEntry(io::Error::from_raw_os_error(18)));
            }
            Ok(self.entries.clone().into_iter())
        }
    }

    /// Mask is the thread id; odd ids have exited.
    struct CountingQuery {
        calls: Cell<usize>,
    }

    impl AffinityQuery for CountingQuery {
        fn query_affinity(&self, thread_id: u32) -> Result<AffinityMask, AffinityError> {
            self.calls.set(self.calls.get() + 1);
            if thread_id % 2 == 1 {
                Err(AffinityError::Query { status: -1 })
            } else {
                Ok(AffinityMask::new(u64::from(thread_id)))
            }
        }
    }

    fn entry(thread_id: u32, owner: u32) -> ThreadEntry {
        ThreadEntry {
            thread_id,
            owner_process_id: owner,
            base_priority: 8,
            priority_delta: 0,
        }
    }

    fn source() -> FixedSource {
        FixedSource {
            entries: vec![
                entry(4, 100),
                entry(6, 200),
                entry(7, 100),
                entry(8, 300),
                entry(10, 100),
            ],
            fail: false,
        }
    }

    fn resolver() -> AffinityResolver<CountingQuery> {
        AffinityResolver::new(CountingQuery {
            calls: Cell::new(0),
        })
    }

    #[test]
    fn only_threads_of_the_target_are_emitted() {
        let source = source();
        let resolver = resolver();
        let records = ThreadEnumerator::new(&source, &resolver).collect(100).unwrap();

        let ids: Vec<u32> = records.iter().map(|r| r.thread_id).collect();
        assert_eq!(ids, vec![4, 7, 10]);
        assert!(records.iter().all(|r| r.owning_process_id == 100));
        // affinity is queried per match, never for other processes' threads
        assert_eq!(resolver.query().calls.get(), 3);
    }

    #[test]
    fn failed_query_is_zero_in_sentinel_mode() {
        let source = source();
        let resolver = resolver();
        let records = ThreadEnumerator::new(&source, &resolver).collect(100).unwrap();

        assert_eq!(records[0].affinity, Some(AffinityMask::new(4)));
        assert_eq!(records[1].affinity, Some(AffinityMask::EMPTY));
        assert_eq!(records[1].affinity_mask(), AffinityMask::EMPTY);
    }

    #[test]
    fn failed_query_is_none_in_distinct_mode() {
        let source = source();
        let resolver = resolver();
        let records = ThreadEnumerator::new(&source, &resolver)
            .with_mode(AffinityMode::Distinct)
            .collect(100)
            .unwrap();

        assert_eq!(records[1].thread_id, 7);
        assert_eq!(records[1].affinity, None);
        assert_eq!(records[2].affinity, Some(AffinityMask::new(10)));
    }

    #[test]
    fn unknown_pid_is_an_empty_success() {
        let source = source();
        let resolver = resolver();
        let count = ThreadEnumerator::new(&source, &resolver)
            .enumerate(424242, Vec::<ThreadRecord>::new())
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(resolver.query().calls.get(), 0);
    }

    #[test]
    fn snapshot_failure_propagates() {
        let source = FixedSource {
            entries: Vec::new(),
            fail: true,
        };
        let resolver = resolver();
        let err = ThreadEnumerator::new(&source, &resolver)
            .collect(100)
            .unwrap_err();
        assert!(matches!(err, ScanError::FirstEntry(_)));
    }

    #[test]
    fn sink_is_finished_with_the_count() {
        struct Recorder {
            emitted: usize,
            finished: Option<(u32, usize)>,
        }

        impl ThreadSink for Recorder {
            fn emit(&mut self, _record: ThreadRecord) -> io::Result<()> {
                self.emitted += 1;
                Ok(())
            }

            fn finish(&mut self, pid: u32, count: usize) -> io::Result<()> {
                self.finished = Some((pid, count));
                Ok(())
            }
        }

        let source = source();
        let resolver = resolver();
        let mut rec = Recorder {
            emitted: 0,
            finished: None,
        };
        let count = ThreadEnumerator::new(&source, &resolver)
            .enumerate(100, &mut rec)
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(rec.emitted, 3);
        assert_eq!(rec.finished, Some((100, 3)));
    }

    #[test]
    fn sink_write_error_stops_the_walk() {
        struct Broken;

        impl ThreadSink for Broken {
            fn emit(&mut self, _record: ThreadRecord) -> io::Result<()> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
        }

        let source = source();
        let resolver = resolver();
        let err = ThreadEnumerator::new(&source, &resolver)
            .enumerate(100, Broken)
            .unwrap_err();
        assert!(matches!(err, ScanError::Output(_)));
        assert_eq!(resolver.query().calls.get(), 1);
    }
}
