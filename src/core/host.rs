//! Seams between the scanner and the host's introspection API.

use crate::core::error::{AffinityError, CapabilityError, ScanError};
use crate::core::record::ThreadEntry;
use crate::util::AffinityMask;

/// Takes point-in-time snapshots of every thread on the host.
pub trait SnapshotSource {
    type Snapshot: Iterator<Item = ThreadEntry>;

    /// Fails with [`ScanError::Snapshot`] if the snapshot cannot be created
    /// and [`ScanError::FirstEntry`] if its first entry cannot be read.
    fn take_snapshot(&self) -> Result<Self::Snapshot, ScanError>;
}

/// Reads the live affinity mask of a single thread.
pub trait AffinityQuery {
    fn query_affinity(&self, thread_id: u32) -> Result<AffinityMask, AffinityError>;
}

impl<Q: AffinityQuery + ?Sized> AffinityQuery for &Q {
    fn query_affinity(&self, thread_id: u32) -> Result<AffinityMask, AffinityError> {
        (**self).query_affinity(thread_id)
    }
}

/// Bundle of host capabilities used by one run.
pub trait Platform {
    type Source: SnapshotSource;
    type Query: AffinityQuery;

    /// Name of the low-level entry point backing [`Platform::Query`].
    const QUERY_SYMBOL: &'static str;

    /// Looks up the affinity query entry point. Called once per run.
    fn resolve_query(&self) -> Result<Self::Query, CapabilityError>;

    fn snapshot_source(&self) -> Self::Source;
}
