use std::io;

use crate::core::error::{AffinityError, CapabilityError, ScanError};
use crate::core::host::{AffinityQuery, Platform, SnapshotSource};
use crate::core::record::ThreadEntry;
use crate::util::AffinityMask;

/// Host without a supported introspection API. Refuses every operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPlatform;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoSnapshots;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoAffinityQuery;

impl Platform for UnsupportedPlatform {
    type Source = NoSnapshots;
    type Query = NoAffinityQuery;

    const QUERY_SYMBOL: &'static str = "thread affinity query";

    fn resolve_query(&self) -> Result<NoAffinityQuery, CapabilityError> {
        Err(CapabilityError::Unsupported)
    }

    fn snapshot_source(&self) -> NoSnapshots {
        NoSnapshots
    }
}

impl SnapshotSource for NoSnapshots {
    type Snapshot = std::iter::Empty<ThreadEntry>;

    fn take_snapshot(&self) -> Result<Self::Snapshot, ScanError> {
        Err(ScanError::Unsupported)
    }
}

impl AffinityQuery for NoAffinityQuery {
    fn query_affinity(&self, _thread_id: u32) -> Result<AffinityMask, AffinityError> {
        Err(AffinityError::Os(io::Error::from(io::ErrorKind::Unsupported)))
    }
}
