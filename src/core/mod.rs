pub mod affinity;
pub mod basic_info;
pub mod enumerator;
pub mod error;
pub mod host;
pub mod record;
pub mod report;

pub use affinity::{AffinityMode, AffinityResolver};
pub use basic_info::{BasicInfoLayout, BasicInformation};
pub use enumerator::ThreadEnumerator;
pub use error::{AffinityError, CapabilityError, DecodeError, ScanError};
pub use host::{AffinityQuery, Platform, SnapshotSource};
pub use record::{ThreadEntry, ThreadRecord, ThreadSink};
pub use report::Report;
