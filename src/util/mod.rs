pub mod affinity;

pub use affinity::AffinityMask;
