use std::str::FromStr;

use serde::Deserialize;

use crate::core::error::AffinityError;
use crate::core::host::AffinityQuery;
use crate::util::AffinityMask;

/// How a failed affinity query is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffinityMode {
    /// Fold failures into the zero mask.
    #[default]
    Sentinel,
    /// Keep failures apart from a genuinely empty mask.
    Distinct,
}

impl FromStr for AffinityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentinel" => Ok(AffinityMode::Sentinel),
            "distinct" => Ok(AffinityMode::Distinct),
            other => Err(format!(
                "unknown affinity mode '{other}' (expected 'sentinel' or 'distinct')"
            )),
        }
    }
}

/// Resolves thread affinity masks through a host capability.
#[derive(Debug)]
pub struct AffinityResolver<Q> {
    query: Q,
}

impl<Q: AffinityQuery> AffinityResolver<Q> {
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    /// Current mask of `thread_id`, or [`AffinityMask::EMPTY`] if the thread
    /// cannot be opened or queried.
    pub fn resolve(&self, thread_id: u32) -> AffinityMask {
        self.query
            .query_affinity(thread_id)
            .unwrap_or(AffinityMask::EMPTY)
    }

    pub fn try_resolve(&self, thread_id: u32) -> Result<AffinityMask, AffinityError> {
        self.query.query_affinity(thread_id)
    }

    /// Resolves according to `mode`; `None` only in [`AffinityMode::Distinct`].
    pub fn resolve_with(&self, thread_id: u32, mode: AffinityMode) -> Option<AffinityMask> {
        match mode {
            AffinityMode::Sentinel => Some(self.resolve(thread_id)),
            AffinityMode::Distinct => match self.try_resolve(thread_id) {
                Ok(mask) => Some(mask),
                Err(e) => {
                    tracing::debug!(thread_id, error = %e, "affinity unavailable");
                    None
                }
            },
        }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }
}
