use std::io;

use thiserror::Error;

/// The low-level affinity query entry point could not be obtained.
///
/// Raised once at startup; the program refuses to enumerate without it.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("module {module} is not loaded")]
    ModuleNotFound { module: &'static str },

    #[error("symbol {symbol} not found in {module}")]
    SymbolNotFound {
        module: &'static str,
        symbol: &'static str,
    },

    #[error("thread affinity queries are not supported on this host")]
    Unsupported,
}

/// Fatal failure while taking or walking the thread snapshot.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot create thread snapshot: {0}")]
    Snapshot(#[source] io::Error),

    #[error("cannot retrieve first thread: {0}")]
    FirstEntry(#[source] io::Error),

    #[error("thread snapshots are not supported on this host")]
    Unsupported,

    #[error("cannot write report: {0}")]
    Output(#[source] io::Error),
}

/// Per-thread affinity query failure. Never fatal: folded into the zero
/// sentinel unless the caller asked for the distinguishable variant.
#[derive(Debug, Error)]
pub enum AffinityError {
    #[error("cannot open thread for query: {0}")]
    Open(#[source] io::Error),

    #[error("thread information query failed with status {status:#010x}")]
    Query { status: i32 },

    #[error("affinity query failed: {0}")]
    Os(#[source] io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("basic information block truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_status_renders_as_ntstatus() {
        // STATUS_ACCESS_DENIED
        let err = AffinityError::Query {
            status: 0xC000_0022_u32 as i32,
        };
        assert_eq!(
            err.to_string(),
            "thread information query failed with status 0xc0000022"
        );
    }

    #[test]
    fn decode_error_converts_transparently() {
        let err: AffinityError = DecodeError::Truncated {
            expected: 48,
            actual: 12,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "basic information block truncated: expected 48 bytes, got 12"
        );
    }
}
