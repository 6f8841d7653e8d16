//! procfs snapshots and `sched_getaffinity` affinity queries.

use std::ffi::c_void;
use std::path::PathBuf;
use std::{io, mem};

use tracing::debug;

use crate::core::error::{AffinityError, CapabilityError};
use crate::core::host::{AffinityQuery, Platform};
use crate::platform::procfs::{ProcfsSource, DEFAULT_PROC_ROOT};
use crate::util::affinity::{AffinityMask, MASK_BITS};

const LIBC: &str = "libc";
const QUERY_SYMBOL: &str = "sched_getaffinity";
const QUERY_SYMBOL_Z: &[u8] = b"sched_getaffinity\0";

type SchedGetAffinityFn = unsafe extern "C" fn(
    pid: libc::pid_t,
    size: libc::size_t,
    mask: *mut libc::cpu_set_t,
) -> libc::c_int;

#[derive(Debug, Clone)]
pub struct LinuxPlatform {
    proc_root: PathBuf,
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
        }
    }
}

impl LinuxPlatform {
    /// Platform reading thread snapshots from a procfs mounted at `proc_root`.
    pub fn with_proc_root<P: Into<PathBuf>>(proc_root: P) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }
}

impl Platform for LinuxPlatform {
    type Source = ProcfsSource;
    type Query = SchedAffinityQuery;

    const QUERY_SYMBOL: &'static str = QUERY_SYMBOL;

    fn resolve_query(&self) -> Result<SchedAffinityQuery, CapabilityError> {
        let symbol: *mut c_void =
            unsafe { libc::dlsym(libc::RTLD_DEFAULT, QUERY_SYMBOL_Z.as_ptr().cast()) };
        if symbol.is_null() {
            return Err(CapabilityError::SymbolNotFound {
                module: LIBC,
                symbol: QUERY_SYMBOL,
            });
        }

        // SAFETY: glibc and musl export sched_getaffinity with this signature.
        let getaffinity = unsafe { mem::transmute::<*mut c_void, SchedGetAffinityFn>(symbol) };
        debug!(module = LIBC, symbol = QUERY_SYMBOL, "affinity query resolved");
        Ok(SchedAffinityQuery { getaffinity })
    }

    fn snapshot_source(&self) -> ProcfsSource {
        ProcfsSource::new(self.proc_root.clone())
    }
}

/// Resolved `sched_getaffinity` entry point.
#[derive(Clone, Copy)]
pub struct SchedAffinityQuery {
    getaffinity: SchedGetAffinityFn,
}

impl std::fmt::Debug for SchedAffinityQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedAffinityQuery").finish_non_exhaustive()
    }
}

impl AffinityQuery for SchedAffinityQuery {
    fn query_affinity(&self, thread_id: u32) -> Result<AffinityMask, AffinityError> {
        // 0 would name the calling thread
        let tid = match libc::pid_t::try_from(thread_id) {
            Ok(tid) if tid > 0 => tid,
            _ => return Err(AffinityError::Os(io::Error::from_raw_os_error(libc::ESRCH))),
        };

        let mut set: libc::cpu_set_t = unsafe { mem::zeroed() };
        let rc = unsafe { (self.getaffinity)(tid, mem::size_of::<libc::cpu_set_t>(), &mut set) };
        if rc != 0 {
            return Err(AffinityError::Os(io::Error::last_os_error()));
        }

        let cpus = (0..MASK_BITS).filter(|&cpu| unsafe { libc::CPU_ISSET(cpu, &set) });
        let mask = AffinityMask::from_cpus(cpus);
        if mask.is_empty() {
            debug!(tid = thread_id, "no allowed CPU below the mask width");
        }
        Ok(mask)
    }
}
