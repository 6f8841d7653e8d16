//! Toolhelp thread snapshots and `NtQueryInformationThread` affinity queries.

use std::ffi::c_void;
use std::{io, mem, ptr};

use tracing::debug;
use windows_sys::Win32::Foundation::{CloseHandle, FALSE, HANDLE, INVALID_HANDLE_VALUE, NTSTATUS};
use windows_sys::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Thread32First, Thread32Next, TH32CS_SNAPTHREAD, THREADENTRY32,
};
use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows_sys::Win32::System::Threading::{OpenThread, THREAD_QUERY_INFORMATION};

use crate::core::basic_info::BasicInfoLayout;
use crate::core::error::{AffinityError, CapabilityError, ScanError};
use crate::core::host::{AffinityQuery, Platform, SnapshotSource};
use crate::core::record::ThreadEntry;
use crate::util::AffinityMask;

const NTDLL: &str = "ntdll.dll";
const QUERY_SYMBOL: &str = "NtQueryInformationThread";
const QUERY_SYMBOL_Z: &[u8] = b"NtQueryInformationThread\0";

/// `THREADINFOCLASS::ThreadBasicInformation`
const THREAD_BASIC_INFORMATION: i32 = 0;

type NtQueryInformationThreadFn = unsafe extern "system" fn(
    thread: HANDLE,
    class: i32,
    info: *mut c_void,
    info_len: u32,
    return_len: *mut u32,
) -> NTSTATUS;

/// Closes the wrapped handle when dropped.
struct HandleGuard(HANDLE);

impl Drop for HandleGuard {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsPlatform;

impl Platform for WindowsPlatform {
    type Source = ToolhelpSource;
    type Query = NtThreadQuery;

    const QUERY_SYMBOL: &'static str = QUERY_SYMBOL;

    fn resolve_query(&self) -> Result<NtThreadQuery, CapabilityError> {
        let module_name: Vec<u16> = NTDLL.encode_utf16().chain(Some(0)).collect();
        let module = unsafe { GetModuleHandleW(module_name.as_ptr()) };
        if module == 0 {
            return Err(CapabilityError::ModuleNotFound { module: NTDLL });
        }

        let symbol = unsafe { GetProcAddress(module, QUERY_SYMBOL_Z.as_ptr()) }.ok_or(
            CapabilityError::SymbolNotFound {
                module: NTDLL,
                symbol: QUERY_SYMBOL,
            },
        )?;

        // SAFETY: the exported symbol has this signature on every supported release.
        let query = unsafe {
            mem::transmute::<unsafe extern "system" fn() -> isize, NtQueryInformationThreadFn>(
                symbol,
            )
        };
        debug!(module = NTDLL, symbol = QUERY_SYMBOL, "affinity query resolved");
        Ok(NtThreadQuery { query })
    }

    fn snapshot_source(&self) -> ToolhelpSource {
        ToolhelpSource
    }
}

/// Resolved `NtQueryInformationThread` entry point.
#[derive(Clone, Copy)]
pub struct NtThreadQuery {
    query: NtQueryInformationThreadFn,
}

impl std::fmt::Debug for NtThreadQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtThreadQuery").finish_non_exhaustive()
    }
}

#[repr(C, align(8))]
struct BlockBuffer([u8; BasicInfoLayout::MAX_SIZE]);

impl AffinityQuery for NtThreadQuery {
    fn query_affinity(&self, thread_id: u32) -> Result<AffinityMask, AffinityError> {
        let handle = unsafe { OpenThread(THREAD_QUERY_INFORMATION, FALSE, thread_id) };
        if handle == 0 {
            return Err(AffinityError::Open(io::Error::last_os_error()));
        }
        let thread = HandleGuard(handle);

        let layout = BasicInfoLayout::NATIVE;
        let mut block = BlockBuffer([0u8; BasicInfoLayout::MAX_SIZE]);
        let status = unsafe {
            (self.query)(
                thread.0,
                THREAD_BASIC_INFORMATION,
                block.0.as_mut_ptr().cast(),
                layout.size() as u32,
                ptr::null_mut(),
            )
        };
        if status != 0 {
            return Err(AffinityError::Query { status });
        }

        Ok(layout.decode(&block.0)?.affinity_mask)
    }
}

/// Source of `CreateToolhelp32Snapshot(TH32CS_SNAPTHREAD)` snapshots.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolhelpSource;

impl SnapshotSource for ToolhelpSource {
    type Snapshot = ToolhelpSnapshot;

    fn take_snapshot(&self) -> Result<ToolhelpSnapshot, ScanError> {
        // the process id argument is ignored for thread snapshots
        let handle = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPTHREAD, 0) };
        if handle == INVALID_HANDLE_VALUE {
            return Err(ScanError::Snapshot(io::Error::last_os_error()));
        }
        let handle = HandleGuard(handle);

        let mut raw: THREADENTRY32 = unsafe { mem::zeroed() };
        raw.dwSize = mem::size_of::<THREADENTRY32>() as u32;
        if unsafe { Thread32First(handle.0, &mut raw) } == FALSE {
            return Err(ScanError::FirstEntry(io::Error::last_os_error()));
        }

        Ok(ToolhelpSnapshot {
            pending: Some(entry_from_raw(&raw)),
            raw,
            handle,
            exhausted: false,
        })
    }
}

/// Live Toolhelp snapshot. The handle is closed when the iterator is dropped.
pub struct ToolhelpSnapshot {
    handle: HandleGuard,
    raw: THREADENTRY32,
    pending: Option<ThreadEntry>,
    exhausted: bool,
}

impl Iterator for ToolhelpSnapshot {
    type Item = ThreadEntry;

    fn next(&mut self) -> Option<ThreadEntry> {
        if let Some(first) = self.pending.take() {
            return Some(first);
        }
        if self.exhausted {
            return None;
        }
        if unsafe { Thread32Next(self.handle.0, &mut self.raw) } == FALSE {
            // ERROR_NO_MORE_FILES
            self.exhausted = true;
            return None;
        }
        Some(entry_from_raw(&self.raw))
    }
}

fn entry_from_raw(raw: &THREADENTRY32) -> ThreadEntry {
    ThreadEntry {
        thread_id: raw.th32ThreadID,
        owner_process_id: raw.th32OwnerProcessID,
        base_priority: raw.tpBasePri,
        priority_delta: raw.tpDeltaPri,
    }
}
