//! threadscope – list the threads of a process with their priority and CPU
//! affinity mask.
//!
//! This crate exports
//!  * `core`     – thread records, snapshot walking, affinity resolution, report lines
//!  * `platform` – Windows (Toolhelp + `NtQueryInformationThread`) and Linux
//!    (procfs + `sched_getaffinity`) implementations of the host seams
//!  * `config`   – TOML/YAML + environment configuration
//!  * `app`      – the command-line entry point used by the `threadscope` binary

// ───────────────────────────────────────────────────────────
// Public modules
// ───────────────────────────────────────────────────────────
pub mod app;
pub mod config;
pub mod core;
pub mod logging;
pub mod platform;
pub mod util;

// ───────────────────────────────────────────────────────────
// Re-exports
// ───────────────────────────────────────────────────────────
pub use app::{parse_pid, run, Cli, Outcome};
pub use config::Config;
pub use platform::NativePlatform;
pub use util::AffinityMask;
