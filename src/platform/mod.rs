//! Host implementations of the introspection seams.
//!
//! `NativePlatform` is the implementation for the build target.

pub mod procfs;
pub mod unsupported;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(windows)]
pub mod windows;

#[cfg(target_os = "linux")]
pub use linux::LinuxPlatform as NativePlatform;
#[cfg(not(any(windows, target_os = "linux")))]
pub use unsupported::UnsupportedPlatform as NativePlatform;
#[cfg(windows)]
pub use windows::WindowsPlatform as NativePlatform;
