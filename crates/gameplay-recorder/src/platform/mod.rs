//! Platform backends for input injection
//!
//! Capture is cross-platform (rdev); synthesis is per-OS. Windows is the
//! supported injection target.

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "windows")]
pub use windows::SendInputPort;
