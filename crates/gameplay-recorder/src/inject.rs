//! Input injection port
//!
//! The capability boundary between replay and the OS input-synthesis
//! facility. Implementations post real events (`platform::SendInputPort`
//! on Windows); tests substitute an in-memory port.

use crate::events::MouseButton;
use thiserror::Error;

/// Physical scan code plus the extended-key escape.
///
/// Right Ctrl and right Alt share their make code with the left variant
/// and are distinguished only by the platform's extended-key flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanKey {
    pub code: u16,
    pub extended: bool,
}

impl ScanKey {
    pub const fn new(code: u16) -> Self {
        Self { code, extended: false }
    }

    pub const fn extended(code: u16) -> Self {
        Self { code, extended: true }
    }
}

/// An OS injection call was rejected. Recoverable per event.
#[derive(Debug, Error)]
#[error("input injection failed: {0}")]
pub struct InjectError(pub String);

/// Synthesizes OS-level input. Every call maps to one OS event; none of
/// them blocks beyond the OS call itself.
pub trait InputPort: Send + Sync {
    /// Move the pointer by a relative delta.
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), InjectError>;

    /// Press or release a mouse button at the current position.
    fn set_button(&self, button: MouseButton, pressed: bool) -> Result<(), InjectError>;

    /// Generate vertical wheel ticks (positive scrolls up).
    fn scroll(&self, ticks: i32) -> Result<(), InjectError>;

    /// Press or release a key identified by its physical scan code.
    fn set_key(&self, key: ScanKey, pressed: bool) -> Result<(), InjectError>;
}
