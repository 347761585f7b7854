//! gameplay-recorder - deterministic input recording and replay
//!
//! Captures raw mouse and keyboard activity with monotonic timestamps,
//! persists it as portable JSON, and replays it by synthesizing OS-level
//! input at the original cadence, optionally rescaled.
//!
//! ## Platform Support
//!
//! - **Windows**: capture and injection (SendInput with scan codes)
//! - **macOS / Linux**: capture only, no injection backend yet
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gameplay_recorder::prelude::*;
//! use std::sync::Arc;
//!
//! let session = Arc::new(CaptureSession::new(
//!     RecordingStore::new("recordings"),
//!     ReservedKeys::default(),
//!     Arc::new(ConsoleNotifier),
//! ));
//! // F9 starts a take, F10 stops it and writes the file.
//! let listener = session.spawn_listener();
//! # let _ = listener;
//! ```

pub mod events;
pub mod inject;
pub mod keymap;
pub mod notify;
pub mod platform;
pub mod recorder;
pub mod replay;
pub mod storage;

pub use events::{KeyAction, KeyEvent, Metadata, MouseButton, PointerEvent, Recording};
pub use inject::{InjectError, InputPort, ScanKey};
pub use notify::{ConsoleNotifier, Notice, Notifier, NullNotifier};
pub use recorder::{CaptureError, CaptureSession, ReservedKeys};
pub use replay::{
    ReplayCanceller, ReplayError, ReplayHandle, ReplayOptions, ReplaySummary, Replayer,
};
pub use storage::{RecordingStore, StorageError};

pub mod prelude {
    pub use crate::events::{KeyAction, KeyEvent, MouseButton, PointerEvent, Recording};
    pub use crate::inject::{InputPort, ScanKey};
    pub use crate::notify::{ConsoleNotifier, Notice, Notifier, NullNotifier};
    pub use crate::recorder::{CaptureSession, ReservedKeys};
    pub use crate::replay::{ReplayOptions, ReplaySummary, Replayer};
    pub use crate::storage::RecordingStore;
}
