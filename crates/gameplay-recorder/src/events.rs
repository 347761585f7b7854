//! Event model for recorded input
//!
//! Two independent streams (pointer, keyboard) with seconds-since-start
//! timestamps, plus the `Recording` container that goes to disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recording mode tag stored in the metadata block.
pub const MODE_RELATIVE: &str = "relative_mouse";

/// Mouse button identity, stored lowercase on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// A pointer-stream event. `t` is seconds since recording start,
/// monotonic-clock based.
///
/// Motion is stored as deltas from the previous sample, never absolute
/// coordinates, so a replay can be rescaled without knowing the screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    MoveRelative { dx: i32, dy: i32, t: f64 },
    Click { button: MouseButton, pressed: bool, t: f64 },
    Scroll { dx: i32, dy: i32, t: f64 },
}

impl PointerEvent {
    pub fn t(&self) -> f64 {
        match self {
            Self::MoveRelative { t, .. } | Self::Click { t, .. } | Self::Scroll { t, .. } => *t,
        }
    }
}

/// Key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Press,
    Release,
}

/// A keyboard-stream event.
///
/// `key` is a canonical lowercase name (`"a"`, `"f5"`, `"shift_l"`) for
/// recognized keys, or a `vk_<code>` fallback token carrying the raw
/// platform key code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub kind: KeyAction,
    pub key: String,
    pub t: f64,
}

/// Counters and mode tag stored alongside the streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub pointer_count: usize,
    pub key_count: usize,
    pub mode: String,
}

/// One capture session, frozen at stop time. Replay only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub pointer_events: Vec<PointerEvent>,
    pub key_events: Vec<KeyEvent>,
    /// Elapsed monotonic time between start and stop, not the timestamp
    /// of the last event.
    pub total_duration: f64,
    pub created_at: DateTime<Utc>,
    pub metadata: Metadata,
}

impl Recording {
    pub fn new(
        pointer_events: Vec<PointerEvent>,
        key_events: Vec<KeyEvent>,
        total_duration: f64,
    ) -> Self {
        Self {
            metadata: Metadata {
                pointer_count: pointer_events.len(),
                key_count: key_events.len(),
                mode: MODE_RELATIVE.to_string(),
            },
            pointer_events,
            key_events,
            total_duration,
            created_at: Utc::now(),
        }
    }

    pub fn event_count(&self) -> usize {
        self.pointer_events.len() + self.key_events.len()
    }
}
