//! Capture session
//!
//! Turns global listener callbacks into the two recorded event streams.
//! Pointer moves, clicks/scrolls, and key transitions each arrive on
//! their own listener context, and `start`/`stop` may come from yet
//! another thread; one mutex guards every state transition and append.

use crate::events::{KeyAction, KeyEvent, MouseButton, PointerEvent, Recording};
use crate::keymap;
use crate::notify::{Notice, Notifier};
use crate::storage::{RecordingStore, StorageError};
use chrono::Local;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("input listener failed: {0}")]
    Listener(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The session-control key pair. Parameterized so an operator rebinding
/// the controls moves the stream filter with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedKeys {
    pub start: rdev::Key,
    pub stop: rdev::Key,
}

impl Default for ReservedKeys {
    fn default() -> Self {
        Self {
            start: rdev::Key::F9,
            stop: rdev::Key::F10,
        }
    }
}

impl ReservedKeys {
    fn contains(&self, key: rdev::Key) -> bool {
        key == self.start || key == self.stop
    }
}

struct SessionState {
    recording: bool,
    t0: Instant,
    last_pos: Option<(f64, f64)>,
    pointer_events: Vec<PointerEvent>,
    key_events: Vec<KeyEvent>,
    filename: String,
}

/// Idle -> Recording -> Idle, re-entrant: every stop writes a file and
/// the next start records under a fresh timestamped filename.
pub struct CaptureSession {
    state: Mutex<SessionState>,
    store: RecordingStore,
    reserved: ReservedKeys,
    notifier: Arc<dyn Notifier>,
}

impl CaptureSession {
    pub fn new(store: RecordingStore, reserved: ReservedKeys, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: Mutex::new(SessionState {
                recording: false,
                t0: Instant::now(),
                last_pos: None,
                pointer_events: Vec::new(),
                key_events: Vec::new(),
                filename: String::new(),
            }),
            store,
            reserved,
            notifier,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().recording
    }

    /// Begin a take under a wall-clock timestamped filename. No-op while
    /// already recording.
    pub fn start(&self) {
        self.start_with(format!(
            "replay_{}.json",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        ));
    }

    /// Begin a take saving under an explicit filename.
    pub fn start_with(&self, filename: String) {
        let file = {
            let mut s = self.state.lock();
            if s.recording {
                return;
            }
            s.pointer_events.clear();
            s.key_events.clear();
            s.last_pos = None;
            s.t0 = Instant::now();
            s.filename = filename;
            s.recording = true;
            s.filename.clone()
        };
        info!(file = %file, "recording started");
        self.notifier.notify(&Notice::CaptureStarted { file });
    }

    /// Finish the take: freeze the streams, write the file, return to
    /// Idle. No-op (returns `None`) while idle.
    pub fn stop(&self) -> Result<Option<PathBuf>, CaptureError> {
        let (recording, filename) = {
            let mut s = self.state.lock();
            if !s.recording {
                return Ok(None);
            }
            s.recording = false;
            let total = s.t0.elapsed().as_secs_f64();
            let recording = Recording::new(
                std::mem::take(&mut s.pointer_events),
                std::mem::take(&mut s.key_events),
                total,
            );
            (recording, std::mem::take(&mut s.filename))
        };

        let path = self.store.save(&recording, &filename)?;
        info!(path = %path.display(), "recording stopped");
        self.notifier.notify(&Notice::CaptureStopped {
            pointer_count: recording.metadata.pointer_count,
            key_count: recording.metadata.key_count,
            duration: recording.total_duration,
        });
        Ok(Some(path))
    }

    /// Route one raw listener event into the session.
    pub fn handle_event(&self, event: rdev::Event) {
        match event.event_type {
            rdev::EventType::MouseMove { x, y } => self.on_pointer_move(x, y),
            rdev::EventType::ButtonPress(button) => self.on_button(button, true),
            rdev::EventType::ButtonRelease(button) => self.on_button(button, false),
            rdev::EventType::Wheel { delta_x, delta_y } => self.on_wheel(delta_x, delta_y),
            rdev::EventType::KeyPress(key) => self.on_key(key, true),
            rdev::EventType::KeyRelease(key) => self.on_key(key, false),
        }
    }

    /// Pointer samples are reduced to deltas. The first sample after
    /// start only establishes the baseline; zero deltas are dropped.
    pub fn on_pointer_move(&self, x: f64, y: f64) {
        let mut s = self.state.lock();
        if !s.recording {
            return;
        }
        let t = s.t0.elapsed().as_secs_f64();
        let last = s.last_pos.replace((x, y));
        if let Some((lx, ly)) = last {
            let dx = (x - lx) as i32;
            let dy = (y - ly) as i32;
            if dx != 0 || dy != 0 {
                s.pointer_events.push(PointerEvent::MoveRelative { dx, dy, t });
            }
        }
    }

    pub fn on_button(&self, button: rdev::Button, pressed: bool) {
        let button = match button {
            rdev::Button::Left => MouseButton::Left,
            rdev::Button::Right => MouseButton::Right,
            rdev::Button::Middle => MouseButton::Middle,
            rdev::Button::Unknown(code) => {
                debug!(code, "ignoring unknown mouse button");
                return;
            }
        };
        let mut s = self.state.lock();
        if !s.recording {
            return;
        }
        let t = s.t0.elapsed().as_secs_f64();
        s.pointer_events.push(PointerEvent::Click { button, pressed, t });
    }

    pub fn on_wheel(&self, delta_x: i64, delta_y: i64) {
        let mut s = self.state.lock();
        if !s.recording {
            return;
        }
        let t = s.t0.elapsed().as_secs_f64();
        s.pointer_events.push(PointerEvent::Scroll {
            dx: delta_x as i32,
            dy: delta_y as i32,
            t,
        });
    }

    /// Key transitions are canonicalized and appended, except the two
    /// reserved control keys, which drive start/stop and never reach
    /// the stream.
    pub fn on_key(&self, key: rdev::Key, pressed: bool) {
        if self.reserved.contains(key) {
            if pressed {
                if key == self.reserved.start {
                    self.start();
                } else if let Err(e) = self.stop() {
                    error!(error = %e, "failed to finish recording");
                }
            }
            return;
        }

        let mut s = self.state.lock();
        if !s.recording {
            return;
        }
        let t = s.t0.elapsed().as_secs_f64();
        let kind = if pressed { KeyAction::Press } else { KeyAction::Release };
        s.key_events.push(KeyEvent {
            kind,
            key: keymap::canonical_key(key),
            t,
        });
    }

    /// Run the global listener on a dedicated thread. Registration
    /// failure surfaces as the thread's return value and leaves the
    /// session Idle.
    pub fn spawn_listener(self: &Arc<Self>) -> thread::JoinHandle<Result<(), CaptureError>> {
        let session = Arc::clone(self);
        thread::spawn(move || {
            rdev::listen(move |event| session.handle_event(event))
                .map_err(|e| CaptureError::Listener(format!("{e:?}")))
        })
    }
}
