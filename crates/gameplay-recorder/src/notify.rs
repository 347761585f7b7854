//! Injected notification sink
//!
//! Capture and replay report their lifecycle through this trait so the
//! surrounding surface (console, toast, HUD) stays out of the engine and
//! tests can substitute a collecting or no-op sink.

/// A lifecycle notice emitted by the capture session or the replay worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    CaptureStarted {
        file: String,
    },
    CaptureStopped {
        pointer_count: usize,
        key_count: usize,
        duration: f64,
    },
    ReplayStarting {
        delay: f64,
    },
    ReplayProgress {
        done: usize,
        total: usize,
    },
    ReplayFinished {
        total: usize,
    },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Renders notices on stdout.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::CaptureStarted { file } => {
                println!("Recording... will save to {file}");
            }
            Notice::CaptureStopped { pointer_count, key_count, duration } => {
                println!(
                    "Recording stopped after {duration:.2}s ({pointer_count} pointer events, {key_count} key events)"
                );
            }
            Notice::ReplayStarting { delay } => {
                println!("Replay starts in {delay:.1}s...");
            }
            Notice::ReplayProgress { done, total } => {
                let pct = *done as f64 / *total as f64 * 100.0;
                println!("{pct:.1}% ({done}/{total})");
            }
            Notice::ReplayFinished { total } => {
                println!("Replay finished: {total} events");
            }
        }
    }
}

/// Discards every notice.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notice: &Notice) {}
}
