//! Replay engine
//!
//! Merges the two recorded streams into one time-ordered timeline and
//! drives an `InputPort` at the recorded cadence. Pointer motion is
//! rescaled through a per-axis carry accumulator so sub-unit deltas are
//! deferred instead of lost; a single bad event is logged and skipped,
//! never fatal to the rest of the run.

use crate::events::{KeyAction, KeyEvent, PointerEvent, Recording};
use crate::inject::{InjectError, InputPort};
use crate::keymap;
use crate::notify::{Notice, Notifier};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// Stop-flag poll interval; the longest a cancel can wait.
const STOP_POLL: Duration = Duration::from_millis(50);
/// Progress notice cadence, in events.
const PROGRESS_EVERY: usize = 100;
/// Remainder magnitude at which a truncated-to-zero axis is forced to
/// emit one unit anyway.
const STALL_DISCHARGE: f64 = 0.8;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("a replay is already running")]
    Busy,
    #[error("sensitivity must be positive, got {0}")]
    InvalidSensitivity(f64),
}

/// Per-event failures, captured and logged by the replay loop.
#[derive(Debug, Error)]
enum EventError {
    #[error("no scan code for key {0:?}")]
    UnresolvedKey(String),
    #[error(transparent)]
    Injection(#[from] InjectError),
}

#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    /// Pointer motion multiplier, must be > 0.
    pub sensitivity: f64,
    /// Pre-roll before the first event, seconds. Gives the operator time
    /// to focus the target window.
    pub start_delay: f64,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            start_delay: 0.0,
        }
    }
}

/// Outcome of one replay run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub total: usize,
    pub dispatched: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Cloneable cancel signal detached from the handle, for Ctrl+C handlers
/// and the like.
#[derive(Clone)]
pub struct ReplayCanceller {
    stop: Arc<AtomicBool>,
}

impl ReplayCanceller {
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Owns one running replay worker.
pub struct ReplayHandle {
    stop: Arc<AtomicBool>,
    done: Receiver<ReplaySummary>,
    thread: thread::JoinHandle<()>,
}

impl ReplayHandle {
    /// Signal cancellation; takes effect at the next sleep boundary.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn canceller(&self) -> ReplayCanceller {
        ReplayCanceller {
            stop: Arc::clone(&self.stop),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the worker finishes.
    pub fn wait(self) -> ReplaySummary {
        let summary = self.done.recv().unwrap_or_default();
        let _ = self.thread.join();
        summary
    }
}

pub struct Replayer {
    port: Arc<dyn InputPort>,
    notifier: Arc<dyn Notifier>,
    busy: Arc<AtomicBool>,
}

impl Replayer {
    pub fn new(port: Arc<dyn InputPort>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            port,
            notifier,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start replaying on a dedicated worker thread.
    ///
    /// A second call while a replay is still running returns `Busy`:
    /// two streams injected into one port would interleave nonsense.
    pub fn play(
        &self,
        recording: Recording,
        options: ReplayOptions,
    ) -> Result<ReplayHandle, ReplayError> {
        if !(options.sensitivity > 0.0) {
            return Err(ReplayError::InvalidSensitivity(options.sensitivity));
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(ReplayError::Busy);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = bounded(1);
        let port = Arc::clone(&self.port);
        let notifier = Arc::clone(&self.notifier);
        let busy = Arc::clone(&self.busy);
        let worker_stop = Arc::clone(&stop);

        let thread = thread::spawn(move || {
            let summary = run(&recording, options, port.as_ref(), notifier.as_ref(), &worker_stop);
            busy.store(false, Ordering::SeqCst);
            let _ = done_tx.send(summary);
        });

        Ok(ReplayHandle {
            stop,
            done: done_rx,
            thread,
        })
    }
}

/// One entry of the merged timeline, borrowing from the recording.
#[derive(Debug)]
enum Step<'a> {
    Pointer(&'a PointerEvent),
    Key(&'a KeyEvent),
}

impl Step<'_> {
    fn t(&self) -> f64 {
        match self {
            Step::Pointer(p) => p.t(),
            Step::Key(k) => k.t,
        }
    }
}

/// Stable sort keeps the construction order for equal timestamps, so a
/// pointer event recorded at the same instant as a key event replays
/// first, exactly as the streams were merged at capture time.
fn merge(recording: &Recording) -> Vec<Step<'_>> {
    let mut steps: Vec<Step> = recording
        .pointer_events
        .iter()
        .map(Step::Pointer)
        .chain(recording.key_events.iter().map(Step::Key))
        .collect();
    steps.sort_by(|a, b| a.t().total_cmp(&b.t()));
    steps
}

/// Per-axis fractional remainder kept across pointer samples, so scaled
/// sub-unit motion is deferred to a later sample instead of truncated
/// away.
#[derive(Debug, Default)]
struct CarryAccumulator {
    rem_x: f64,
    rem_y: f64,
}

impl CarryAccumulator {
    fn apply(&mut self, dx: f64, dy: f64) -> (i32, i32) {
        self.rem_x += dx;
        self.rem_y += dy;
        (Self::discharge(&mut self.rem_x), Self::discharge(&mut self.rem_y))
    }

    /// Truncate toward zero, keep the fraction. An axis stuck below one
    /// unit discharges a forced +/-1 once the remainder reaches
    /// `STALL_DISCHARGE`, so very low sensitivities still move.
    fn discharge(rem: &mut f64) -> i32 {
        let mut out = rem.trunc() as i32;
        *rem -= out as f64;
        if out == 0 && rem.abs() >= STALL_DISCHARGE {
            out = if *rem > 0.0 { 1 } else { -1 };
            *rem -= out as f64;
        }
        out
    }
}

/// Sleep until `target` seconds after `t0`, polling the stop flag at
/// every boundary. Returns false when cancelled. Arriving late just
/// means no sleep; events are never dropped to catch up.
fn pace(t0: Instant, target: f64, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let elapsed = t0.elapsed().as_secs_f64();
        if elapsed >= target {
            return true;
        }
        thread::sleep(Duration::from_secs_f64(target - elapsed).min(STOP_POLL));
    }
}

fn run(
    recording: &Recording,
    options: ReplayOptions,
    port: &dyn InputPort,
    notifier: &dyn Notifier,
    stop: &AtomicBool,
) -> ReplaySummary {
    let steps = merge(recording);
    let mut summary = ReplaySummary {
        total: steps.len(),
        ..Default::default()
    };

    if options.start_delay > 0.0 {
        notifier.notify(&Notice::ReplayStarting {
            delay: options.start_delay,
        });
        if !pace(Instant::now(), options.start_delay, stop) {
            summary.cancelled = true;
            return summary;
        }
    }

    let t0 = Instant::now();
    let mut carry = CarryAccumulator::default();

    for (i, step) in steps.iter().enumerate() {
        if !pace(t0, step.t(), stop) {
            summary.cancelled = true;
            return summary;
        }

        match dispatch(step, options.sensitivity, &mut carry, port) {
            Ok(()) => summary.dispatched += 1,
            Err(err) => {
                summary.skipped += 1;
                warn!(event = ?step, error = %err, "event skipped");
            }
        }

        if (i + 1) % PROGRESS_EVERY == 0 {
            notifier.notify(&Notice::ReplayProgress {
                done: i + 1,
                total: steps.len(),
            });
        }
    }

    notifier.notify(&Notice::ReplayFinished { total: steps.len() });
    summary
}

fn dispatch(
    step: &Step<'_>,
    sensitivity: f64,
    carry: &mut CarryAccumulator,
    port: &dyn InputPort,
) -> Result<(), EventError> {
    match step {
        Step::Pointer(PointerEvent::MoveRelative { dx, dy, .. }) => {
            let (dx, dy) = carry.apply(f64::from(*dx) * sensitivity, f64::from(*dy) * sensitivity);
            if dx != 0 || dy != 0 {
                port.move_relative(dx, dy)?;
            }
            Ok(())
        }
        Step::Pointer(PointerEvent::Click { button, pressed, .. }) => {
            port.set_button(*button, *pressed)?;
            Ok(())
        }
        Step::Pointer(PointerEvent::Scroll { dy, .. }) => {
            // Horizontal ticks have no injection counterpart.
            port.scroll(*dy)?;
            Ok(())
        }
        Step::Key(event) => {
            let key = keymap::resolve(&event.key)
                .ok_or_else(|| EventError::UnresolvedKey(event.key.clone()))?;
            port.set_key(key, event.kind == KeyAction::Press)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MouseButton;
    use crate::inject::ScanKey;
    use crate::notify::NullNotifier;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Move(i32, i32),
        Button(MouseButton, bool),
        Scroll(i32),
        Key(u16, bool),
    }

    #[derive(Default)]
    struct MemoryPort {
        calls: Mutex<Vec<Call>>,
    }

    impl MemoryPort {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    impl InputPort for MemoryPort {
        fn move_relative(&self, dx: i32, dy: i32) -> Result<(), InjectError> {
            self.calls.lock().push(Call::Move(dx, dy));
            Ok(())
        }
        fn set_button(&self, button: MouseButton, pressed: bool) -> Result<(), InjectError> {
            self.calls.lock().push(Call::Button(button, pressed));
            Ok(())
        }
        fn scroll(&self, ticks: i32) -> Result<(), InjectError> {
            self.calls.lock().push(Call::Scroll(ticks));
            Ok(())
        }
        fn set_key(&self, key: ScanKey, pressed: bool) -> Result<(), InjectError> {
            self.calls.lock().push(Call::Key(key.code, pressed));
            Ok(())
        }
    }

    fn run_now(recording: &Recording, options: ReplayOptions, port: &MemoryPort) -> ReplaySummary {
        run(recording, options, port, &NullNotifier, &AtomicBool::new(false))
    }

    fn move_at(dx: i32, dy: i32, t: f64) -> PointerEvent {
        PointerEvent::MoveRelative { dx, dy, t }
    }

    fn key_at(key: &str, t: f64) -> KeyEvent {
        KeyEvent {
            kind: KeyAction::Press,
            key: key.into(),
            t,
        }
    }

    #[test]
    fn carry_accumulator_converges_at_low_sensitivity() {
        let mut carry = CarryAccumulator::default();
        let mut total = 0i32;
        for _ in 0..20 {
            let (dx, _) = carry.apply(0.1, 0.0);
            total += dx;
        }
        // 20 deltas of 1 at sensitivity 0.1 must come out as ~2 units,
        // never permanently truncated to zero.
        assert!((total - 2).abs() <= 1, "injected {total} units");
        assert!(total > 0);
    }

    #[test]
    fn carry_accumulator_handles_negative_motion() {
        let mut carry = CarryAccumulator::default();
        let mut total = 0i32;
        for _ in 0..20 {
            let (dx, _) = carry.apply(-0.1, 0.0);
            total += dx;
        }
        assert!((total + 2).abs() <= 1, "injected {total} units");
        assert!(total < 0);
    }

    #[test]
    fn unit_sensitivity_passes_motion_through() {
        let mut carry = CarryAccumulator::default();
        assert_eq!(carry.apply(5.0, -3.0), (5, -3));
        assert_eq!(carry.apply(1.0, 1.0), (1, 1));
    }

    #[test]
    fn all_zero_motion_is_not_injected() {
        let port = MemoryPort::default();
        let recording = Recording::new(vec![move_at(1, 1, 0.0)], vec![], 0.0);
        let summary = run_now(&recording, ReplayOptions { sensitivity: 0.1, start_delay: 0.0 }, &port);
        assert_eq!(summary.dispatched, 1);
        assert!(port.calls().is_empty());
    }

    #[test]
    fn merge_is_stable_pointer_before_key() {
        let recording = Recording::new(
            vec![PointerEvent::Click { button: MouseButton::Left, pressed: true, t: 1.0 }],
            vec![key_at("a", 1.0)],
            1.0,
        );
        let steps = merge(&recording);
        assert!(matches!(steps[0], Step::Pointer(_)));
        assert!(matches!(steps[1], Step::Key(_)));

        let port = MemoryPort::default();
        run_now(&recording, ReplayOptions { sensitivity: 1.0, start_delay: 0.0 }, &port);
        assert_eq!(
            port.calls(),
            vec![Call::Button(MouseButton::Left, true), Call::Key(0x1E, true)]
        );
    }

    #[test]
    fn merge_orders_across_streams_by_time() {
        let recording = Recording::new(
            vec![move_at(1, 0, 0.30), move_at(2, 0, 0.10)],
            vec![key_at("a", 0.20)],
            0.3,
        );
        let times: Vec<f64> = merge(&recording).iter().map(Step::t).collect();
        assert_eq!(times, vec![0.10, 0.20, 0.30]);
    }

    #[test]
    fn cadence_never_races_ahead() {
        let port = MemoryPort::default();
        let recording = Recording::new(
            vec![move_at(1, 0, 0.1), move_at(1, 0, 0.3)],
            vec![],
            0.3,
        );
        let started = Instant::now();
        run_now(&recording, ReplayOptions::default(), &port);
        assert!(started.elapsed().as_secs_f64() >= 0.3);
        assert_eq!(port.calls().len(), 2);
    }

    #[test]
    fn one_bad_key_does_not_abort_the_rest() {
        let mut keys: Vec<KeyEvent> = (0..25)
            .flat_map(|i| {
                let t = i as f64 * 0.001;
                [
                    key_at("a", t),
                    KeyEvent { kind: KeyAction::Release, key: "a".into(), t },
                ]
            })
            .collect();
        keys.insert(10, key_at("unknown_token_zz", 0.005));

        let port = MemoryPort::default();
        let recording = Recording::new(vec![], keys, 0.03);
        let summary = run_now(&recording, ReplayOptions::default(), &port);

        assert_eq!(summary.total, 51);
        assert_eq!(summary.dispatched, 50);
        assert_eq!(summary.skipped, 1);
        assert_eq!(port.calls().len(), 50);
    }

    #[test]
    fn injection_failure_is_event_local() {
        struct FlakyPort {
            inner: MemoryPort,
        }
        impl InputPort for FlakyPort {
            fn move_relative(&self, dx: i32, dy: i32) -> Result<(), InjectError> {
                self.inner.move_relative(dx, dy)
            }
            fn set_button(&self, _: MouseButton, _: bool) -> Result<(), InjectError> {
                Err(InjectError("synthetic rejection".into()))
            }
            fn scroll(&self, ticks: i32) -> Result<(), InjectError> {
                self.inner.scroll(ticks)
            }
            fn set_key(&self, key: ScanKey, pressed: bool) -> Result<(), InjectError> {
                self.inner.set_key(key, pressed)
            }
        }

        let port = FlakyPort { inner: MemoryPort::default() };
        let recording = Recording::new(
            vec![
                PointerEvent::Click { button: MouseButton::Left, pressed: true, t: 0.0 },
                PointerEvent::Scroll { dx: 0, dy: -1, t: 0.0 },
            ],
            vec![],
            0.0,
        );
        let summary = run(&recording, ReplayOptions::default(), &port, &NullNotifier, &AtomicBool::new(false));
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(port.inner.calls(), vec![Call::Scroll(-1)]);
    }

    #[test]
    fn scroll_and_click_bypass_sensitivity() {
        let port = MemoryPort::default();
        let recording = Recording::new(
            vec![
                PointerEvent::Scroll { dx: 0, dy: 3, t: 0.0 },
                PointerEvent::Click { button: MouseButton::Middle, pressed: false, t: 0.0 },
            ],
            vec![],
            0.0,
        );
        run_now(&recording, ReplayOptions { sensitivity: 0.01, start_delay: 0.0 }, &port);
        assert_eq!(
            port.calls(),
            vec![Call::Scroll(3), Call::Button(MouseButton::Middle, false)]
        );
    }

    #[test]
    fn progress_and_completion_are_reported() {
        struct Collector(Mutex<Vec<Notice>>);
        impl Notifier for Collector {
            fn notify(&self, notice: &Notice) {
                self.0.lock().push(notice.clone());
            }
        }

        let keys: Vec<KeyEvent> = (0..250).map(|i| key_at("a", i as f64 * 1e-4)).collect();
        let recording = Recording::new(vec![], keys, 0.025);
        let collector = Collector(Mutex::new(Vec::new()));
        run(
            &recording,
            ReplayOptions::default(),
            &MemoryPort::default(),
            &collector,
            &AtomicBool::new(false),
        );

        let notices = collector.0.into_inner();
        let progress: Vec<_> = notices
            .iter()
            .filter(|n| matches!(n, Notice::ReplayProgress { .. }))
            .collect();
        assert_eq!(progress.len(), 2);
        assert_eq!(*progress[0], Notice::ReplayProgress { done: 100, total: 250 });
        assert_eq!(*notices.last().unwrap(), Notice::ReplayFinished { total: 250 });
    }

    #[test]
    fn invalid_sensitivity_is_rejected_before_start() {
        let replayer = Replayer::new(Arc::new(MemoryPort::default()), Arc::new(NullNotifier));
        let recording = Recording::new(vec![], vec![], 0.0);
        for bad in [0.0, -1.0, f64::NAN] {
            let err = replayer
                .play(recording.clone(), ReplayOptions { sensitivity: bad, start_delay: 0.0 })
                .err()
                .expect("must reject");
            assert!(matches!(err, ReplayError::InvalidSensitivity(_)));
        }
    }

    #[test]
    fn concurrent_play_is_rejected() {
        let replayer = Replayer::new(Arc::new(MemoryPort::default()), Arc::new(NullNotifier));
        let slow = Recording::new(vec![move_at(1, 0, 0.5)], vec![], 0.5);

        let handle = replayer.play(slow.clone(), ReplayOptions::default()).unwrap();
        let second = replayer.play(slow, ReplayOptions::default());
        assert!(matches!(second, Err(ReplayError::Busy)));

        handle.stop();
        let summary = handle.wait();
        assert!(summary.cancelled);

        // Once the worker is gone the replayer accepts work again.
        let empty = Recording::new(vec![], vec![], 0.0);
        let handle = replayer.play(empty, ReplayOptions::default()).unwrap();
        assert!(!handle.wait().cancelled);
    }

    #[test]
    fn stop_cancels_promptly_mid_replay() {
        let replayer = Replayer::new(Arc::new(MemoryPort::default()), Arc::new(NullNotifier));
        let long = Recording::new(vec![move_at(1, 0, 30.0)], vec![], 30.0);

        let handle = replayer.play(long, ReplayOptions::default()).unwrap();
        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        handle.stop();
        let summary = handle.wait();
        assert!(summary.cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn start_delay_is_cancellable() {
        let replayer = Replayer::new(Arc::new(MemoryPort::default()), Arc::new(NullNotifier));
        let recording = Recording::new(vec![move_at(1, 0, 0.0)], vec![], 0.0);
        let handle = replayer
            .play(recording, ReplayOptions { sensitivity: 1.0, start_delay: 30.0 })
            .unwrap();
        let canceller = handle.canceller();
        canceller.cancel();
        let summary = handle.wait();
        assert!(summary.cancelled);
        assert_eq!(summary.dispatched, 0);
    }
}
