//! gr - gameplay input recorder CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use gameplay_recorder::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gr")]
#[command(about = "Record and replay raw mouse/keyboard input")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the background recorder (F9 starts a take, F10 stops it)
    Record {
        /// Directory recordings are saved into
        #[arg(long, default_value = "recordings")]
        dir: String,
    },
    /// Replay a recording
    Play {
        /// Recording file (bare names resolve against --dir)
        file: String,

        #[arg(long, default_value = "recordings")]
        dir: String,

        /// Pointer sensitivity multiplier
        #[arg(long, default_value = "1.0")]
        sens: f64,

        /// Pre-roll before the first event, seconds
        #[arg(long, default_value = "3.0")]
        delay: f64,
    },
    /// List saved recordings
    List {
        #[arg(long, default_value = "recordings")]
        dir: String,
    },
    /// Show recording info
    Show {
        file: String,

        #[arg(long, default_value = "recordings")]
        dir: String,

        /// Print every event
        #[arg(long)]
        all: bool,
    },
    /// Delete a recording
    Delete {
        file: String,

        #[arg(long, default_value = "recordings")]
        dir: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Record { dir } => record(&dir),
        Commands::Play { file, dir, sens, delay } => play(&file, &dir, sens, delay),
        Commands::List { dir } => list(&dir),
        Commands::Show { file, dir, all } => show(&file, &dir, all),
        Commands::Delete { file, dir } => delete(&file, &dir),
    }
}

fn record(dir: &str) -> Result<()> {
    let session = Arc::new(CaptureSession::new(
        RecordingStore::new(dir),
        ReservedKeys::default(),
        Arc::new(ConsoleNotifier),
    ));

    println!("Recorder running: F9 starts a take, F10 stops it, Ctrl+C exits");
    let listener = session.spawn_listener();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) && !listener.is_finished() {
        std::thread::sleep(Duration::from_millis(100));
    }

    if listener.is_finished() {
        match listener.join() {
            Ok(Err(e)) => return Err(e.into()),
            _ => anyhow::bail!("input listener exited unexpectedly"),
        }
    }

    // Close out a take left open at Ctrl+C.
    if session.stop()?.is_some() {
        println!("Open take saved on exit");
    }
    Ok(())
}

fn play(file: &str, dir: &str, sens: f64, delay: f64) -> Result<()> {
    let store = RecordingStore::new(dir);
    let path = store.resolve(file);
    let recording = RecordingStore::load(&path)?;

    println!(
        "Loaded {}: {} pointer events, {} key events, {:.2}s",
        path.display(),
        recording.metadata.pointer_count,
        recording.metadata.key_count,
        recording.total_duration
    );

    let replayer = Replayer::new(platform_port()?, Arc::new(ConsoleNotifier));
    let handle = replayer.play(
        recording,
        ReplayOptions {
            sensitivity: sens,
            start_delay: delay,
        },
    )?;

    let canceller = handle.canceller();
    ctrlc::set_handler(move || canceller.cancel())?;

    let summary = handle.wait();
    if summary.cancelled {
        println!(
            "Replay cancelled after {} of {} events",
            summary.dispatched, summary.total
        );
    } else if summary.skipped > 0 {
        println!("{} events could not be injected (see warnings)", summary.skipped);
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn platform_port() -> Result<Arc<dyn InputPort>> {
    Ok(Arc::new(gameplay_recorder::platform::SendInputPort))
}

#[cfg(not(target_os = "windows"))]
fn platform_port() -> Result<Arc<dyn InputPort>> {
    anyhow::bail!("input injection is only supported on Windows")
}

fn list(dir: &str) -> Result<()> {
    let files = RecordingStore::new(dir).list()?;
    if files.is_empty() {
        println!("No recordings in {dir}/");
    } else {
        for f in files {
            println!("{f}");
        }
    }
    Ok(())
}

fn show(file: &str, dir: &str, all: bool) -> Result<()> {
    let store = RecordingStore::new(dir);
    let recording = RecordingStore::load(store.resolve(file))?;

    println!("Created: {}", recording.created_at);
    println!("Duration: {:.2}s", recording.total_duration);
    println!("Mode: {}", recording.metadata.mode);

    let mut moves = 0;
    let mut clicks = 0;
    let mut scrolls = 0;
    for e in &recording.pointer_events {
        match e {
            PointerEvent::MoveRelative { .. } => moves += 1,
            PointerEvent::Click { .. } => clicks += 1,
            PointerEvent::Scroll { .. } => scrolls += 1,
        }
    }

    println!("\nSummary:");
    println!("  Moves: {moves}");
    println!("  Clicks: {clicks}");
    println!("  Scrolls: {scrolls}");
    println!("  Keys: {}", recording.metadata.key_count);

    if all {
        println!("\nPointer events:");
        for (i, e) in recording.pointer_events.iter().enumerate() {
            println!("{i}: {e:?}");
        }
        println!("\nKey events:");
        for (i, e) in recording.key_events.iter().enumerate() {
            println!("{i}: {e:?}");
        }
    }

    Ok(())
}

fn delete(file: &str, dir: &str) -> Result<()> {
    RecordingStore::new(dir).delete(file)?;
    println!("Deleted: {file}");
    Ok(())
}
