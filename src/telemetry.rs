//! Process-wide processing-time telemetry and the periodic monitor thread.
//!
//! The pipeline publishes how long its most recent measurement window took
//! (wall clock, aggregated over roughly 100 samples); a monitor thread
//! samples that cell once a second and prints a dashboard line. Diagnostic
//! only: nothing here feeds back into processing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Local;
use once_cell::sync::Lazy;

/// Shared cell the pipeline writes and the monitor reads.
pub struct ProcStats {
    /// Nanoseconds spent processing over the last published window.
    window_nanos: AtomicU64,
    published: AtomicBool,
}

/// The single process-wide stats cell.
pub static PROC_STATS: Lazy<ProcStats> = Lazy::new(|| ProcStats {
    window_nanos: AtomicU64::new(0),
    published: AtomicBool::new(false),
});

impl ProcStats {
    pub fn publish(&self, elapsed: Duration) {
        self.window_nanos
            .store(elapsed.as_nanos() as u64, Ordering::Relaxed);
        self.published.store(true, Ordering::Relaxed);
    }

    /// Last published window, or `None` before the first publication.
    pub fn last_window(&self) -> Option<Duration> {
        if self.published.load(Ordering::Relaxed) {
            Some(Duration::from_nanos(
                self.window_nanos.load(Ordering::Relaxed),
            ))
        } else {
            None
        }
    }
}

/// Accumulates per-batch processing times and publishes the total every
/// ~100 samples. Owned by the pipeline; one instance per pipeline.
#[derive(Debug)]
pub struct ProcTimer {
    batches_per_window: u32,
    count: u32,
    elapsed: Duration,
}

impl ProcTimer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batches_per_window: (100 / batch_size.max(1)).max(1) as u32,
            count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Time one batch invocation and fold it into the current window.
    pub fn measure<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.elapsed += start.elapsed();
        self.count += 1;
        if self.count >= self.batches_per_window {
            PROC_STATS.publish(self.elapsed);
            self.count = 0;
            self.elapsed = Duration::ZERO;
        }
        out
    }
}

/// Spawn the dashboard printer. Returns the handle; the thread exits once
/// `stop` is set.
pub fn spawn_monitor(interval: Duration, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        println!("[monitor] dashboard active");
        println!("{:<10} | {:<20}", "Time", "Proc time (100 pts)");
        while !stop.load(Ordering::Relaxed) {
            let now = Local::now().format("%H:%M:%S");
            match PROC_STATS.last_window() {
                Some(d) => println!("{:<10} | {:<20}", now, format!("{:.3} ms", d.as_secs_f64() * 1e3)),
                None => println!("{:<10} | {:<20}", now, "waiting..."),
            }
            std::thread::sleep(interval);
        }
    })
}
