//! Acquisition and processing threads, wired with mpsc channels.
//!
//! Two dedicated threads plus whatever consumes the result channel:
//!
//! ```text
//! SampleSource -> [acquisition] --Batch--> [processing] --BatchResult--> consumer
//! ```
//!
//! Batches are immutable once queued. The [`EcgPipeline`] is moved into
//! the processing thread, so only that thread can ever advance filter
//! state. Both threads poll a shared stop flag; [`EcgRuntime::stop`] sets
//! it and joins them. The result channel is unbounded: a consumer that
//! stalls forever makes it grow without bound, which is the consumer's
//! problem, not the pipeline's.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::{ConfigError, EcgConfig};
use crate::pipeline::{BatchResult, EcgPipeline};
use crate::source::SampleSource;

/// How long a blocking receive waits before re-checking the stop flag.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// A fixed-size run of consecutive samples; the unit of transfer between
/// the acquisition and processing threads.
pub type Batch = Vec<f64>;

/// Handle to the two running threads.
pub struct EcgRuntime {
    stop: Arc<AtomicBool>,
    acquisition: Option<JoinHandle<()>>,
    processing: Option<JoinHandle<()>>,
}

impl EcgRuntime {
    /// Spawn acquisition and processing threads. Returns the runtime
    /// handle and the receiver the consumer drains.
    ///
    /// The transport is opened by the acquisition thread itself: an open
    /// failure takes down only that thread while processing and the
    /// consumer keep running idle. Pipeline construction however happens
    /// up front, so a degenerate config fails here, not inside a thread.
    pub fn start<S: SampleSource + 'static>(
        cfg: &EcgConfig,
        open_source: impl FnOnce() -> std::io::Result<S> + Send + 'static,
    ) -> Result<(Self, Receiver<BatchResult>), ConfigError> {
        let pipeline = EcgPipeline::new(cfg)?;
        let stop = Arc::new(AtomicBool::new(false));
        let (raw_tx, raw_rx) = mpsc::channel::<Batch>();
        let (out_tx, out_rx) = mpsc::channel::<BatchResult>();

        let acquisition = {
            let stop = Arc::clone(&stop);
            let batch_size = cfg.batch_size;
            std::thread::spawn(move || {
                let source = match open_source() {
                    Ok(src) => src,
                    Err(e) => {
                        eprintln!("[acquisition] failed to open transport: {e}");
                        return;
                    }
                };
                acquisition_loop(source, batch_size, raw_tx, stop)
            })
        };
        let processing = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || processing_loop(pipeline, raw_rx, out_tx, stop))
        };

        Ok((
            Self {
                stop,
                acquisition: Some(acquisition),
                processing: Some(processing),
            },
            out_rx,
        ))
    }

    /// Signal both threads to stop and wait for them to return.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.acquisition.take() {
            let _ = h.join();
        }
        if let Some(h) = self.processing.take() {
            let _ = h.join();
        }
    }
}

impl Drop for EcgRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Accumulate samples into full batches and queue them. A partial batch at
/// shutdown is discarded: a stale partial window has no display value.
fn acquisition_loop(
    mut source: impl SampleSource,
    batch_size: usize,
    raw_tx: Sender<Batch>,
    stop: Arc<AtomicBool>,
) {
    let mut batch: Batch = Vec::with_capacity(batch_size);
    while !stop.load(Ordering::Relaxed) {
        match source.next_sample() {
            Ok(Some(sample)) => {
                batch.push(sample);
                if batch.len() >= batch_size {
                    let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                    // Receiver gone means the runtime is shutting down.
                    if raw_tx.send(full).is_err() {
                        return;
                    }
                }
            }
            Ok(None) => continue,
            Err(e) => {
                eprintln!("[acquisition] transport lost: {e}");
                return;
            }
        }
    }
}

/// Pull one batch at a time and run it through the pipeline. Strictly
/// sequential: filter state from one batch must be fully advanced before
/// the next begins.
///
/// Only the stop flag ends this loop. A dead acquisition thread (failed
/// open, lost transport) closes the batch channel, but the processing
/// thread keeps idling so the rest of the system stays up.
fn processing_loop(
    mut pipeline: EcgPipeline,
    raw_rx: Receiver<Batch>,
    out_tx: Sender<BatchResult>,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        match raw_rx.recv_timeout(POLL_TIMEOUT) {
            Ok(batch) => {
                let result = pipeline.process(&batch);
                // A closed consumer just means nobody is watching anymore.
                let _ = out_tx.send(result);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                // recv_timeout returns immediately on a closed channel;
                // sleep out the poll interval to avoid spinning.
                std::thread::sleep(POLL_TIMEOUT);
            }
        }
    }
}
