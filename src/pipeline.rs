//! Batch pipeline orchestrator.
//!
//! [`EcgPipeline`] owns every piece of streaming state (filter chain, peak
//! detector, BPM history, global sample counter) and advances all of it in
//! strict sample order, exactly once per sample. The instance is moved into
//! the processing thread and never escapes it; that ownership transfer is
//! what enforces the single-writer requirement, not a lock.

use crate::bpm::BpmEstimator;
use crate::config::{ConfigError, EcgConfig};
use crate::detector::PeakDetector;
use crate::filters::FilterChain;
use crate::telemetry::ProcTimer;

/// Output of one processed batch, batch-length-aligned and chronologically
/// ordered. This is the unit handed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Band-limited signal (highpass + lowpass), what a scope draws.
    pub filtered: Vec<f64>,
    /// Moving-window-integrated QRS energy.
    pub mwi: Vec<f64>,
    /// Peak flag per sample.
    pub peaks: Vec<bool>,
    /// Adaptive threshold per sample.
    pub thresholds: Vec<i64>,
    /// Smoothed heart rate after this batch; persists between accepted
    /// beats, 0 before the first.
    pub bpm: u32,
    /// Global index of the first sample in this batch.
    pub start_index: u64,
}

pub struct EcgPipeline {
    chain: FilterChain,
    detector: PeakDetector,
    bpm: BpmEstimator,
    /// Monotone since pipeline start; never reset while the process runs.
    sample_index: u64,
    timer: ProcTimer,
}

impl EcgPipeline {
    /// Build the pipeline from a validated configuration. Fails rather
    /// than sizing any circular buffer from a degenerate config.
    pub fn new(cfg: &EcgConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            chain: FilterChain::new(cfg.highpass_alpha(), cfg.ma_len, cfg.deriv_len, cfg.mwi_len),
            detector: PeakDetector::new(
                cfg.initial_threshold,
                cfg.min_threshold,
                cfg.refractory_samples(),
                cfg.threshold_decay(),
            ),
            bpm: BpmEstimator::new(cfg.fs),
            sample_index: 0,
            timer: ProcTimer::new(cfg.batch_size),
        })
    }

    /// Drive one batch through filter chain and detector in arrival order,
    /// then fold the peak flags into the BPM estimate.
    pub fn process(&mut self, batch: &[f64]) -> BatchResult {
        let chain = &mut self.chain;
        let detector = &mut self.detector;
        let bpm = &mut self.bpm;
        let start_index = self.sample_index;
        let mut cursor = self.sample_index;

        let result = self.timer.measure(|| {
            let n = batch.len();
            let mut filtered = Vec::with_capacity(n);
            let mut mwi = Vec::with_capacity(n);
            let mut peaks = Vec::with_capacity(n);
            let mut thresholds = Vec::with_capacity(n);

            for &raw in batch {
                let out = chain.step(raw, cursor);
                let det = detector.step(out.mwi, cursor);
                filtered.push(out.filtered);
                mwi.push(out.mwi);
                peaks.push(det.peak);
                thresholds.push(det.threshold);
                cursor += 1;
            }

            let bpm = bpm.update(&peaks);
            BatchResult {
                filtered,
                mwi,
                peaks,
                thresholds,
                bpm,
                start_index,
            }
        });

        self.sample_index = cursor;
        result
    }

    /// Samples processed since pipeline start.
    pub fn samples_processed(&self) -> u64 {
        self.sample_index
    }
}
