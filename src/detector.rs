//! Adaptive QRS peak detector.
//!
//! Works on the moving-window-integrated signal: a peak is the local
//! maximum where the slope crosses from positive to non-positive while the
//! previous MWI value exceeded the adaptive threshold. The threshold
//! rebaselines to 40% of each accepted peak and decays exponentially toward
//! a floor between peaks; a refractory window suppresses double-counting a
//! single QRS complex.

/// Per-sample detector verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    /// A peak was declared at the previous sample index.
    pub peak: bool,
    /// Threshold value after this sample's decay step.
    pub threshold: i64,
}

/// Slope-sign state machine with refractory enforcement and decaying
/// integer threshold.
#[derive(Debug, Clone)]
pub struct PeakDetector {
    prev_mwi: f64,
    prev_slope: f64,
    threshold: i64,
    last_peak_index: u64,
    refractory_samples: u64,
    decay: f64,
    min_threshold: i64,
}

impl PeakDetector {
    /// `refractory_samples` = `interval_ms * fs / 1000`; `decay` =
    /// `exp(-1 / (fs * tau))`. Both are precomputed by the caller so the
    /// per-sample path stays arithmetic-only.
    pub fn new(
        initial_threshold: i64,
        min_threshold: i64,
        refractory_samples: u64,
        decay: f64,
    ) -> Self {
        Self {
            prev_mwi: 0.0,
            prev_slope: 0.0,
            threshold: initial_threshold,
            last_peak_index: 0,
            refractory_samples,
            decay,
            min_threshold,
        }
    }

    /// Advance the detector by one MWI sample at global index
    /// `sample_index`.
    pub fn step(&mut self, mwi: f64, sample_index: u64) -> Detection {
        let slope = mwi - self.prev_mwi;

        let mut peak = false;
        if sample_index.saturating_sub(self.last_peak_index) > self.refractory_samples
            && self.prev_slope > 0.0
            && slope <= 0.0
            && self.prev_mwi > self.threshold as f64
        {
            // The maximum was the previous sample; rebaseline there.
            peak = true;
            self.last_peak_index = sample_index - 1;
            self.threshold = (self.prev_mwi * 0.4) as i64;
        }

        // Decay every sample, peak or not, clamped to the floor.
        self.threshold = ((self.threshold as f64 * self.decay) as i64).max(self.min_threshold);

        self.prev_mwi = mwi;
        self.prev_slope = slope;

        Detection {
            peak,
            threshold: self.threshold,
        }
    }

    /// Current adaptive threshold (after the most recent decay step).
    pub fn threshold(&self) -> i64 {
        self.threshold
    }
}
