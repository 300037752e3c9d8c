//! Beats-per-minute estimation from the per-batch peak flags.
//!
//! Inter-peak distances are carried across batch boundaries, converted to
//! instantaneous BPM, gated to the physiological range, and smoothed over a
//! short history. The reported value persists until the next accepted
//! measurement.

use std::collections::VecDeque;

/// Accepted instantaneous values kept for smoothing.
const HISTORY_LEN: usize = 5;
/// Physiological bounds: values at or outside are rejected outright.
const MIN_BPM: f64 = 40.0;
const MAX_BPM: f64 = 220.0;

#[derive(Debug, Clone)]
pub struct BpmEstimator {
    fs: u32,
    /// Samples elapsed since the last peak, carried across batches.
    dist: u64,
    history: VecDeque<f64>,
    bpm: u32,
}

impl BpmEstimator {
    pub fn new(fs: u32) -> Self {
        Self {
            fs,
            dist: 0,
            history: VecDeque::with_capacity(HISTORY_LEN),
            bpm: 0,
        }
    }

    /// Fold one batch worth of peak flags into the estimate and return the
    /// smoothed BPM (0 until the first accepted beat).
    pub fn update(&mut self, peaks: &[bool]) -> u32 {
        let batch_len = peaks.len() as u64;
        let mut cursor = 0u64;
        let mut any = false;

        for (idx, &flag) in peaks.iter().enumerate() {
            if !flag {
                continue;
            }
            any = true;
            let idx = idx as u64;
            let gap = self.dist + (idx - cursor) + 1;
            self.dist = 0;
            cursor = idx + 1;

            // Debounce floor: closer than 0.2 s is not a plausible beat.
            if gap <= (self.fs as f64 * 0.2) as u64 {
                continue;
            }
            let instant = (60.0 * self.fs as f64) / gap as f64;
            if instant > MIN_BPM && instant < MAX_BPM {
                if self.history.len() == HISTORY_LEN {
                    self.history.pop_front();
                }
                self.history.push_back(instant);
                let sum: f64 = self.history.iter().sum();
                self.bpm = (sum / self.history.len() as f64) as u32;
            }
        }

        if any {
            self.dist += batch_len - cursor;
        } else {
            self.dist += batch_len;
        }
        self.bpm
    }

    /// Last reported BPM.
    pub fn bpm(&self) -> u32 {
        self.bpm
    }
}
