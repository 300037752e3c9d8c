//! The five streaming filter stages of the Pan-Tompkins front end.
//!
//! Each stage owns its numeric state and is advanced one sample at a time
//! through `step`. State carries over between calls, so feeding the same
//! sample sequence in one batch or in many produces identical output; the
//! batching is purely a transport concern.
//!
//! Stage order (fixed): highpass -> moving-average lowpass -> derivative ->
//! squaring -> moving-window integration. [`FilterChain`] composes them.

/// Single-pole IIR highpass for baseline-wander removal.
///
/// `y[n] = a * (y[n-1] + x[n] - x[n-1])`. With `a == 1.0` and zeroed
/// state the recurrence telescopes to `y[n] = x[n]`: the raw signal
/// passes through unchanged (disabled mode).
#[derive(Debug, Clone)]
pub struct Highpass {
    alpha: f64,
    y_prev: f64,
    x_prev: f64,
}

impl Highpass {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            y_prev: 0.0,
            x_prev: 0.0,
        }
    }

    pub fn step(&mut self, x: f64) -> f64 {
        let y = self.alpha * (self.y_prev + x - self.x_prev);
        self.y_prev = y;
        self.x_prev = x;
        y
    }
}

/// Box lowpass over the last `len` samples, maintained as a running sum so
/// each step is O(1): `S[n] = S[n-1] + x[n] - x[n-len]`.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buf: Vec<f64>,
    idx: usize,
    sum: f64,
}

impl MovingAverage {
    /// `len` must be positive; callers validate via `EcgConfig::validate`.
    pub fn new(len: usize) -> Self {
        debug_assert!(len > 0);
        Self {
            buf: vec![0.0; len],
            idx: 0,
            sum: 0.0,
        }
    }

    pub fn step(&mut self, x: f64) -> f64 {
        self.sum += x - self.buf[self.idx];
        let y = self.sum / self.buf.len() as f64;
        self.buf[self.idx] = x;
        self.idx = (self.idx + 1) % self.buf.len();
        y
    }
}

/// 5-tap derivative stencil `d[n] = 2x[n] + x[n-1] - x[n-3] - 2x[n-4]`
/// over a ring of recent inputs.
///
/// Until 4 samples of history exist the stencil is undefined, so the first
/// 4 outputs since pipeline start are exactly 0.
#[derive(Debug, Clone)]
pub struct Derivative {
    buf: Vec<f64>,
    idx: usize,
}

impl Derivative {
    /// `len` must be at least 5 to cover the stencil reach.
    pub fn new(len: usize) -> Self {
        debug_assert!(len >= 5);
        Self {
            buf: vec![0.0; len],
            idx: 0,
        }
    }

    /// `sample_index` is the global sample counter since pipeline start.
    pub fn step(&mut self, x: f64, sample_index: u64) -> f64 {
        let n = self.buf.len();
        if sample_index < 4 {
            // Warm-up: still record history so later taps see real data.
            self.buf[self.idx] = x;
            self.idx = (self.idx + 1) % n;
            return 0.0;
        }
        let idx = self.idx;
        self.buf[idx] = x;

        let x0 = self.buf[idx];
        let x1 = self.buf[(idx + n - 1) % n];
        let x3 = self.buf[(idx + n - 3) % n];
        let x4 = self.buf[(idx + n - 4) % n];

        self.idx = (idx + 1) % n;
        2.0 * x0 + x1 - x3 - 2.0 * x4
    }
}

/// Moving-window integration over the squared derivative.
///
/// Running-sum box filter like [`MovingAverage`], but the sum is clamped to
/// >= 0 before dividing (float round-off can drag it slightly negative) and
/// the output is truncated to an integer value, matching the integer
/// threshold arithmetic downstream.
#[derive(Debug, Clone)]
pub struct Mwi {
    buf: Vec<f64>,
    idx: usize,
    sum: f64,
}

impl Mwi {
    pub fn new(len: usize) -> Self {
        debug_assert!(len > 0);
        Self {
            buf: vec![0.0; len],
            idx: 0,
            sum: 0.0,
        }
    }

    pub fn step(&mut self, x: f64) -> f64 {
        self.sum += x - self.buf[self.idx];
        self.buf[self.idx] = x;
        self.sum = self.sum.max(0.0);
        let y = (self.sum / self.buf.len() as f64).trunc();
        self.idx = (self.idx + 1) % self.buf.len();
        y
    }
}

/// The composed five-stage chain. Squaring is stateless and inlined.
#[derive(Debug, Clone)]
pub struct FilterChain {
    highpass: Highpass,
    lowpass: MovingAverage,
    derivative: Derivative,
    mwi: Mwi,
}

/// Output of one chain step: the band-limited signal (what the scope draws)
/// and the integrated QRS energy (what the detector thresholds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainOutput {
    pub filtered: f64,
    pub mwi: f64,
}

impl FilterChain {
    pub fn new(alpha: f64, ma_len: usize, deriv_len: usize, mwi_len: usize) -> Self {
        Self {
            highpass: Highpass::new(alpha),
            lowpass: MovingAverage::new(ma_len),
            derivative: Derivative::new(deriv_len),
            mwi: Mwi::new(mwi_len),
        }
    }

    /// Advance every stage by one raw sample, in order.
    pub fn step(&mut self, raw: f64, sample_index: u64) -> ChainOutput {
        let hp = self.highpass.step(raw);
        let lp = self.lowpass.step(hp);
        let d = self.derivative.step(lp, sample_index);
        let sq = d * d;
        let mwi = self.mwi.step(sq);
        ChainOutput { filtered: lp, mwi }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_highpass_passes_dc_exactly() {
        // alpha = 1 with zeroed state telescopes to y[n] = x[n], so a
        // constant input must come out unchanged.
        let mut hp = Highpass::new(1.0);
        for _ in 0..100 {
            assert_eq!(hp.step(1000.0), 1000.0);
        }
    }

    #[test]
    fn highpass_rejects_dc() {
        let mut hp = Highpass::new(0.95);
        let mut y = 0.0;
        for _ in 0..10_000 {
            y = hp.step(500.0);
        }
        assert!(y.abs() < 1e-6, "DC must decay to zero, got {y}");
    }

    #[test]
    fn moving_average_matches_window_mean() {
        let mut ma = MovingAverage::new(4);
        let input = [4.0, 8.0, 12.0, 16.0, 20.0];
        let mut last = 0.0;
        for &x in &input {
            last = ma.step(x);
        }
        // Window now holds [8, 12, 16, 20].
        assert_eq!(last, 14.0);
    }

    #[test]
    fn derivative_warm_up_is_zero() {
        let mut d = Derivative::new(8);
        for i in 0..4u64 {
            assert_eq!(d.step(123.0 + i as f64, i), 0.0);
        }
        assert_ne!(d.step(999.0, 4), 0.0);
    }

    #[test]
    fn derivative_of_ramp_is_constant() {
        // For x[n] = n: 2n + (n-1) - (n-3) - 2(n-4) = 10.
        let mut d = Derivative::new(8);
        let mut out = Vec::new();
        for n in 0..20u64 {
            out.push(d.step(n as f64, n));
        }
        for &v in &out[8..] {
            assert_eq!(v, 10.0);
        }
    }

    #[test]
    fn mwi_clamps_negative_round_off() {
        let mut mwi = Mwi::new(4);
        mwi.sum = -1e-9; // simulated float drift
        let y = mwi.step(0.0);
        assert!(y >= 0.0);
        assert!(mwi.sum >= 0.0);
    }

    #[test]
    fn mwi_truncates_to_integer_values() {
        let mut mwi = Mwi::new(4);
        let y = mwi.step(10.0); // sum 10 over window 4 = 2.5
        assert_eq!(y, 2.0);
    }
}
