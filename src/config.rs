//! Configuration surface for the ECG monitor.
//!
//! All knobs of the acquisition transport, the filter chain, the peak
//! detector and the display live here. Configurations round-trip through
//! JSON files so a tuned setup can be reused across runs.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Full configuration of the monitor.
///
/// `Default` matches a single-lead sensor streaming 500 Hz samples over a
/// USB serial adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgConfig {
    // ---------- Acquisition transport ----------
    /// Serial port the sensor is attached to.
    pub port: String,
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Serial read timeout in milliseconds. Short enough that the
    /// acquisition thread can notice a stop request between reads.
    pub read_timeout_ms: u64,
    /// Samples accumulated before a batch is handed to the processing
    /// thread. Smaller batches lower display latency, larger batches lower
    /// per-batch dispatch overhead; the latency is `batch_size / fs`.
    pub batch_size: usize,

    // ---------- Signal ----------
    /// Sampling frequency in Hz.
    pub fs: u32,

    // ---------- Filter chain ----------
    /// Highpass cutoff in Hz for baseline-wander removal. `0.0` disables
    /// the stage (unity pass-through).
    pub hp_fc: f64,
    /// Moving-average lowpass window length in samples.
    pub ma_len: usize,
    /// Derivative history length in samples (at least 5).
    pub deriv_len: usize,
    /// Moving-window-integration window length in samples.
    pub mwi_len: usize,

    // ---------- Peak detection ----------
    /// Minimum interval between two accepted peaks, in milliseconds.
    pub interval_ms: u32,
    /// Threshold decay time constant in seconds.
    pub tau: f64,
    /// Floor the adaptive threshold never decays below.
    pub min_threshold: i64,
    /// Threshold the detector starts from before the first peak.
    pub initial_threshold: i64,

    // ---------- Display ----------
    /// Capacity of the display ring buffers, in samples.
    pub buf_size: usize,
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".into(),
            baud_rate: 115_200,
            read_timeout_ms: 100,
            batch_size: 10,
            fs: 500,
            hp_fc: 2.0,
            ma_len: 8,
            deriv_len: 8,
            mwi_len: 40,
            interval_ms: 200,
            tau: 1.30,
            min_threshold: 1000,
            initial_threshold: 2000,
            buf_size: 2000,
        }
    }
}

/// Rejected configuration. The pipeline refuses to start rather than run
/// with undefined circular-buffer sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `fs` must be positive.
    ZeroSamplingFrequency,
    /// A window length that sizes a circular buffer was zero.
    ZeroWindow(&'static str),
    /// The derivative stencil needs at least 5 samples of history.
    DerivativeTooShort(usize),
    /// `batch_size` must be positive.
    ZeroBatchSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroSamplingFrequency => {
                write!(f, "sampling frequency must be positive")
            }
            ConfigError::ZeroWindow(name) => {
                write!(f, "window length `{name}` must be positive")
            }
            ConfigError::DerivativeTooShort(n) => {
                write!(f, "derivative buffer needs at least 5 samples, got {n}")
            }
            ConfigError::ZeroBatchSize => write!(f, "batch size must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl EcgConfig {
    /// Validate everything that sizes internal state. Called by the
    /// pipeline constructor; a failure here is fatal by design.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fs == 0 {
            return Err(ConfigError::ZeroSamplingFrequency);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.ma_len == 0 {
            return Err(ConfigError::ZeroWindow("ma_len"));
        }
        if self.mwi_len == 0 {
            return Err(ConfigError::ZeroWindow("mwi_len"));
        }
        if self.buf_size == 0 {
            return Err(ConfigError::ZeroWindow("buf_size"));
        }
        if self.deriv_len < 5 {
            return Err(ConfigError::DerivativeTooShort(self.deriv_len));
        }
        Ok(())
    }

    /// Highpass pole coefficient `a = tau / (tau + dt)` derived from the
    /// configured cutoff, or `1.0` when the stage is disabled (`hp_fc == 0`).
    pub fn highpass_alpha(&self) -> f64 {
        if self.hp_fc > 0.0 {
            let dt = 1.0 / self.fs as f64;
            let tau = 1.0 / (2.0 * std::f64::consts::PI * self.hp_fc);
            tau / (tau + dt)
        } else {
            1.0
        }
    }

    /// Per-sample threshold decay factor `exp(-1 / (fs * tau))`.
    pub fn threshold_decay(&self) -> f64 {
        (-1.0 / (self.fs as f64 * self.tau)).exp()
    }

    /// Refractory window in samples.
    pub fn refractory_samples(&self) -> u64 {
        (self.interval_ms as u64 * self.fs as u64) / 1000
    }

    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(std::io::Error::other)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}
