//! ecgscope crate root: re-exports and module wiring.
//!
//! A realtime single-lead ECG monitor. Raw ADC samples stream in over a
//! serial port, a Pan-Tompkins style pipeline detects QRS complexes and
//! derives a heart rate, and an egui/eframe scope renders the result:
//!
//! - `config`: the configuration surface (JSON persisted)
//! - `filters`: the five streaming filter stages
//! - `detector`: adaptive peak detection on the integrated signal
//! - `bpm`: beat-to-beat heart-rate estimation and smoothing
//! - `pipeline`: batch orchestration and the global sample counter
//! - `source`: sample sources (line protocol, serial transport)
//! - `runtime`: acquisition/processing threads and shutdown
//! - `telemetry`: processing-time stats and the monitor thread
//! - `display`: the scope UI (pure consumer)

pub mod bpm;
pub mod config;
pub mod detector;
pub mod display;
pub mod filters;
pub mod pipeline;
pub mod runtime;
pub mod source;
pub mod telemetry;

// Public re-exports for a compact external API
pub use config::{ConfigError, EcgConfig};
pub use detector::{Detection, PeakDetector};
pub use display::{run_display, EcgApp};
pub use filters::FilterChain;
pub use pipeline::{BatchResult, EcgPipeline};
pub use runtime::{Batch, EcgRuntime};
pub use source::{serial_source, LineSource, SampleSource};
