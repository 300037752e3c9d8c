//! egui/eframe display consumer: scope rings and the monitor window.
//!
//! Strictly a presentation layer. It drains the result channel each frame,
//! pushes the batch-aligned sequences into fixed-capacity rings sized for
//! the visible window, and draws them with `egui_plot`. Nothing here feeds
//! back into the processing pipeline.

use std::collections::VecDeque;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints, Points};

use crate::config::EcgConfig;
use crate::pipeline::BatchResult;

/// Fixed-capacity ring over the most recent `capacity` samples of one
/// trace, tagged with the global index of the next write so samples keep
/// their absolute time axis.
#[derive(Debug, Clone)]
pub struct DisplayRing {
    data: Vec<f64>,
    head: usize,
    count: usize,
    next_index: u64,
}

impl DisplayRing {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            data: vec![0.0; capacity],
            head: 0,
            count: 0,
            next_index: 0,
        }
    }

    pub fn extend(&mut self, values: &[f64]) {
        for &v in values {
            self.data[self.head] = v;
            self.head = (self.head + 1) % self.data.len();
            if self.count < self.data.len() {
                self.count += 1;
            }
        }
        self.next_index += values.len() as u64;
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
        // next_index stays: the time axis keeps running.
    }

    /// Chronological `[t, y]` points with `t` in seconds at the given
    /// sampling rate (tail then head, oldest first).
    pub fn points(&self, fs: f64) -> Vec<[f64; 2]> {
        let first = self.next_index - self.count as u64;
        let start = (self.head + self.data.len() - self.count) % self.data.len();
        (0..self.count)
            .map(|i| {
                let v = self.data[(start + i) % self.data.len()];
                [(first + i as u64) as f64 / fs, v]
            })
            .collect()
    }
}

/// Everything drawn while paused: a frozen copy of the live traces.
struct Snapshot {
    signal: Vec<[f64; 2]>,
    mwi: Vec<[f64; 2]>,
    threshold: Vec<[f64; 2]>,
    peaks: Vec<[f64; 2]>,
    bpm: u32,
}

/// The scope application.
pub struct EcgApp {
    rx: Receiver<BatchResult>,
    fs: f64,
    signal: DisplayRing,
    mwi: DisplayRing,
    threshold: DisplayRing,
    /// Recent peak markers as `[t, filtered_value]`, pruned to the window.
    peaks: VecDeque<[f64; 2]>,
    bpm: u32,
    paused: bool,
    snapshot: Option<Snapshot>,
    show_mwi: bool,
}

impl EcgApp {
    pub fn new(rx: Receiver<BatchResult>, cfg: &EcgConfig) -> Self {
        Self {
            rx,
            fs: cfg.fs as f64,
            signal: DisplayRing::new(cfg.buf_size),
            mwi: DisplayRing::new(cfg.buf_size),
            threshold: DisplayRing::new(cfg.buf_size),
            peaks: VecDeque::new(),
            bpm: 0,
            paused: false,
            snapshot: None,
            show_mwi: true,
        }
    }

    /// Ingest one batch result into the display rings.
    fn ingest(&mut self, result: &BatchResult) {
        self.signal.extend(&result.filtered);
        self.mwi.extend(&result.mwi);
        let th: Vec<f64> = result.thresholds.iter().map(|&t| t as f64).collect();
        self.threshold.extend(&th);
        for (i, &flag) in result.peaks.iter().enumerate() {
            if flag {
                let t = (result.start_index + i as u64) as f64 / self.fs;
                self.peaks.push_back([t, result.filtered[i]]);
            }
        }
        self.bpm = result.bpm;

        // Prune markers that scrolled out of the visible window.
        let window_start =
            (self.signal.next_index.saturating_sub(self.signal.count as u64)) as f64 / self.fs;
        while matches!(self.peaks.front(), Some(p) if p[0] < window_start) {
            self.peaks.pop_front();
        }
    }
}

impl eframe::App for EcgApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Always drain the channel, even while paused, so data is not lost
        // and the producer never sees a stalled consumer.
        loop {
            match self.rx.try_recv() {
                Ok(result) => self.ingest(&result),
                Err(_) => break,
            }
        }

        let shown_bpm = match (&self.paused, &self.snapshot) {
            (true, Some(s)) => s.bpm,
            _ => self.bpm,
        };

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(format!("♥ {} BPM", shown_bpm));
                ui.separator();
                if ui
                    .button(if self.paused { "Resume" } else { "Pause" })
                    .clicked()
                {
                    if self.paused {
                        self.paused = false;
                        self.snapshot = None;
                    } else {
                        self.snapshot = Some(Snapshot {
                            signal: self.signal.points(self.fs),
                            mwi: self.mwi.points(self.fs),
                            threshold: self.threshold.points(self.fs),
                            peaks: self.peaks.iter().copied().collect(),
                            bpm: self.bpm,
                        });
                        self.paused = true;
                    }
                }
                if ui.button("Clear").clicked() {
                    self.signal.clear();
                    self.mwi.clear();
                    self.threshold.clear();
                    self.peaks.clear();
                }
                ui.checkbox(&mut self.show_mwi, "MWI + threshold");
            });
        });

        let (signal, mwi, threshold, peaks) = match (&self.paused, &self.snapshot) {
            (true, Some(s)) => (
                s.signal.clone(),
                s.mwi.clone(),
                s.threshold.clone(),
                s.peaks.clone(),
            ),
            _ => (
                self.signal.points(self.fs),
                self.mwi.points(self.fs),
                self.threshold.points(self.fs),
                self.peaks.iter().copied().collect(),
            ),
        };

        egui::CentralPanel::default().show(ctx, |ui| {
            let avail = ui.available_height();
            let signal_height = if self.show_mwi { avail * 0.6 } else { avail };

            let signal_points: PlotPoints = signal.into();
            let signal_line = Line::new("ECG", signal_points).color(Color32::LIGHT_GREEN);
            Plot::new("ecg_plot")
                .legend(Legend::default())
                .allow_scroll(false)
                .height(signal_height)
                .x_axis_label("s")
                .show(ui, |plot_ui| {
                    plot_ui.line(signal_line);
                    if !peaks.is_empty() {
                        plot_ui.points(
                            Points::new("beats", peaks)
                                .radius(4.0)
                                .color(Color32::YELLOW),
                        );
                    }
                });

            if self.show_mwi {
                let mwi_points: PlotPoints = mwi.into();
                let th_points: PlotPoints = threshold.into();
                Plot::new("mwi_plot")
                    .legend(Legend::default())
                    .allow_scroll(false)
                    .x_axis_label("s")
                    .show(ui, |plot_ui| {
                        plot_ui.line(Line::new("MWI", mwi_points).color(Color32::LIGHT_BLUE));
                        plot_ui.line(Line::new("threshold", th_points).color(Color32::ORANGE));
                    });
            }
        });

        // Keep repainting so the scope feels real-time.
        ctx.request_repaint_after(Duration::from_millis(16));
    }
}

/// Launch the scope window. Blocks until the window is closed.
pub fn run_display(rx: Receiver<BatchResult>, cfg: &EcgConfig) -> eframe::Result<()> {
    let app = EcgApp::new(rx, cfg);
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = egui::ViewportBuilder::default().with_inner_size([1200.0, 700.0]);
    eframe::run_native(
        "ECG Scope",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_view_is_chronological_after_wrap() {
        let mut ring = DisplayRing::new(4);
        ring.extend(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let points = ring.points(1.0);
        let ys: Vec<f64> = points.iter().map(|p| p[1]).collect();
        assert_eq!(ys, vec![3.0, 4.0, 5.0, 6.0]);
        // Absolute time axis survives the wrap.
        assert_eq!(points[0][0], 2.0);
        assert_eq!(points[3][0], 5.0);
    }

    #[test]
    fn ring_partial_fill_returns_only_written() {
        let mut ring = DisplayRing::new(8);
        ring.extend(&[7.0, 8.0]);
        assert_eq!(ring.points(1.0).len(), 2);
    }

    #[test]
    fn ring_bulk_larger_than_capacity_keeps_tail() {
        let mut ring = DisplayRing::new(3);
        ring.extend(&(0..10).map(f64::from).collect::<Vec<_>>());
        let ys: Vec<f64> = ring.points(1.0).iter().map(|p| p[1]).collect();
        assert_eq!(ys, vec![7.0, 8.0, 9.0]);
    }
}
