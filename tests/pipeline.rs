//! End-to-end properties of the processing pipeline, exercised through the
//! public API only.

use ecgscope::bpm::BpmEstimator;
use ecgscope::detector::PeakDetector;
use ecgscope::filters::Highpass;
use ecgscope::{EcgConfig, EcgPipeline};

/// Deterministic pseudo-random sample stream (LCG) so the continuity test
/// stresses every stage with irregular data.
fn noise(len: usize) -> Vec<f64> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) % 4096) as f64 - 2048.0
        })
        .collect()
}

/// A raw signal with a triangular pulse of the given amplitude and width
/// at each listed offset, zero elsewhere.
fn pulse_train(len: usize, offsets: &[usize], width: usize, amplitude: f64) -> Vec<f64> {
    let mut signal = vec![0.0; len];
    for &at in offsets {
        for i in 0..width {
            let half = width as f64 / 2.0;
            let x = i as f64;
            let v = if x < half { x / half } else { (width as f64 - x) / half };
            if at + i < len {
                signal[at + i] = v * amplitude;
            }
        }
    }
    signal
}

fn run_batched(cfg: &EcgConfig, signal: &[f64], batch: usize) -> (Vec<f64>, Vec<f64>, Vec<bool>, Vec<i64>, u32) {
    let mut pipe = EcgPipeline::new(cfg).expect("config must be valid");
    let mut filtered = Vec::new();
    let mut mwi = Vec::new();
    let mut peaks = Vec::new();
    let mut thresholds = Vec::new();
    let mut bpm = 0;
    for chunk in signal.chunks(batch) {
        let out = pipe.process(chunk);
        filtered.extend(out.filtered);
        mwi.extend(out.mwi);
        peaks.extend(out.peaks);
        thresholds.extend(out.thresholds);
        bpm = out.bpm;
    }
    (filtered, mwi, peaks, thresholds, bpm)
}

#[test]
fn batch_boundaries_do_not_change_output() {
    let cfg = EcgConfig::default();
    let signal = noise(3000);

    let whole = run_batched(&cfg, &signal, signal.len());
    for batch in [1usize, 7, 10, 250] {
        let split = run_batched(&cfg, &signal, batch);
        assert_eq!(
            whole.0, split.0,
            "filtered output must be bit-identical at batch size {batch}"
        );
        assert_eq!(
            whole.1, split.1,
            "MWI output must be bit-identical at batch size {batch}"
        );
        assert_eq!(whole.2, split.2, "peak flags must match at batch size {batch}");
        assert_eq!(whole.3, split.3, "thresholds must match at batch size {batch}");
    }
}

#[test]
fn warm_up_suppresses_the_first_four_samples() {
    // With no derivative history the squared derivative is zero, so the
    // integrated output of the first 4 samples is exactly zero no matter
    // how violent the input is.
    let cfg = EcgConfig::default();
    let (_, mwi, _, _, _) = run_batched(&cfg, &noise(16), 16);
    assert_eq!(&mwi[..4], &[0.0; 4]);
}

#[test]
fn threshold_decays_to_the_floor_and_holds() {
    let cfg = EcgConfig::default();
    let quiet = vec![0.0; 30_000];
    let (_, _, _, thresholds, _) = run_batched(&cfg, &quiet, 100);
    assert_eq!(
        *thresholds.last().unwrap(),
        cfg.min_threshold,
        "threshold must converge to the configured floor"
    );
    for &th in &thresholds {
        assert!(th >= cfg.min_threshold, "threshold must never undercut the floor");
    }
}

#[test]
fn accepted_peaks_respect_the_refractory_window() {
    let cfg = EcgConfig::default();
    let refractory = (cfg.interval_ms as u64 * cfg.fs as u64) / 1000;

    // Pulses 30 samples apart, far inside the 100-sample refractory window.
    let offsets: Vec<usize> = (0..40).map(|i| 300 + i * 30).collect();
    let signal = pulse_train(2000, &offsets, 20, 2000.0);
    let (_, _, peaks, _, _) = run_batched(&cfg, &signal, 10);

    let accepted: Vec<usize> = peaks
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| p.then_some(i))
        .collect();
    assert!(!accepted.is_empty(), "the pulse train must trigger detections");
    for pair in accepted.windows(2) {
        assert!(
            (pair[1] - pair[0]) as u64 > refractory,
            "peaks at {} and {} violate the refractory window",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn regular_beats_converge_to_sixty_bpm() {
    // One beat per second at fs=500: instantaneous BPM 60 for every
    // beat-to-beat gap; once the smoothing history holds only such gaps
    // the reported value is exactly 60.
    let cfg = EcgConfig::default();
    let offsets: Vec<usize> = (0..10).map(|i| 300 + i * 500).collect();
    let signal = pulse_train(5500, &offsets, 20, 2000.0);
    let (_, _, peaks, _, bpm) = run_batched(&cfg, &signal, 10);

    let accepted: Vec<usize> = peaks
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| p.then_some(i))
        .collect();
    assert_eq!(accepted.len(), 10, "every beat must be detected exactly once");
    // The detector reaches a stationary threshold cycle after the first
    // beat; from then on identical pulses detect at a fixed offset.
    for pair in accepted[1..].windows(2) {
        assert_eq!(pair[1] - pair[0], 500, "identical pulses must detect at a fixed offset");
    }
    assert_eq!(bpm, 60, "smoothing history holds five 1 s gaps");
}

#[test]
fn one_second_gaps_are_sixty_instantaneous() {
    let mut est = BpmEstimator::new(500);
    let mut flags = vec![false; 1000];
    flags[499] = true;
    flags[999] = true;
    let bpm = est.update(&flags);
    assert_eq!(bpm, 60, "a 500-sample gap at 500 Hz is 60 BPM");
}

#[test]
fn dc_input_passes_a_disabled_highpass_unchanged() {
    let cfg = EcgConfig {
        fs: 500,
        hp_fc: 0.0,
        ..EcgConfig::default()
    };
    assert_eq!(cfg.highpass_alpha(), 1.0);
    let mut hp = Highpass::new(cfg.highpass_alpha());
    for _ in 0..100 {
        assert_eq!(hp.step(1000.0), 1000.0);
    }
}

#[test]
fn triangular_mwi_pulse_yields_one_peak_and_rebaselines() {
    let cfg = EcgConfig::default();
    let decay = cfg.threshold_decay();
    let mut det = PeakDetector::new(
        cfg.initial_threshold,
        cfg.min_threshold,
        cfg.refractory_samples(),
        cfg.threshold_decay(),
    );

    // Isolated triangle rising to 5000, clearly over the initial 2000.
    let mwi: Vec<f64> = (0..21)
        .map(|i| if i <= 10 { i as f64 * 500.0 } else { (20 - i) as f64 * 500.0 })
        .collect();

    let mut fired = Vec::new();
    for (i, &v) in mwi.iter().enumerate() {
        let d = det.step(v, 200 + i as u64);
        if d.peak {
            fired.push((i, d.threshold));
        }
    }
    assert_eq!(fired.len(), 1, "one pulse, one peak");
    let (at, th) = fired[0];
    assert_eq!(at, 11, "the peak is declared at the sample after the apex");
    // Rebaseline to 0.4 x 5000 = 2000, then the same-sample decay step.
    assert_eq!(th, (((5000.0 * 0.4) as i64) as f64 * decay) as i64);
}

#[test]
fn bpm_history_only_holds_physiological_values() {
    // Gaps of 100 samples (300 BPM) and 12000 samples (2.5 BPM) must both
    // leave the estimate untouched.
    let mut est = BpmEstimator::new(500);
    let mut flags = vec![false; 12_200];
    flags[99] = true;
    flags[199] = true; // 100-sample gap -> over the 220 BPM bound
    flags[12_199] = true; // 12000-sample gap -> under the 40 BPM bound
    assert_eq!(est.update(&flags), 0);
}
