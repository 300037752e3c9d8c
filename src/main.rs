//! Binary entry point: wire serial acquisition, the processing pipeline,
//! the monitor thread and the scope window together.
//!
//! Usage: `ecgscope [config.json]`. Without an argument the built-in
//! defaults are used (500 Hz over /dev/ttyACM0).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ecgscope::{run_display, serial_source, telemetry, EcgConfig, EcgRuntime};

fn main() -> eframe::Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => match EcgConfig::load(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("[config] failed to load {path}: {e}; using defaults");
                EcgConfig::default()
            }
        },
        None => EcgConfig::default(),
    };
    if let Err(e) = cfg.validate() {
        eprintln!("[config] invalid configuration: {e}");
        std::process::exit(1);
    }

    // The acquisition thread opens the port itself: a failed open aborts
    // acquisition only while the pipeline and the scope sit idle.
    let open = {
        let cfg = cfg.clone();
        move || {
            let src = serial_source(&cfg)?;
            println!("[serial] listening on {}", cfg.port);
            Ok(src)
        }
    };

    let (runtime, results) = match EcgRuntime::start(&cfg, open) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("[worker] failed to start pipeline: {e}");
            std::process::exit(1);
        }
    };

    let monitor_stop = Arc::new(AtomicBool::new(false));
    let monitor = telemetry::spawn_monitor(Duration::from_secs(1), Arc::clone(&monitor_stop));

    // Blocks until the window closes.
    let ui_result = run_display(results, &cfg);

    runtime.stop();
    monitor_stop.store(true, Ordering::Relaxed);
    let _ = monitor.join();

    ui_result
}
