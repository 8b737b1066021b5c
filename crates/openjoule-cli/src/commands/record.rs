//! Record energy metrics over a time window and summarize the result.

use std::sync::mpsc;
use std::time::Duration;

use log::error;
use serde::Serialize;

use openjoule_core::{EnergyMonitor, Reading, SysfsCounterSource, parse_domains};

#[derive(Serialize)]
struct MetricReport {
    name: String,
    description: String,
    readings: Vec<Reading>,
}

#[derive(Serialize)]
struct RecordReport {
    interval_ms: u64,
    metrics: Vec<MetricReport>,
}

pub fn run(
    metrics: &str,
    domains: &str,
    interval_ms: u64,
    duration_s: u64,
    output: Option<&str>,
) -> i32 {
    let requested = parse_domains(domains);
    let source = Box::new(SysfsCounterSource::new());
    let mut monitor =
        match EnergyMonitor::new(source, &requested, Duration::from_millis(interval_ms)) {
            Ok(monitor) => monitor,
            Err(err) => {
                error!("{err}");
                return 1;
            }
        };

    let mut registered = 0usize;
    for name in metrics.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if monitor.add_metric(name) {
            registered += 1;
        } else {
            eprintln!("metric '{name}' is unavailable, skipping");
        }
    }
    if registered == 0 {
        eprintln!("no requested metric could be registered");
        return 1;
    }

    // Ctrl-C ends the recording early (or is the only stop signal when
    // duration is zero).
    let (interrupt_tx, interrupt_rx) = mpsc::channel::<()>();
    if let Err(err) = ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    }) {
        error!("could not install Ctrl-C handler: {err}");
    }

    println!(
        "Recording {registered} metric(s) every {interval_ms} ms{}",
        if duration_s > 0 {
            format!(" for {duration_s} s")
        } else {
            " until Ctrl-C".to_string()
        }
    );
    monitor.start();
    if duration_s > 0 {
        let _ = interrupt_rx.recv_timeout(Duration::from_secs(duration_s));
    } else {
        let _ = interrupt_rx.recv();
    }
    monitor.stop();

    println!("\n{:<24} {:>10} {:>14}", "Metric", "Readings", "Joules");
    for metric in monitor.metrics() {
        let readings = monitor.readings(metric);
        let joules: f64 = readings.iter().map(|r| r.joules).sum();
        println!(
            "{:<24} {:>10} {:>14.3}",
            metric.name(),
            readings.len(),
            joules
        );
    }

    if let Some(path) = output {
        let report = RecordReport {
            interval_ms,
            metrics: monitor
                .metrics()
                .iter()
                .map(|metric| MetricReport {
                    name: metric.name(),
                    description: metric.description(),
                    readings: monitor.readings(metric).to_vec(),
                })
                .collect(),
        };
        let rendered = match serde_json::to_string_pretty(&report) {
            Ok(rendered) => rendered,
            Err(err) => {
                eprintln!("could not render report: {err}");
                return 1;
            }
        };
        if let Err(err) = std::fs::write(path, rendered) {
            eprintln!("could not write {path}: {err}");
            return 1;
        }
        println!("\nWrote {path}");
    }
    0
}
