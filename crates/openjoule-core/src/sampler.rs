//! Background sampling engine.
//!
//! Exactly two threads touch a [`Sampler`]: the control thread calling
//! [`start`](Sampler::start)/[`stop`](Sampler::stop)/[`readings`](Sampler::readings),
//! and one sampler thread spawned by `start`. The counter-source handle
//! and the reading sequences have a single owner at all times: both move
//! into the sampler thread on `start` and move back on `stop` through
//! the thread's join value. The only genuinely shared datum is the
//! cancellation flag, an `AtomicBool` checked once per iteration.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::metric::{Metric, MetricProbe};
use crate::source::CounterSource;

/// One timestamped measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Unix timestamp in nanoseconds, captured at the start of the
    /// sampling iteration this reading belongs to.
    pub timestamp_ns: u64,
    /// Energy consumed during the preceding interval, in joules.
    pub joules: f64,
}

type SeriesMap = HashMap<u64, Vec<Reading>>;
type SessionState = (Box<dyn CounterSource>, SeriesMap);

/// Owns the sampler thread and, between sessions, the collected series.
pub struct Sampler {
    interval: Duration,
    active: Arc<AtomicBool>,
    worker: Option<JoinHandle<SessionState>>,
    series: SeriesMap,
}

impl Sampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            active: Arc::new(AtomicBool::new(false)),
            worker: None,
            series: HashMap::new(),
        }
    }

    /// Configured sleep between sampling iterations.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a sampling session is currently running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Begin a sampling session.
    ///
    /// Clears any previously collected series, creates one empty
    /// sequence per metric, and launches the sampler thread, which takes
    /// ownership of `source` until [`stop`](Sampler::stop) hands it
    /// back. Starting while already running is rejected; the untouched
    /// source handle comes straight back in the `Err`.
    pub fn start(
        &mut self,
        source: Box<dyn CounterSource>,
        metrics: &[Metric],
    ) -> Result<(), Box<dyn CounterSource>> {
        if self.worker.is_some() {
            warn!("sampler is already running, start ignored");
            return Err(source);
        }

        self.series.clear();
        let probes: Vec<MetricProbe> = metrics.iter().map(Metric::probe).collect();
        let mut series: SeriesMap = HashMap::with_capacity(probes.len());
        for probe in &probes {
            series.insert(probe.id, Vec::new());
        }

        debug!(
            "starting sampler: {} metric(s), interval {:?}",
            probes.len(),
            self.interval
        );
        self.active.store(true, Ordering::Relaxed);
        let active = Arc::clone(&self.active);
        let interval = self.interval;
        self.worker = Some(thread::spawn(move || {
            collect_readings(source, probes, series, active, interval)
        }));
        Ok(())
    }

    /// End the session and take back the counter-source handle.
    ///
    /// Blocks until the sampler thread has observed cancellation and
    /// exited; latency is bounded by one interval plus one snapshot
    /// read. Stopping while idle is a no-op returning `None`.
    pub fn stop(&mut self) -> Option<Box<dyn CounterSource>> {
        self.active.store(false, Ordering::Relaxed);
        let worker = self.worker.take()?;
        match worker.join() {
            Ok((source, series)) => {
                self.series = series;
                Some(source)
            }
            Err(_) => {
                error!("sampler thread panicked; counter source lost");
                None
            }
        }
    }

    /// Accumulated readings for a metric, in chronological order.
    ///
    /// Empty for metrics that were not part of the last session. Valid
    /// once [`stop`](Sampler::stop) has returned.
    pub fn readings(&self, metric: &Metric) -> &[Reading] {
        self.series
            .get(&metric.id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn unix_ns_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Sampler thread body. Runs until the active flag clears; an
/// in-progress snapshot/diff/append cycle always completes.
fn collect_readings(
    mut source: Box<dyn CounterSource>,
    probes: Vec<MetricProbe>,
    mut series: SeriesMap,
    active: Arc<AtomicBool>,
    interval: Duration,
) -> SessionState {
    // Baseline before the loop; every iteration diffs against it and
    // then replaces it with the iteration's snapshot.
    let mut baseline = match source.snapshot() {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!("baseline snapshot failed, no readings this session: {err}");
            while active.load(Ordering::Relaxed) {
                thread::sleep(interval);
            }
            return (source, series);
        }
    };

    while active.load(Ordering::Relaxed) {
        let timestamp_ns = unix_ns_now();
        match source.snapshot() {
            Ok(current) => {
                let delta = baseline.delta(&current);
                for probe in &probes {
                    let joules = probe.read(&delta);
                    if let Some(sequence) = series.get_mut(&probe.id) {
                        sequence.push(Reading {
                            timestamp_ns,
                            joules,
                        });
                    }
                }
                baseline = current;
            }
            Err(err) => {
                warn!("snapshot failed, skipping this interval: {err}");
            }
        }
        thread::sleep(interval);
    }

    (source, series)
}
