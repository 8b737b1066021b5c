//! Control object tying the catalog, the sampler, and the parked
//! counter-source handle together.
//!
//! The source handle ping-pongs between the monitor and the sampler:
//! the monitor owns it while idle, hands it over on
//! [`start`](EnergyMonitor::start), and takes it back on
//! [`stop`](EnergyMonitor::stop). Neither party ever holds it while the
//! other does.

use std::time::Duration;

use log::{info, warn};

use crate::catalog::DomainCatalog;
use crate::error::Error;
use crate::metric::Metric;
use crate::sampler::{Reading, Sampler};
use crate::source::{CounterSource, DomainId};

pub struct EnergyMonitor {
    catalog: DomainCatalog,
    sampler: Sampler,
    source: Option<Box<dyn CounterSource>>,
    metrics: Vec<Metric>,
}

impl EnergyMonitor {
    /// Initialize the source with the requested domains and build the
    /// catalog. Fails only when the source is unusable.
    pub fn new(
        mut source: Box<dyn CounterSource>,
        requested: &[DomainId],
        interval: Duration,
    ) -> Result<EnergyMonitor, Error> {
        let catalog = DomainCatalog::discover(source.as_mut(), requested)?;
        Ok(EnergyMonitor {
            catalog,
            sampler: Sampler::new(interval),
            source: Some(source),
            metrics: Vec::new(),
        })
    }

    pub fn catalog(&self) -> &DomainCatalog {
        &self.catalog
    }

    pub fn interval(&self) -> Duration {
        self.sampler.interval()
    }

    pub fn is_running(&self) -> bool {
        self.sampler.is_running()
    }

    /// Register a metric by its `"DOMAIN:COUNTER"` name.
    ///
    /// Returns whether the metric is registered afterwards. An
    /// unresolvable name is skipped with a diagnostic and leaves other
    /// registrations untouched.
    pub fn add_metric(&mut self, name: &str) -> bool {
        let Some(metric) = Metric::resolve(name, &self.catalog) else {
            return false;
        };
        if self.metrics.contains(&metric) {
            warn!("metric {metric} is already registered");
            return true;
        }
        info!("registered metric {metric}: {}", metric.description());
        self.metrics.push(metric);
        true
    }

    /// Metrics registered so far, in registration order.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Find a registered metric by its canonical name.
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name() == name)
    }

    /// Hand the parked source to the sampler and begin collecting.
    /// A warning no-op while a session is already running.
    pub fn start(&mut self) {
        let Some(source) = self.source.take() else {
            warn!("measurement already running, start ignored");
            return;
        };
        if let Err(source) = self.sampler.start(source, &self.metrics) {
            self.source = Some(source);
        }
    }

    /// Stop collecting and park the returned source handle. Idempotent.
    pub fn stop(&mut self) {
        if let Some(source) = self.sampler.stop() {
            self.source = Some(source);
        }
    }

    /// Readings collected for `metric` during the last session.
    pub fn readings(&self, metric: &Metric) -> &[Reading] {
        self.sampler.readings(metric)
    }
}

impl Drop for EnergyMonitor {
    fn drop(&mut self) {
        self.stop();
        if let Some(mut source) = self.source.take() {
            source.shutdown();
        }
    }
}
