//! # openjoule-core
//!
//! Background sampling of hardware energy counters.
//!
//! The engine periodically reads cumulative energy counters from a
//! [`CounterSource`], diffs consecutive snapshots, and stores a
//! timestamped series of joule values per named metric for later
//! retrieval by a measurement framework.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::time::Duration;
//! use openjoule_core::{DomainId, EnergyMonitor, SysfsCounterSource};
//!
//! let source = Box::new(SysfsCounterSource::new());
//! let mut monitor =
//!     EnergyMonitor::new(source, &DomainId::ALL, Duration::from_millis(50)).unwrap();
//!
//! monitor.add_metric("RAPL:PKG0");
//! monitor.add_metric("RAPL:TOTAL");
//!
//! monitor.start();
//! std::thread::sleep(Duration::from_secs(1));
//! monitor.stop();
//!
//! for metric in monitor.metrics() {
//!     println!("{}: {} reading(s)", metric.name(), monitor.readings(metric).len());
//! }
//! ```
//!
//! ## Architecture
//!
//! A [`DomainCatalog`] is discovered once at startup. Metric names are
//! resolved against it into [`Metric`] handles, and a [`Sampler`] runs
//! the background snapshot/delta/append loop that fills each handle's
//! reading series.
//!
//! Two threads interact: the control thread and one sampler thread. The
//! counter-source handle moves into the sampler on start and back out
//! on stop; only the cancellation flag is ever shared.

pub mod catalog;
pub mod config;
pub mod error;
pub mod metric;
pub mod monitor;
pub mod sampler;
pub mod source;
pub mod sources;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{DomainCatalog, EnergyDomain};
pub use config::{MonitorConfig, parse_domains};
pub use error::Error;
pub use metric::{Metric, MetricKind, TOTAL_NAME};
pub use monitor::EnergyMonitor;
pub use sampler::{Reading, Sampler};
pub use source::{CounterSource, DomainId, DomainSlot, NUM_DOMAINS, Snapshot};
pub use sources::SysfsCounterSource;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
