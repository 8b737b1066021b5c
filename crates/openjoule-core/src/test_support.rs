//! Deterministic mock counter source shared by the unit tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;
use crate::source::{CounterSource, DomainId, DomainSlot, Snapshot};

/// Mock backend with predictable cumulative counters.
///
/// Counter `i` of every usable domain advances by `i + 1` joules per
/// snapshot, so the delta of two consecutive snapshots is exactly
/// `i + 1` and a domain's total delta is the sum over its counters.
pub(crate) struct MockCounterSource {
    domains: Vec<(DomainId, Vec<String>)>,
    requested: HashSet<DomainId>,
    initialized: bool,
    reads: Arc<AtomicU64>,
    fail_snapshots: bool,
    shutdowns: Arc<AtomicU64>,
}

impl MockCounterSource {
    pub fn new() -> Self {
        Self {
            domains: Vec::new(),
            requested: HashSet::new(),
            initialized: false,
            reads: Arc::new(AtomicU64::new(0)),
            fail_snapshots: false,
            shutdowns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Declare a domain this mock can serve, with its counter names.
    pub fn with_domain(mut self, domain: DomainId, counters: &[&str]) -> Self {
        self.domains
            .push((domain, counters.iter().map(|s| s.to_string()).collect()));
        self
    }

    /// Make every snapshot attempt fail.
    pub fn failing_snapshots(mut self) -> Self {
        self.fail_snapshots = true;
        self
    }

    /// Shared snapshot counter, observable after the source handle has
    /// moved into a sampling thread and back.
    pub fn reads_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.reads)
    }

    /// Shared shutdown counter, same idea as [`reads_handle`](Self::reads_handle).
    pub fn shutdowns_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.shutdowns)
    }
}

impl CounterSource for MockCounterSource {
    fn enable_domain(&mut self, domain: DomainId) {
        self.requested.insert(domain);
    }

    fn domain_enabled(&self, domain: DomainId) -> bool {
        self.requested.contains(&domain) && self.domains.iter().any(|(d, _)| *d == domain)
    }

    fn initialize(&mut self, _reserve_snapshots: usize) -> Result<(), Error> {
        self.initialized = true;
        Ok(())
    }

    fn snapshot(&mut self) -> Result<Snapshot, Error> {
        assert!(self.initialized, "snapshot before initialize");
        if self.fail_snapshots {
            return Err(Error::Unusable("mock snapshot failure".into()));
        }
        let reads = (self.reads.fetch_add(1, Ordering::Relaxed) + 1) as f64;
        let slots = self
            .domains
            .iter()
            .filter(|(d, _)| self.requested.contains(d))
            .map(|(domain, names)| {
                let counters: Vec<f64> = (0..names.len())
                    .map(|i| reads * (i + 1) as f64)
                    .collect();
                let total = counters.iter().sum();
                DomainSlot {
                    domain: *domain,
                    counter_names: names.clone(),
                    counters,
                    total,
                }
            })
            .collect();
        Ok(Snapshot { slots })
    }

    fn shutdown(&mut self) {
        self.shutdowns.fetch_add(1, Ordering::Relaxed);
    }
}
