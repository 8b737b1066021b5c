//! Metric identities: addressable quantities within a snapshot.
//!
//! A [`Metric`] names either a single counter within a domain, a
//! domain's aggregate energy, or the grand total. Each metric carries a
//! stable numeric identity derived from its (counter, domain, kind)
//! triple; two metrics are equal iff they address the same quantity.
//!
//! Metrics are registration tokens: movable but deliberately not
//! `Clone`, so a sequence of readings belongs to exactly one handle.

use std::hash::{Hash, Hasher};

use log::warn;

use crate::catalog::{DomainCatalog, EnergyDomain};
use crate::source::{DomainId, NUM_DOMAINS, Snapshot};

/// Reserved counter (and domain) name addressing aggregate energy.
pub const TOTAL_NAME: &str = "TOTAL";

/// What a metric addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// One counter within one domain.
    Single = 0,
    /// A domain's aggregate energy.
    DomainTotal = 1,
    /// Aggregate energy across all enabled domains.
    Total = 2,
}

/// An addressable quantity with a stable identity.
#[derive(Debug)]
pub struct Metric {
    kind: MetricKind,
    domain_position: usize,
    domain: Option<DomainId>,
    domain_name: String,
    counter_index: usize,
    counter_name: String,
}

impl Metric {
    /// Metric for one named counter within `domain`. `None` if the
    /// domain does not expose that counter.
    pub fn single(domain: &EnergyDomain, counter: &str) -> Option<Metric> {
        let counter_index = domain.counter_index(counter)?;
        Some(Metric {
            kind: MetricKind::Single,
            domain_position: domain.position(),
            domain: Some(domain.id()),
            domain_name: domain.id().name().to_string(),
            counter_index,
            counter_name: counter.to_string(),
        })
    }

    /// Metric for a domain's aggregate energy.
    pub fn domain_total(domain: &EnergyDomain) -> Metric {
        Metric {
            kind: MetricKind::DomainTotal,
            domain_position: domain.position(),
            domain: Some(domain.id()),
            domain_name: domain.id().name().to_string(),
            counter_index: 0,
            counter_name: TOTAL_NAME.to_string(),
        }
    }

    /// Metric for the grand total across all enabled domains.
    pub fn total() -> Metric {
        Metric {
            kind: MetricKind::Total,
            domain_position: 0,
            domain: None,
            domain_name: TOTAL_NAME.to_string(),
            counter_index: 0,
            counter_name: TOTAL_NAME.to_string(),
        }
    }

    /// Resolve a `"DOMAIN:COUNTER"` name against the catalog.
    ///
    /// The reserved counter `"TOTAL"` selects a domain total; the bare
    /// name `"TOTAL"` (or `"TOTAL:TOTAL"`) selects the grand total. Any
    /// malformed or unknown name yields `None` with a diagnostic; the
    /// metric is unavailable, nothing more.
    pub fn resolve(name: &str, catalog: &DomainCatalog) -> Option<Metric> {
        if name == TOTAL_NAME {
            return Some(Metric::total());
        }
        let Some((domain_part, counter_part)) = name.split_once(':') else {
            warn!("metric name '{name}' is missing the ':' separator");
            return None;
        };
        if domain_part == TOTAL_NAME && counter_part == TOTAL_NAME {
            return Some(Metric::total());
        }
        let Some(domain) = catalog.domain(domain_part) else {
            warn!("metric name '{name}' refers to unknown or disabled domain '{domain_part}'");
            return None;
        };
        if counter_part == TOTAL_NAME {
            return Some(Metric::domain_total(domain));
        }
        match Metric::single(domain, counter_part) {
            Some(metric) => Some(metric),
            None => {
                warn!("domain '{domain_part}' has no counter named '{counter_part}'");
                None
            }
        }
    }

    /// Stable numeric identity, unique per (counter, domain, kind).
    pub fn id(&self) -> u64 {
        ((self.counter_index * NUM_DOMAINS + self.domain_position) * 3 + self.kind as usize) as u64
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Domain identifier; `None` for the grand total.
    pub fn domain(&self) -> Option<DomainId> {
        self.domain
    }

    /// Canonical `"DOMAIN:COUNTER"` key.
    pub fn name(&self) -> String {
        format!("{}:{}", self.domain_name, self.counter_name)
    }

    /// Human-readable description for measurement frameworks.
    pub fn description(&self) -> String {
        match self.kind {
            MetricKind::Single => format!(
                "Counter '{}' in energy domain '{}'",
                self.counter_name, self.domain_name
            ),
            MetricKind::DomainTotal => {
                format!("Total energy for domain '{}'", self.domain_name)
            }
            MetricKind::Total => "Total energy consumption for all enabled domains".to_string(),
        }
    }

    /// Extract this metric's value from a delta snapshot, in joules.
    pub fn read(&self, snapshot: &Snapshot) -> f64 {
        self.probe().read(snapshot)
    }

    pub(crate) fn probe(&self) -> MetricProbe {
        MetricProbe {
            id: self.id(),
            kind: self.kind,
            domain_position: self.domain_position,
            counter_index: self.counter_index,
        }
    }
}

impl PartialEq for Metric {
    fn eq(&self, other: &Metric) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Metric {}

impl Hash for Metric {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{})", self.domain_name, self.counter_name)
    }
}

/// Value-extraction view of a metric, owned by the sampler thread.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MetricProbe {
    pub(crate) id: u64,
    kind: MetricKind,
    domain_position: usize,
    counter_index: usize,
}

impl MetricProbe {
    /// Extract the addressed value; out-of-range addresses read as zero
    /// rather than interrupting the sampling loop.
    pub(crate) fn read(&self, snapshot: &Snapshot) -> f64 {
        match self.kind {
            MetricKind::Single => snapshot
                .slots
                .get(self.domain_position)
                .and_then(|slot| slot.counters.get(self.counter_index))
                .copied()
                .unwrap_or(0.0),
            MetricKind::DomainTotal => snapshot
                .slots
                .get(self.domain_position)
                .map(|slot| slot.total)
                .unwrap_or(0.0),
            // Matches the long-standing behavior of the vendor contract:
            // the grand total reads slot zero's aggregate, it does not sum
            // every enabled domain. See DESIGN.md.
            MetricKind::Total => snapshot.slots.first().map(|slot| slot.total).unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CounterSource, DomainId};
    use crate::test_support::MockCounterSource;

    fn catalog() -> (DomainCatalog, Snapshot) {
        let mut source = MockCounterSource::new()
            .with_domain(DomainId::Rapl, &["PKG0", "PKG1"])
            .with_domain(DomainId::Hwmon, &["cpu.energy1"]);
        let catalog =
            DomainCatalog::discover(&mut source, &[DomainId::Rapl, DomainId::Hwmon]).unwrap();
        let snapshot = source.snapshot().unwrap();
        (catalog, snapshot)
    }

    #[test]
    fn identities_are_unique_per_triple() {
        let (catalog, _) = catalog();
        let rapl = catalog.domain("RAPL").unwrap();
        let hwmon = catalog.domain("HWMON").unwrap();

        let metrics = [
            Metric::single(rapl, "PKG0").unwrap(),
            Metric::single(rapl, "PKG1").unwrap(),
            Metric::single(hwmon, "cpu.energy1").unwrap(),
            Metric::domain_total(rapl),
            Metric::domain_total(hwmon),
            Metric::total(),
        ];
        for (i, a) in metrics.iter().enumerate() {
            for b in &metrics[i + 1..] {
                assert_ne!(a.id(), b.id(), "{a} and {b} collide");
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn equality_follows_identity() {
        let (catalog, _) = catalog();
        let rapl = catalog.domain("RAPL").unwrap();
        let a = Metric::single(rapl, "PKG0").unwrap();
        let b = Metric::single(rapl, "PKG0").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn resolve_single_counter() {
        let (catalog, _) = catalog();
        let m = Metric::resolve("RAPL:PKG1", &catalog).unwrap();
        assert_eq!(m.kind(), MetricKind::Single);
        assert_eq!(m.domain(), Some(DomainId::Rapl));
        assert_eq!(m.name(), "RAPL:PKG1");
    }

    #[test]
    fn resolve_domain_total_and_grand_total() {
        let (catalog, _) = catalog();
        let dt = Metric::resolve("RAPL:TOTAL", &catalog).unwrap();
        assert_eq!(dt.kind(), MetricKind::DomainTotal);
        assert_eq!(dt.name(), "RAPL:TOTAL");

        let t1 = Metric::resolve("TOTAL", &catalog).unwrap();
        let t2 = Metric::resolve("TOTAL:TOTAL", &catalog).unwrap();
        assert_eq!(t1.kind(), MetricKind::Total);
        assert_eq!(t1, t2);
        assert_eq!(t1.name(), "TOTAL:TOTAL");
    }

    #[test]
    fn resolve_rejects_bad_names() {
        let (catalog, _) = catalog();
        assert!(Metric::resolve("PKG0", &catalog).is_none());
        assert!(Metric::resolve("NVML:GPU0", &catalog).is_none());
        assert!(Metric::resolve("RAPL:PKG9", &catalog).is_none());
        assert!(Metric::resolve("", &catalog).is_none());
        // A bad name does not poison good ones.
        assert!(Metric::resolve("RAPL:PKG0", &catalog).is_some());
    }

    #[test]
    fn read_extracts_addressed_values() {
        let (catalog, snapshot) = catalog();
        let rapl = catalog.domain("RAPL").unwrap();
        let hwmon = catalog.domain("HWMON").unwrap();

        // Second mock snapshot: counter i reads 2 * (i + 1).
        assert_eq!(Metric::single(rapl, "PKG0").unwrap().read(&snapshot), 2.0);
        assert_eq!(Metric::single(rapl, "PKG1").unwrap().read(&snapshot), 4.0);
        assert_eq!(Metric::domain_total(rapl).read(&snapshot), 6.0);
        assert_eq!(Metric::domain_total(hwmon).read(&snapshot), 2.0);
    }

    #[test]
    fn grand_total_reads_first_slot_only() {
        let (catalog, snapshot) = catalog();
        let rapl = catalog.domain("RAPL").unwrap();
        // With two enabled domains the grand total equals slot zero's
        // aggregate, not the sum of both.
        assert_eq!(
            Metric::total().read(&snapshot),
            Metric::domain_total(rapl).read(&snapshot)
        );
    }

    #[test]
    fn read_out_of_range_is_zero() {
        let (catalog, _) = catalog();
        let rapl = catalog.domain("RAPL").unwrap();
        let empty = Snapshot::default();
        assert_eq!(Metric::single(rapl, "PKG0").unwrap().read(&empty), 0.0);
        assert_eq!(Metric::domain_total(rapl).read(&empty), 0.0);
        assert_eq!(Metric::total().read(&empty), 0.0);
    }

    #[test]
    fn descriptions_name_the_addressed_quantity() {
        let (catalog, _) = catalog();
        let rapl = catalog.domain("RAPL").unwrap();
        assert!(
            Metric::single(rapl, "PKG0")
                .unwrap()
                .description()
                .contains("PKG0")
        );
        assert!(Metric::domain_total(rapl).description().contains("RAPL"));
        assert!(Metric::total().description().contains("all enabled"));
    }
}
