//! Domain catalog: initialize a counter source and discover what it
//! actually exposes.
//!
//! Discovery happens once at startup. The catalog maps each enabled
//! domain's name to its slot position within a snapshot and to the
//! counter names that domain exposes; everything is immutable after
//! [`DomainCatalog::discover`] returns.

use std::collections::HashMap;

use log::{debug, warn};

use crate::error::Error;
use crate::source::{CounterSource, DomainId};

/// Snapshot slots the source is asked to pre-allocate. The sampling loop
/// needs two live snapshots plus one in flight for the next iteration.
pub(crate) const RESERVED_SNAPSHOT_SLOTS: usize = 3;

/// One enabled energy domain as discovered from a probe snapshot.
#[derive(Debug)]
pub struct EnergyDomain {
    id: DomainId,
    position: usize,
    counter_index_by_name: HashMap<String, usize>,
}

impl EnergyDomain {
    /// Hardware domain identifier.
    pub fn id(&self) -> DomainId {
        self.id
    }

    /// Slot index of this domain within a snapshot's domain array.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Index of a counter within this domain's counter array.
    pub fn counter_index(&self, name: &str) -> Option<usize> {
        self.counter_index_by_name.get(name).copied()
    }

    /// Counter names, sorted for stable display.
    pub fn counter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .counter_index_by_name
            .keys()
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of counters this domain exposes.
    pub fn counter_count(&self) -> usize {
        self.counter_index_by_name.len()
    }
}

/// Mapping from domain name to [`EnergyDomain`], built once at startup.
#[derive(Debug, Default)]
pub struct DomainCatalog {
    by_name: HashMap<String, EnergyDomain>,
}

impl DomainCatalog {
    /// Initialize `source` with the requested domains and discover the
    /// enabled ones.
    ///
    /// Every requested domain that did not come up is logged as a
    /// warning and skipped. Failing to take the probe snapshot is fatal;
    /// the source is judged unusable and the error propagates.
    pub fn discover(
        source: &mut dyn CounterSource,
        requested: &[DomainId],
    ) -> Result<DomainCatalog, Error> {
        for &domain in requested {
            source.enable_domain(domain);
        }
        source.initialize(RESERVED_SNAPSHOT_SLOTS)?;
        for &domain in requested {
            if !source.domain_enabled(domain) {
                warn!("domain '{domain}' was requested but could not be enabled");
            }
        }

        // The probe snapshot carries the counter names for every enabled
        // domain; it is dropped as soon as the names are copied out.
        let probe = source.snapshot()?;

        let mut by_name = HashMap::new();
        for (position, slot) in probe.slots.iter().enumerate() {
            if !source.domain_enabled(slot.domain) {
                continue;
            }
            let counter_index_by_name = slot
                .counter_names
                .iter()
                .enumerate()
                .map(|(idx, name)| (name.clone(), idx))
                .collect();
            debug!(
                "discovered domain '{}' at slot {position} with {} counter(s)",
                slot.domain,
                slot.counter_names.len()
            );
            by_name.insert(
                slot.domain.name().to_string(),
                EnergyDomain {
                    id: slot.domain,
                    position,
                    counter_index_by_name,
                },
            );
        }

        if by_name.is_empty() {
            warn!("no energy domains could be enabled");
        }
        Ok(DomainCatalog { by_name })
    }

    /// Look up a domain by its canonical name.
    pub fn domain(&self, name: &str) -> Option<&EnergyDomain> {
        self.by_name.get(name)
    }

    /// Enabled domain names, sorted.
    pub fn domain_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Iterate over the enabled domains in unspecified order.
    pub fn domains(&self) -> impl Iterator<Item = &EnergyDomain> {
        self.by_name.values()
    }

    /// Number of enabled domains.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no domain could be enabled.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Total number of counters across all enabled domains.
    pub fn counter_count(&self) -> usize {
        self.by_name.values().map(EnergyDomain::counter_count).sum()
    }
}
