//! Counter-source contract: vendor energy domains, snapshots, and the
//! trait every counter backend implements.
//!
//! A [`Snapshot`] is one point-in-time reading of every enabled domain's
//! cumulative energy counters. Snapshots are plain owned values; whoever
//! holds one releases it by dropping it. Energy consumed over an interval
//! is the element-wise [`Snapshot::delta`] of two absolute readings, which
//! keeps the measurement exact regardless of sampling jitter.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of domain identifiers the contract knows.
pub const NUM_DOMAINS: usize = 6;

/// Vendor-defined hardware energy domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainId {
    /// Fujitsu A64FX built-in power monitor.
    A64fx,
    /// Intel/AMD RAPL package counters.
    Rapl,
    /// NVIDIA GPU energy via NVML.
    Nvml,
    /// AMD GPU energy via ROCm SMI.
    Rocm,
    /// HDEEM blade-level measurement (Megware/Atos).
    Hdeem,
    /// Generic hwmon energy sensors.
    Hwmon,
}

impl DomainId {
    /// Every domain identifier, in stable contract order.
    pub const ALL: [DomainId; NUM_DOMAINS] = [
        DomainId::A64fx,
        DomainId::Rapl,
        DomainId::Nvml,
        DomainId::Rocm,
        DomainId::Hdeem,
        DomainId::Hwmon,
    ];

    /// Canonical upper-case name used in metric keys and configuration.
    pub fn name(self) -> &'static str {
        match self {
            DomainId::A64fx => "A64FX",
            DomainId::Rapl => "RAPL",
            DomainId::Nvml => "NVML",
            DomainId::Rocm => "ROCM",
            DomainId::Hdeem => "HDEEM",
            DomainId::Hwmon => "HWMON",
        }
    }

    /// Inverse of [`DomainId::name`].
    pub fn from_name(name: &str) -> Option<DomainId> {
        DomainId::ALL.iter().copied().find(|d| d.name() == name)
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One domain's worth of counter data within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSlot {
    /// Which domain this slot belongs to.
    pub domain: DomainId,
    /// Counter names, parallel to `counters`.
    pub counter_names: Vec<String>,
    /// Per-counter energy in joules.
    pub counters: Vec<f64>,
    /// Aggregate energy for the whole domain in joules.
    pub total: f64,
}

/// Point-in-time reading of all enabled domains' counters.
///
/// Slot order is fixed for the lifetime of a source: a domain's position
/// in `slots` is the position recorded for it at catalog discovery.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub slots: Vec<DomainSlot>,
}

impl Snapshot {
    /// Energy consumed between `self` (earlier) and `later`.
    ///
    /// Slots and counters are matched positionally; diffing a snapshot
    /// against itself yields zero everywhere.
    pub fn delta(&self, later: &Snapshot) -> Snapshot {
        let slots = self
            .slots
            .iter()
            .zip(&later.slots)
            .map(|(begin, end)| DomainSlot {
                domain: begin.domain,
                counter_names: begin.counter_names.clone(),
                counters: begin
                    .counters
                    .iter()
                    .zip(&end.counters)
                    .map(|(b, e)| e - b)
                    .collect(),
                total: end.total - begin.total,
            })
            .collect();
        Snapshot { slots }
    }
}

/// Contract between the sampling engine and a vendor counter backend.
///
/// Call order: [`enable_domain`](CounterSource::enable_domain) for each
/// requested domain, then [`initialize`](CounterSource::initialize) once,
/// then any number of [`snapshot`](CounterSource::snapshot) calls. The
/// engine never reads counters any other way.
pub trait CounterSource: Send {
    /// Request that a domain be enabled. Requests for domains the backend
    /// cannot serve are remembered but ignored.
    fn enable_domain(&mut self, domain: DomainId);

    /// Whether a domain ended up enabled (requested and actually usable).
    fn domain_enabled(&self, domain: DomainId) -> bool;

    /// Initialize the backend. `reserve_snapshots` is a sizing hint for
    /// backends that pre-allocate snapshot storage.
    fn initialize(&mut self, reserve_snapshots: usize) -> Result<(), Error>;

    /// Read all enabled domains' cumulative counters.
    fn snapshot(&mut self) -> Result<Snapshot, Error>;

    /// Release backend resources. Called at most once, after the last
    /// snapshot; backends may also clean up in `Drop`.
    fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(domain: DomainId, counters: &[f64], total: f64) -> DomainSlot {
        DomainSlot {
            domain,
            counter_names: (0..counters.len()).map(|i| format!("C{i}")).collect(),
            counters: counters.to_vec(),
            total,
        }
    }

    #[test]
    fn domain_name_roundtrip() {
        for d in DomainId::ALL {
            assert_eq!(DomainId::from_name(d.name()), Some(d));
        }
        assert_eq!(DomainId::from_name("rapl"), None);
        assert_eq!(DomainId::from_name(""), None);
    }

    #[test]
    fn delta_of_increasing_counters() {
        let begin = Snapshot {
            slots: vec![slot(DomainId::Rapl, &[10.0, 20.0], 30.0)],
        };
        let end = Snapshot {
            slots: vec![slot(DomainId::Rapl, &[12.5, 21.0], 33.5)],
        };
        let d = begin.delta(&end);
        assert_eq!(d.slots.len(), 1);
        assert!((d.slots[0].counters[0] - 2.5).abs() < 1e-12);
        assert!((d.slots[0].counters[1] - 1.0).abs() < 1e-12);
        assert!((d.slots[0].total - 3.5).abs() < 1e-12);
    }

    #[test]
    fn delta_against_self_is_zero() {
        let s = Snapshot {
            slots: vec![
                slot(DomainId::Rapl, &[101.25, 7.5], 108.75),
                slot(DomainId::Hwmon, &[3.0], 3.0),
            ],
        };
        let d = s.delta(&s);
        for sl in &d.slots {
            assert_eq!(sl.total, 0.0);
            assert!(sl.counters.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn delta_preserves_slot_identity() {
        let s = Snapshot {
            slots: vec![slot(DomainId::Hdeem, &[1.0], 1.0)],
        };
        let d = s.delta(&s);
        assert_eq!(d.slots[0].domain, DomainId::Hdeem);
        assert_eq!(d.slots[0].counter_names, vec!["C0"]);
    }
}
