//! Shipped counter-source backends reading Linux sysfs.
//!
//! [`SysfsCounterSource`] implements the [`CounterSource`] contract over
//! two probes: RAPL zones through powercap and generic energy sensors
//! through hwmon. The sysfs root is a parameter so the probes can be
//! exercised against fixture trees.

pub mod hwmon;
pub mod powercap;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::source::{CounterSource, DomainId, DomainSlot, Snapshot};

use hwmon::HwmonEnergy;
use powercap::PowercapRapl;

/// Read a sysfs attribute, trimmed; `None` when absent or empty.
pub(crate) fn read_trimmed(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let value = raw.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Lower-case a raw sysfs name and collapse runs of non-alphanumerics
/// into single underscores.
pub(crate) fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_us = false;
    for ch in raw.to_ascii_lowercase().chars() {
        let mapped = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        if mapped == '_' {
            if !prev_us {
                out.push(mapped);
            }
            prev_us = true;
        } else {
            out.push(mapped);
            prev_us = false;
        }
    }
    out.trim_matches('_').to_string()
}

/// Counter source over the local machine's sysfs energy counters.
///
/// Serves the `RAPL` and `HWMON` domains; requests for any other domain
/// are remembered but never come up.
pub struct SysfsCounterSource {
    sys_root: PathBuf,
    requested: HashSet<DomainId>,
    rapl: Option<PowercapRapl>,
    hwmon: Option<HwmonEnergy>,
}

impl SysfsCounterSource {
    /// Source over the real `/sys`.
    pub fn new() -> SysfsCounterSource {
        SysfsCounterSource::with_sys_root("/sys")
    }

    /// Source over an alternate sysfs root (fixtures, chroots).
    pub fn with_sys_root(root: impl Into<PathBuf>) -> SysfsCounterSource {
        SysfsCounterSource {
            sys_root: root.into(),
            requested: HashSet::new(),
            rapl: None,
            hwmon: None,
        }
    }

    fn slot(&self, domain: DomainId) -> Result<Option<DomainSlot>, Error> {
        let (counter_names, counters, total) = match domain {
            DomainId::Rapl => match &self.rapl {
                Some(rapl) => {
                    let (counters, total) = rapl.read()?;
                    (rapl.counter_names(), counters, total)
                }
                None => return Ok(None),
            },
            DomainId::Hwmon => match &self.hwmon {
                Some(hwmon) => {
                    let (counters, total) = hwmon.read()?;
                    (hwmon.counter_names(), counters, total)
                }
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(DomainSlot {
            domain,
            counter_names,
            counters,
            total,
        }))
    }
}

impl Default for SysfsCounterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for SysfsCounterSource {
    fn enable_domain(&mut self, domain: DomainId) {
        self.requested.insert(domain);
    }

    fn domain_enabled(&self, domain: DomainId) -> bool {
        match domain {
            DomainId::Rapl => self.rapl.is_some(),
            DomainId::Hwmon => self.hwmon.is_some(),
            _ => false,
        }
    }

    fn initialize(&mut self, _reserve_snapshots: usize) -> Result<(), Error> {
        // Snapshots are plain owned values here; the reservation hint
        // only matters to pooling vendor backends.
        if self.requested.contains(&DomainId::Rapl) {
            self.rapl = PowercapRapl::discover(&self.sys_root.join("class/powercap"));
        }
        if self.requested.contains(&DomainId::Hwmon) {
            self.hwmon = HwmonEnergy::discover(&self.sys_root.join("class/hwmon"));
        }
        Ok(())
    }

    fn snapshot(&mut self) -> Result<Snapshot, Error> {
        let mut slots = Vec::new();
        for domain in DomainId::ALL {
            if let Some(slot) = self.slot(domain)? {
                slots.push(slot);
            }
        }
        Ok(Snapshot { slots })
    }

    fn shutdown(&mut self) {
        self.rapl = None;
        self.hwmon = None;
    }
}
