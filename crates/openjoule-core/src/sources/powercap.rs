//! RAPL zones via the Linux powercap interface.
//!
//! Zones live under `class/powercap` as `intel-rapl:<pkg>` directories
//! with optional `intel-rapl:<pkg>:<sub>` sub-zones. Each zone has a
//! `name` file (`package-0`, `core`, `dram`, ...) and a cumulative
//! `energy_uj` counter in microjoules.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use super::read_trimmed;

const MICROJOULE: f64 = 1e-6;

#[derive(Debug)]
struct Zone {
    counter: String,
    energy_path: PathBuf,
    /// Sub-zone energy is already contained in its package's counter;
    /// only top-level zones contribute to the domain total.
    top_level: bool,
}

/// Discovered set of RAPL zones, fixed after discovery.
#[derive(Debug)]
pub struct PowercapRapl {
    zones: Vec<Zone>,
}

/// `intel-rapl:<pkg>` or `intel-rapl:<pkg>:<sub>` → (pkg, sub).
fn zone_indices(dir_name: &str) -> Option<(u32, Option<u32>)> {
    let rest = dir_name.strip_prefix("intel-rapl:")?;
    match rest.split_once(':') {
        Some((pkg, sub)) => Some((pkg.parse().ok()?, Some(sub.parse().ok()?))),
        None => Some((rest.parse().ok()?, None)),
    }
}

/// Counter name for a zone's raw `name` file content.
fn counter_name(raw: &str, parent: Option<&str>) -> String {
    let short = match raw {
        "core" => "CORE".to_string(),
        "uncore" => "UNCORE".to_string(),
        "dram" => "DRAM".to_string(),
        "psys" => "PSYS".to_string(),
        other => match other.strip_prefix("package-") {
            Some(pkg) => format!("PKG{pkg}"),
            None => other.to_ascii_uppercase(),
        },
    };
    match parent {
        Some(parent) => format!("{parent}.{short}"),
        None => short,
    }
}

impl PowercapRapl {
    /// Scan `root` (normally `/sys/class/powercap`) for RAPL zones.
    /// `None` when no zone with an energy counter exists.
    pub fn discover(root: &Path) -> Option<PowercapRapl> {
        let entries = std::fs::read_dir(root).ok()?;
        let mut found: Vec<(u32, Option<u32>, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                let (pkg, sub) = zone_indices(&name.to_string_lossy())?;
                Some((pkg, sub, entry.path()))
            })
            .collect();
        found.sort_by_key(|(pkg, sub, _)| (*pkg, *sub));

        let mut zones = Vec::new();
        let mut package_names: Vec<(u32, String)> = Vec::new();
        for (pkg, sub, dir) in found {
            let energy_path = dir.join("energy_uj");
            if !energy_path.is_file() {
                continue;
            }
            let Some(raw) = read_trimmed(&dir.join("name")) else {
                continue;
            };
            let counter = match sub {
                None => {
                    let name = counter_name(&raw, None);
                    package_names.push((pkg, name.clone()));
                    name
                }
                Some(_) => {
                    let parent = package_names
                        .iter()
                        .find(|(p, _)| *p == pkg)
                        .map(|(_, n)| n.as_str());
                    counter_name(&raw, parent)
                }
            };
            zones.push(Zone {
                counter,
                energy_path,
                top_level: sub.is_none(),
            });
        }

        if zones.is_empty() {
            debug!("no powercap RAPL zones under {}", root.display());
            return None;
        }
        Some(PowercapRapl { zones })
    }

    /// Counter names in slot order.
    pub fn counter_names(&self) -> Vec<String> {
        self.zones.iter().map(|z| z.counter.clone()).collect()
    }

    /// Read every zone's cumulative energy. Returns per-counter joules
    /// plus the domain total (top-level zones only, so sub-zones are
    /// not double counted).
    pub fn read(&self) -> io::Result<(Vec<f64>, f64)> {
        let mut counters = Vec::with_capacity(self.zones.len());
        let mut total = 0.0;
        for zone in &self.zones {
            let raw = std::fs::read_to_string(&zone.energy_path)?;
            let microjoules: u64 = raw.trim().parse().map_err(|err| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("bad energy_uj in {}: {err}", zone.energy_path.display()),
                )
            })?;
            let joules = microjoules as f64 * MICROJOULE;
            if zone.top_level {
                total += joules;
            }
            counters.push(joules);
        }
        Ok((counters, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_zone(root: &Path, dir: &str, name: &str, energy_uj: u64) {
        let zone = root.join(dir);
        fs::create_dir_all(&zone).unwrap();
        fs::write(zone.join("name"), format!("{name}\n")).unwrap();
        fs::write(zone.join("energy_uj"), format!("{energy_uj}\n")).unwrap();
    }

    #[test]
    fn discovers_packages_and_subzones_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_zone(tmp.path(), "intel-rapl:1", "package-1", 2_000_000);
        write_zone(tmp.path(), "intel-rapl:0", "package-0", 1_000_000);
        write_zone(tmp.path(), "intel-rapl:0:0", "dram", 250_000);

        let rapl = PowercapRapl::discover(tmp.path()).unwrap();
        assert_eq!(rapl.counter_names(), vec!["PKG0", "PKG0.DRAM", "PKG1"]);
    }

    #[test]
    fn reads_joules_and_sums_top_level_only() {
        let tmp = tempfile::tempdir().unwrap();
        write_zone(tmp.path(), "intel-rapl:0", "package-0", 1_000_000);
        write_zone(tmp.path(), "intel-rapl:0:0", "dram", 250_000);
        write_zone(tmp.path(), "intel-rapl:1", "package-1", 2_000_000);

        let rapl = PowercapRapl::discover(tmp.path()).unwrap();
        let (counters, total) = rapl.read().unwrap();
        assert_eq!(counters, vec![1.0, 0.25, 2.0]);
        assert!((total - 3.0).abs() < 1e-12);
    }

    #[test]
    fn ignores_unrelated_entries_and_zones_without_counters() {
        let tmp = tempfile::tempdir().unwrap();
        write_zone(tmp.path(), "intel-rapl:0", "package-0", 1_000_000);
        // Parent control-type dir and an unrelated entry; neither is a zone.
        fs::create_dir_all(tmp.path().join("intel-rapl")).unwrap();
        write_zone(tmp.path(), "dtpm:0", "dtpm-cpu", 99);
        // A zone dir without an energy counter.
        let bare = tmp.path().join("intel-rapl:2");
        fs::create_dir_all(&bare).unwrap();
        fs::write(bare.join("name"), "package-2").unwrap();

        let rapl = PowercapRapl::discover(tmp.path()).unwrap();
        assert_eq!(rapl.counter_names(), vec!["PKG0"]);
    }

    #[test]
    fn missing_root_yields_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(PowercapRapl::discover(&tmp.path().join("absent")).is_none());
        assert!(PowercapRapl::discover(tmp.path()).is_none());
    }

    #[test]
    fn read_fails_on_unparseable_counter() {
        let tmp = tempfile::tempdir().unwrap();
        write_zone(tmp.path(), "intel-rapl:0", "package-0", 1);
        let rapl = PowercapRapl::discover(tmp.path()).unwrap();
        fs::write(tmp.path().join("intel-rapl:0/energy_uj"), "garbage").unwrap();
        assert!(rapl.read().is_err());
    }
}
