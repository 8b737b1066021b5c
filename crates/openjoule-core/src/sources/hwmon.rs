//! Energy sensors via the Linux hwmon interface.
//!
//! Chips live under `class/hwmon` as `hwmon<N>` directories. A chip
//! exposing cumulative energy has `energy<N>_input` files in
//! microjoules, optionally labelled through `energy<N>_label`; the
//! counter key is `<chip>.<label>`.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use super::{normalize_key, read_trimmed};

const MICROJOULE: f64 = 1e-6;

#[derive(Debug)]
struct Sensor {
    key: String,
    input_path: PathBuf,
}

/// Discovered set of hwmon energy sensors, fixed after discovery.
#[derive(Debug)]
pub struct HwmonEnergy {
    sensors: Vec<Sensor>,
}

impl HwmonEnergy {
    /// Scan `root` (normally `/sys/class/hwmon`) for chips with energy
    /// counters. `None` when no sensor exists.
    pub fn discover(root: &Path) -> Option<HwmonEnergy> {
        let entries = std::fs::read_dir(root).ok()?;
        let mut chip_dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        chip_dirs.sort();

        let mut sensors = Vec::new();
        for dir in chip_dirs {
            let chip = read_trimmed(&dir.join("name"))
                .map(|s| normalize_key(&s))
                .unwrap_or_else(|| {
                    normalize_key(&dir.file_name().unwrap_or_default().to_string_lossy())
                });

            let Ok(files) = std::fs::read_dir(&dir) else {
                continue;
            };
            let mut inputs: Vec<PathBuf> = files
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    path.file_name()
                        .map(|name| {
                            let name = name.to_string_lossy();
                            name.starts_with("energy") && name.ends_with("_input")
                        })
                        .unwrap_or(false)
                })
                .collect();
            inputs.sort();

            for input_path in inputs {
                let fname = input_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let label_path = dir.join(fname.replace("_input", "_label"));
                let label = read_trimmed(&label_path)
                    .map(|s| normalize_key(&s))
                    .unwrap_or_else(|| normalize_key(fname.trim_end_matches("_input")));
                sensors.push(Sensor {
                    key: format!("{chip}.{label}"),
                    input_path,
                });
            }
        }

        if sensors.is_empty() {
            debug!("no hwmon energy sensors under {}", root.display());
            return None;
        }
        Some(HwmonEnergy { sensors })
    }

    /// Counter names in slot order.
    pub fn counter_names(&self) -> Vec<String> {
        self.sensors.iter().map(|s| s.key.clone()).collect()
    }

    /// Read every sensor's cumulative energy. Returns per-counter
    /// joules plus the domain total.
    pub fn read(&self) -> io::Result<(Vec<f64>, f64)> {
        let mut counters = Vec::with_capacity(self.sensors.len());
        let mut total = 0.0;
        for sensor in &self.sensors {
            let raw = std::fs::read_to_string(&sensor.input_path)?;
            let microjoules: u64 = raw.trim().parse().map_err(|err| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("bad energy input in {}: {err}", sensor.input_path.display()),
                )
            })?;
            let joules = microjoules as f64 * MICROJOULE;
            total += joules;
            counters.push(joules);
        }
        Ok((counters, total))
    }
}
