//! Environment-driven measurement configuration.
//!
//! Which domains to request and how often to sample are selected from
//! outside the engine; the engine itself only consumes the result.

use std::time::Duration;

use log::warn;

use crate::source::DomainId;

/// Comma-separated domain selection, or the literal `ALL`.
pub const DOMAINS_ENV: &str = "OPENJOULE_DOMAINS";
/// Sampling interval in microseconds.
pub const INTERVAL_ENV: &str = "OPENJOULE_INTERVAL_US";

const DEFAULT_INTERVAL_US: u64 = 50_000;

/// Parse a domain selection string.
///
/// `"ALL"` selects every known domain, the empty string selects none,
/// and unknown names are skipped with a diagnostic.
pub fn parse_domains(spec: &str) -> Vec<DomainId> {
    if spec.trim() == "ALL" {
        return DomainId::ALL.to_vec();
    }
    spec.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| {
            let domain = DomainId::from_name(name);
            if domain.is_none() {
                warn!("unknown energy domain '{name}' in selection, skipping");
            }
            domain
        })
        .collect()
}

/// Resolved configuration for an [`EnergyMonitor`](crate::EnergyMonitor).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub domains: Vec<DomainId>,
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            domains: DomainId::ALL.to_vec(),
            interval: Duration::from_micros(DEFAULT_INTERVAL_US),
        }
    }
}

impl MonitorConfig {
    /// Read the configuration from the environment, falling back to the
    /// defaults (all domains, 50 ms) for anything unset or unparseable.
    pub fn from_env() -> MonitorConfig {
        let domains = match std::env::var(DOMAINS_ENV) {
            Ok(spec) => parse_domains(&spec),
            Err(_) => DomainId::ALL.to_vec(),
        };
        let interval_us = match std::env::var(INTERVAL_ENV) {
            Ok(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                warn!("invalid {INTERVAL_ENV} value '{raw}', using default");
                DEFAULT_INTERVAL_US
            }),
            Err(_) => DEFAULT_INTERVAL_US,
        };
        MonitorConfig {
            domains,
            interval: Duration::from_micros(interval_us),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_yields_no_domains() {
        assert!(parse_domains("").is_empty());
        assert!(parse_domains("  ").is_empty());
        assert!(parse_domains(",,").is_empty());
    }

    #[test]
    fn all_selects_every_domain() {
        assert_eq!(parse_domains("ALL"), DomainId::ALL.to_vec());
        assert_eq!(parse_domains(" ALL "), DomainId::ALL.to_vec());
    }

    #[test]
    fn named_selection_with_whitespace() {
        assert_eq!(
            parse_domains(" RAPL , HWMON "),
            vec![DomainId::Rapl, DomainId::Hwmon]
        );
    }

    #[test]
    fn unknown_names_are_skipped_not_fatal() {
        assert_eq!(
            parse_domains("RAPL,BOGUS,HWMON"),
            vec![DomainId::Rapl, DomainId::Hwmon]
        );
        assert!(parse_domains("rapl").is_empty());
    }

    #[test]
    fn default_config_samples_all_domains_at_50ms() {
        let config = MonitorConfig::default();
        assert_eq!(config.domains.len(), DomainId::ALL.len());
        assert_eq!(config.interval, Duration::from_millis(50));
    }

    #[test]
    fn from_env_reads_both_variables() {
        // Sole test touching these variables; set, check, clean up.
        unsafe {
            std::env::set_var(DOMAINS_ENV, "RAPL");
            std::env::set_var(INTERVAL_ENV, "1000");
        }
        let config = MonitorConfig::from_env();
        assert_eq!(config.domains, vec![DomainId::Rapl]);
        assert_eq!(config.interval, Duration::from_micros(1000));

        unsafe {
            std::env::set_var(INTERVAL_ENV, "not-a-number");
        }
        let config = MonitorConfig::from_env();
        assert_eq!(config.interval, Duration::from_micros(DEFAULT_INTERVAL_US));

        unsafe {
            std::env::remove_var(DOMAINS_ENV);
            std::env::remove_var(INTERVAL_ENV);
        }
        let config = MonitorConfig::from_env();
        assert_eq!(config.domains.len(), DomainId::ALL.len());
    }
}
