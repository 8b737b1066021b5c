//! List the energy domains and counters available on this machine.

use std::collections::BTreeMap;

use openjoule_core::{DomainCatalog, DomainId, SysfsCounterSource};

pub fn run(json: bool) -> i32 {
    let mut source = SysfsCounterSource::new();
    let catalog = match DomainCatalog::discover(&mut source, &DomainId::ALL) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    if catalog.is_empty() {
        println!("No domains could be enabled");
        return 1;
    }

    if json {
        let by_domain: BTreeMap<&str, Vec<&str>> = catalog
            .domain_names()
            .into_iter()
            .map(|name| {
                let counters = catalog
                    .domain(name)
                    .map(|d| d.counter_names())
                    .unwrap_or_default();
                (name, counters)
            })
            .collect();
        match serde_json::to_string_pretty(&by_domain) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                eprintln!("could not render catalog: {err}");
                return 1;
            }
        }
    } else {
        println!("Available domains: {}", catalog.domain_names().join(", "));
        for name in catalog.domain_names() {
            if let Some(domain) = catalog.domain(name) {
                println!("{name} counters: {}", domain.counter_names().join(", "));
            }
        }
    }

    if catalog.counter_count() == 0 {
        println!("No counters are available");
        return 1;
    }
    0
}
