//! CLI for openjoule: list energy counters and record per-metric readings.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "openjoule")]
#[command(about = "Sample hardware energy counters into per-metric time series")]
#[command(version = openjoule_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available energy domains and their counters
    Scan {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record energy metrics for a fixed duration (or until Ctrl-C)
    Record {
        /// Comma-separated metric names, e.g. "RAPL:PKG0,RAPL:TOTAL"
        #[arg(long)]
        metrics: String,

        /// Comma-separated domain selection, or "ALL"
        #[arg(long, default_value = "ALL")]
        domains: String,

        /// Sampling interval in milliseconds
        #[arg(long, default_value = "50")]
        interval_ms: u64,

        /// Recording duration in seconds; 0 records until Ctrl-C
        #[arg(long, default_value = "10")]
        duration_s: u64,

        /// Write the collected readings to a JSON file
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Scan { json } => commands::scan::run(json),
        Commands::Record {
            metrics,
            domains,
            interval_ms,
            duration_s,
            output,
        } => commands::record::run(&metrics, &domains, interval_ms, duration_s, output.as_deref()),
    };
    std::process::exit(code);
}
