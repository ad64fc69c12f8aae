#![doc = include_str!("../README.md")]

mod driver;

use clap::Parser;
use driver::config::{CliArgs, RunConfig};
use driver::run::run;
use driver::telemetry::init_telemetry;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let report = run(&config)?;
    tracing::info!(
        group_id = report.identity.group_id(),
        node_id = report.identity.node_id(),
        total = report.total,
        unique = report.unique,
        elapsed_ms = report.elapsed.as_millis() as u64,
        ids_per_sec = report.ids_per_sec(),
        "generation finished"
    );

    if report.unique != report.total {
        anyhow::bail!(
            "{} duplicate ids out of {}",
            report.total - report.unique,
            report.total
        );
    }
    Ok(())
}

fn log_startup_info(config: &RunConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting generation with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting generation on {} threads, {} ids each",
            config.threads,
            config.ids_per_thread
        );
    }
}
