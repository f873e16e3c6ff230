mod config;

use anyhow::{Context, Result};
use config::FleetConfig;
use loadmon_collector::probe::SshProbe;
use loadmon_storage::export;
use loadmon_storage::store::SqliteSampleStore;
use loadmon_storage::SampleStore;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  loadmon poll [config.toml]      Poll every configured host once");
    eprintln!("  loadmon export [config.toml]    Write one CSV per host into the export dir");
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("loadmon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("config/loadmon.toml");

    match args.get(1).map(|s| s.as_str()) {
        Some("poll") => run_poll(config_path),
        Some("export") => run_export(config_path),
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            anyhow::bail!("expected a subcommand: poll or export")
        }
    }
}

fn open_store(config: &FleetConfig) -> Result<SqliteSampleStore> {
    SqliteSampleStore::open(Path::new(&config.database_path))
        .with_context(|| format!("Failed to open database '{}'", config.database_path))
}

/// Polls every configured host once. Per-host failures end up in the
/// report, not the exit status: the batch itself always succeeds.
fn run_poll(config_path: &str) -> Result<()> {
    let config = FleetConfig::load(config_path)
        .with_context(|| format!("Failed to load config '{config_path}'"))?;
    let store = open_store(&config)?;

    let mut hosts = Vec::with_capacity(config.hosts.len());
    for entry in &config.hosts {
        hosts.push(store.register_host(&entry.alias, &entry.address)?);
    }

    let probe = SshProbe::new(config.remote_user.as_str());
    let report = loadmon_collector::collect(&probe, &store, &hosts);

    for failure in &report.failed {
        tracing::warn!(host = %failure.alias, error = %failure.error, "Host was not sampled");
    }
    println!(
        "{} hosts polled, {} failed",
        report.attempted(),
        report.failed.len()
    );
    Ok(())
}

fn run_export(config_path: &str) -> Result<()> {
    let config = FleetConfig::load(config_path)
        .with_context(|| format!("Failed to load config '{config_path}'"))?;
    let store = open_store(&config)?;

    let written = export::export_all(&store, Path::new(&config.export_dir))?;
    println!("{} files written to {}", written.len(), config.export_dir);
    Ok(())
}
