//! atelier - Address book maintenance
//!
//! Loads settings, opens the database and restores the default-address
//! invariant of every stored address book.

use std::path::PathBuf;

use anyhow::Context;
use atelier::config::Settings;
use atelier::services::AddressService;
use atelier::storage::StorageLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => Settings::default_path()?,
    };
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("loading settings from {}", settings_path.display()))?;

    // RUST_LOG wins over the configured filter.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(settings = %settings_path.display(), "Starting atelier");

    let db_path = settings.storage.resolved_database_path();
    let storage = StorageLayer::new(&db_path)
        .await
        .with_context(|| format!("opening database {}", db_path.display()))?;

    let addresses = AddressService::from_settings(storage, &settings.addresses)
        .context("invalid address settings")?;
    let report = addresses.repair_all().await?;

    tracing::info!(
        scanned = report.scanned,
        repaired = report.repaired,
        conflicts = report.conflicts,
        "Maintenance complete"
    );
    Ok(())
}
