//! # MLBF Runtime
//!
//! Entry point for the blocklist generation process.

use std::sync::Arc;

use anyhow::{Context, Result};
use mlbf_blocklist::Metrics;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mlbf_runtime::config::{config_path_from_env, RuntimeConfig};
use mlbf_runtime::orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_env();
    let config = match &config_path {
        Some(path) => RuntimeConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => RuntimeConfig::default(),
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &config_path {
        Some(path) => info!(config = %path.display(), "Starting MLBF runtime"),
        None => warn!("No config file given, using defaults"),
    }
    info!(
        source_id = %config.source_id,
        collection = %config.collection,
        interval_secs = config.interval.as_secs(),
        target_fpr = config.filter.target_fpr,
        "Configuration loaded"
    );

    orchestrator::import_legacy(&config).await?;

    let metrics = Arc::new(Metrics::new());
    let orchestrator = Arc::new(orchestrator::from_config(&config, Arc::clone(&metrics)).await?);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&orchestrator).run(config.interval, shutdown_rx));

    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);
    handle.await.context("generation loop panicked")?;

    let snapshot = metrics.snapshot();
    info!(
        bases_built = snapshot.bases_built,
        stashes_published = snapshot.stashes_published,
        cycles_skipped = snapshot.cycles_skipped,
        cycles_failed = snapshot.cycles_failed,
        "MLBF runtime stopped"
    );
    Ok(())
}
