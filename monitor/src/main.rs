//! Tasas Monitor Binary
//!
//! Keeps the BCV, Euro and USDT rates fresh and cached on disk.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasas_common::clock_label;
use tasas_fx::{HttpRateSource, LogNotifier};
use tasas_monitor::{Host, MonitorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MonitorConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Tasas Monitor");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let source = Arc::new(HttpRateSource::new()?);
    let host = Arc::new(Host::new(config, source, Arc::new(LogNotifier)));

    if let Some(updated) = host.monitor().snapshot().last_update {
        info!(last_update = %clock_label(updated), "Serving cached rates");
    }

    // Set up graceful shutdown
    let host_clone = host.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Shutdown signal received");
        host_clone.stop();
    });

    host.start().await?;

    info!("Tasas Monitor shutdown complete");
    Ok(())
}
