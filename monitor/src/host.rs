//! Wiring between the configuration and the rate monitor.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use tasas_fx::{
    JsonFileStore, Notifier, RateEngine, RateMonitor, RateSource, SnapshotStore,
};

use crate::config::MonitorConfig;

/// Headless monitor host.
pub struct Host {
    config: MonitorConfig,
    store: Arc<JsonFileStore>,
    monitor: Arc<RateMonitor>,
    shutdown_tx: watch::Sender<bool>,
}

impl Host {
    /// Build the engine, the snapshot store and the monitor from `config`.
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn RateSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store = Arc::new(JsonFileStore::new(&config.snapshot_dir, &config.cache_key));
        let engine = RateEngine::new(source, config.engine.clone());
        let monitor = Arc::new(RateMonitor::new(
            engine,
            store.clone() as Arc<dyn SnapshotStore>,
            notifier,
        ));

        if config.notifications_enabled {
            monitor.set_notifications_enabled(true);
        }

        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            store,
            monitor,
            shutdown_tx,
        }
    }

    pub fn monitor(&self) -> &Arc<RateMonitor> {
        &self.monitor
    }

    /// File the snapshot is persisted to.
    pub fn snapshot_path(&self) -> &Path {
        self.store.path()
    }

    /// Start the refresh loop in the background.
    pub fn start(&self) -> JoinHandle<()> {
        info!(
            interval_secs = self.config.update_interval.as_secs(),
            snapshot = %self.snapshot_path().display(),
            "Starting rate monitor"
        );

        let monitor = self.monitor.clone();
        let every = self.config.update_interval;
        let shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move { monitor.run(every, shutdown).await })
    }

    /// Signal the refresh loop to stop.
    pub fn stop(&self) {
        info!("Stopping rate monitor");
        let _ = self.shutdown_tx.send(true);
    }
}
