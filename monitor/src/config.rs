//! Monitor configuration.

use std::path::PathBuf;
use std::time::Duration;

use tasas_common::constants;
use tasas_fx::{RateEngineConfig, DEFAULT_CACHE_KEY};

/// Main monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between scheduled refreshes.
    pub update_interval: Duration,
    /// Directory holding the snapshot cache.
    pub snapshot_dir: PathBuf,
    /// Cache key; the file is `<snapshot_dir>/<cache_key>.json`.
    pub cache_key: String,
    /// Send change notifications.
    pub notifications_enabled: bool,
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Rate engine configuration.
    pub engine: RateEngineConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval: constants::UPDATE_INTERVAL,
            snapshot_dir: PathBuf::from("data"),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            notifications_enabled: true,
            log_level: "info".to_string(),
            engine: RateEngineConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            engine: RateEngineConfig::from_env(),
            ..Self::default()
        };

        if let Ok(secs) = std::env::var("TASAS_UPDATE_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.update_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(path) = std::env::var("TASAS_SNAPSHOT_PATH") {
            config.snapshot_dir = PathBuf::from(path);
        }

        if let Ok(key) = std::env::var("TASAS_CACHE_KEY") {
            config.cache_key = key;
        }

        if let Ok(flag) = std::env::var("TASAS_NOTIFICATIONS") {
            config.notifications_enabled = parse_flag(&flag);
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.update_interval.is_zero() {
            return Err("Update interval cannot be 0".to_string());
        }

        if self.update_interval <= self.engine.fetch_timeout {
            return Err("Update interval must be longer than the fetch timeout".to_string());
        }

        if self.cache_key.is_empty() {
            return Err("Cache key cannot be empty".to_string());
        }

        self.engine.validate()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
