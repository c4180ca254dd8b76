//! Tasas Monitor
//!
//! Headless host that keeps the rate snapshot fresh and persisted.

pub mod config;
pub mod host;

pub use config::MonitorConfig;
pub use host::Host;
