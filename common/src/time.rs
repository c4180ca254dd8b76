//! Time utilities and constants for the Tasas monitor.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Timing constants.
pub mod constants {
    use super::Duration;

    /// Timeout for a single rate fetch (10 seconds).
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

    /// Interval between automatic refreshes (1 hour).
    pub const UPDATE_INTERVAL: Duration = Duration::from_secs(3600);

    /// Quiet period before a stable conversion is saved to history (1.2 seconds).
    pub const HISTORY_QUIET_PERIOD: Duration = Duration::from_millis(1200);

    /// Number of conversions kept in history.
    pub const HISTORY_CAPACITY: usize = 5;

    /// Number of entries kept in the activity log.
    pub const ACTIVITY_LOG_CAPACITY: usize = 50;
}

/// A timestamp (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Wall-clock `HH:MM:SS` used in the activity log.
pub fn clock_label(timestamp: Timestamp) -> String {
    timestamp.format("%H:%M:%S").to_string()
}
