//! Recent conversion history and the quiet-period capture that feeds it.

use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tasas_common::{constants, Currency};

/// A completed conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub from: Currency,
    pub to: Currency,
    pub amount_top: Decimal,
    pub amount_bot: Decimal,
    /// `from → to` rate used.
    pub rate: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Same conversion, ignoring when it was recorded.
    pub fn same_values(&self, other: &HistoryEntry) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.amount_top == other.amount_top
            && self.amount_bot == other.amount_bot
            && self.rate == other.rate
    }
}

/// Most-recent-first list of conversions with a fixed capacity.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Put `entry` at the head, evicting from the tail past capacity.
    ///
    /// Returns `false` and keeps the list as is when `entry` repeats the head.
    pub fn push(&mut self, entry: HistoryEntry) -> bool {
        if self.entries.front().is_some_and(|head| head.same_values(&entry)) {
            return false;
        }

        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        true
    }

    /// Most recent entry.
    pub fn head(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(constants::HISTORY_CAPACITY)
    }
}

/// A conversion waiting for its quiet period to elapse.
///
/// Each edit replaces the pending capture, which restarts the wait.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCapture {
    pub from: Currency,
    pub to: Currency,
    pub amount_top: Decimal,
    pub amount_bot: Decimal,
    pub rate: Decimal,
    /// When the capture may be committed.
    pub due_at: Instant,
}

impl PendingCapture {
    /// Whether the quiet period is over at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due_at
    }

    /// Turn the capture into a history entry stamped `timestamp`.
    pub fn into_entry(self, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            from: self.from,
            to: self.to,
            amount_top: self.amount_top,
            amount_bot: self.amount_bot,
            rate: self.rate,
            timestamp,
        }
    }
}
