//! Rate monitor: owns the published snapshot and schedules refreshes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, instrument, warn};

use tasas_common::{clock_label, constants, now, RateSnapshot};

use crate::engine::{CycleReport, RateEngine};
use crate::notify::Notifier;
use crate::store::SnapshotStore;

/// Why a refresh was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// No cached snapshot at startup.
    Startup,
    /// Requested by the user.
    Manual,
    /// Fired by the update interval.
    Scheduled,
}

impl RefreshTrigger {
    fn banner(&self) -> &'static str {
        match self {
            RefreshTrigger::Startup => "--- Carga Inicial ---",
            RefreshTrigger::Manual => "--- Actualización Manual ---",
            RefreshTrigger::Scheduled => "--- Auto-Refresco Periódico ---",
        }
    }
}

/// Severity of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Info,
    Success,
    Error,
}

/// One line of the user-facing activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    /// `HH:MM:SS` wall-clock time.
    pub time: String,
    pub message: String,
    pub level: ActivityLevel,
}

/// Bounded activity log; the oldest lines are dropped first.
#[derive(Debug)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityEntry>>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a line.
    pub fn push(&self, message: impl Into<String>, level: ActivityLevel) {
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(ActivityEntry {
            time: clock_label(now()),
            message: message.into(),
            level,
        });
    }

    /// Lines in chronological order.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().iter().cloned().collect()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(constants::ACTIVITY_LOG_CAPACITY)
    }
}

/// Clears the in-flight flag when a cycle ends, even if it is cancelled.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the current snapshot and runs reconciliation cycles.
///
/// The snapshot is swapped as a whole behind a lock at the end of a cycle, so
/// readers always see either the old or the new snapshot.
pub struct RateMonitor {
    engine: RateEngine,
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    current: RwLock<Option<Arc<RateSnapshot>>>,
    in_flight: AtomicBool,
    offline: AtomicBool,
    notifications_enabled: AtomicBool,
    activity: ActivityLog,
}

impl RateMonitor {
    /// Create a monitor, seeding the snapshot from `store`.
    pub fn new(
        engine: RateEngine,
        store: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let cached = store.get().map(Arc::new);
        if cached.is_some() {
            info!("Loaded cached rate snapshot");
        }

        Self {
            engine,
            store,
            notifier,
            current: RwLock::new(cached),
            in_flight: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            notifications_enabled: AtomicBool::new(false),
            activity: ActivityLog::default(),
        }
    }

    /// Current snapshot; all entries unpriced until the first cycle completes.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.current
            .read()
            .clone()
            .unwrap_or_else(|| Arc::new(RateSnapshot::empty()))
    }

    /// Whether a snapshot was cached or fetched.
    pub fn has_snapshot(&self) -> bool {
        self.current.read().is_some()
    }

    /// Whether the last cycle could not reach any official source.
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Acquire)
    }

    /// Whether a cycle is running.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled.load(Ordering::Acquire)
    }

    /// Turn change notifications on or off.
    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.notifications_enabled.store(enabled, Ordering::Release);
        if enabled {
            self.activity
                .push("Permiso de notificaciones concedido.", ActivityLevel::Success);
        }
    }

    /// Activity log lines, oldest first.
    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.activity.entries()
    }

    /// Run one reconciliation cycle and publish its snapshot.
    ///
    /// Returns `None` without fetching anything when another cycle is still
    /// running.
    #[instrument(skip(self))]
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Option<CycleReport> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Refresh skipped, a cycle is already running");
            return None;
        }
        let _guard = InFlight(&self.in_flight);

        self.activity.push(trigger.banner(), ActivityLevel::Info);

        let previous = self.current.read().clone();
        let report = self
            .engine
            .reconcile(previous.as_deref(), self.notifications_enabled())
            .await;

        for attempt in &report.attempts {
            let level = if attempt.outcome.is_success() {
                ActivityLevel::Success
            } else {
                ActivityLevel::Error
            };
            self.activity.push(
                format!("{}: {}", attempt.strategy, attempt.outcome),
                level,
            );
        }

        if report.offline {
            self.activity
                .push("Todas las fuentes de BCV fallaron.", ActivityLevel::Error);
        }

        *self.current.write() = Some(Arc::new(report.snapshot.clone()));
        self.offline.store(report.offline, Ordering::Release);

        if let Err(e) = self.store.put(&report.snapshot) {
            error!(error = %e, code = e.error_code(), "Failed to persist snapshot");
            self.activity
                .push(format!("No se pudo guardar el caché: {}", e), ActivityLevel::Error);
        }

        for notification in &report.notifications {
            self.notifier.notify(notification);
        }

        self.activity
            .push("Actualización completada.", ActivityLevel::Success);

        Some(report)
    }

    /// Refresh at startup when nothing is cached, then every `every` until
    /// `shutdown` changes.
    ///
    /// Scheduled cycles run as separate tasks; one that fires while a cycle
    /// is still running is skipped by the in-flight guard.
    pub async fn run(self: Arc<Self>, every: Duration, mut shutdown: watch::Receiver<bool>) {
        if !self.has_snapshot() {
            tokio::select! {
                _ = self.refresh(RefreshTrigger::Startup) => {}
                _ = shutdown.changed() => {
                    info!("Rate monitor stopping before the first refresh completed");
                    return;
                }
            }
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let monitor = self.clone();
                    tokio::spawn(async move {
                        monitor.refresh(RefreshTrigger::Scheduled).await;
                    });
                }
                _ = shutdown.changed() => {
                    info!("Rate monitor stopping");
                    break;
                }
            }
        }
    }
}
