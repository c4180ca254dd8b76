//! Rate change notifications.

use rust_decimal::Decimal;
use tracing::info;

use tasas_common::Currency;

/// A user-facing notification about a rate change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateNotification {
    /// Currency whose price changed.
    pub currency: Currency,
    /// New price in bolívars.
    pub price: Decimal,
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl RateNotification {
    /// Notification for a new official dollar rate.
    pub fn official(price: Decimal, icon: impl Into<String>) -> Self {
        Self {
            currency: Currency::Bcv,
            price,
            title: "Cambio Tasa BCV".to_string(),
            body: format!("La tasa oficial es ahora {} Bs.", two_places(price)),
            icon: icon.into(),
        }
    }

    /// Notification for a new peer-to-peer USDT rate.
    pub fn peer(price: Decimal, icon: impl Into<String>) -> Self {
        Self {
            currency: Currency::Usdt,
            price,
            title: "Cambio Tasa USDT".to_string(),
            body: format!("El USDT está ahora en {} Bs.", two_places(price)),
            icon: icon.into(),
        }
    }
}

fn two_places(price: Decimal) -> Decimal {
    Currency::Bcv.round(price)
}

/// Sink for rate change notifications.
pub trait Notifier: Send + Sync {
    /// Deliver one notification. Delivery failures are the notifier's concern.
    fn notify(&self, notification: &RateNotification);
}

/// Notifier that writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &RateNotification) {
        info!(
            currency = %notification.currency,
            price = %notification.price,
            title = %notification.title,
            body = %notification.body,
            "Rate notification"
        );
    }
}

/// Notifier that keeps every notification for inspection in tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: parking_lot::Mutex<Vec<RateNotification>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications delivered so far.
    pub fn sent(&self) -> Vec<RateNotification> {
        self.sent.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &RateNotification) {
        self.sent.lock().push(notification.clone());
    }
}
