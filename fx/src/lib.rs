//! Tasas FX Engine
//!
//! Rate acquisition and conversion for the Bolívar, BCV dollar, Euro and USDT.
//!
//! # Features
//!
//! - Tiered fallback across official rate endpoints and peer-market strategies
//! - Change detection with notifications
//! - Snapshot persistence and a periodic refresh monitor
//! - Two-way calculator with currency-specific rounding and recent history
//! - Quotes for chat commands and payment share links
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tasas_fx::{Calculator, HttpRateSource, RateEngine, RateEngineConfig, Side};
//!
//! let engine = RateEngine::new(Arc::new(HttpRateSource::new()?), RateEngineConfig::default());
//! let report = engine.reconcile(None, false).await;
//!
//! let mut calculator = Calculator::new(&report.snapshot);
//! calculator.set_amount("100", Side::Top);
//! println!("{}", calculator.state().amount_bot);
//! ```

pub mod chat;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod history;
pub mod monitor;
pub mod notify;
pub mod payload;
pub mod provider;
pub mod share;
pub mod store;

pub use chat::{ChatCommand, ChatIntent, ChatOutcome, ChatQuote};
pub use config::{OfficialTier, PeerStrategy, RateEngineConfig};
pub use conversion::{convert, Calculator, CalculatorConfig, ConversionState, RateTable, Selector, Side};
pub use engine::{CycleReport, RateEngine};
pub use error::{RateError, RateFamily, RateResult};
pub use history::{History, HistoryEntry, PendingCapture};
pub use monitor::{ActivityEntry, ActivityLevel, ActivityLog, RateMonitor, RefreshTrigger};
pub use notify::{LogNotifier, Notifier, RateNotification};
pub use provider::{AttemptOutcome, FetchAttempt, HttpRateSource, RateSource};
pub use share::{payment_message, whatsapp_link, AccountKind, PaymentAccount, PaymentAmount};
pub use store::{JsonFileStore, MemorySnapshotStore, SnapshotStore, DEFAULT_CACHE_KEY};

#[cfg(any(test, feature = "test-utils"))]
pub use notify::RecordingNotifier;
#[cfg(any(test, feature = "test-utils"))]
pub use provider::{MockRateSource, MockResponse};
