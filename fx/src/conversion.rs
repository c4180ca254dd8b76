//! Two-way calculator conversion engine.

use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tasas_common::{constants, format_grouped, now, parse_amount, Currency, RateSnapshot};

use crate::history::{History, HistoryEntry, PendingCapture};

/// Which amount field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bot,
}

/// Which currency selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    From,
    To,
}

/// Bolívars per unit for every calculator currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateTable {
    usdt: Decimal,
    bcv: Decimal,
    eur: Decimal,
}

impl RateTable {
    /// Build the table from a snapshot.
    pub fn from_snapshot(snapshot: &RateSnapshot) -> Self {
        Self {
            usdt: snapshot.rate_for(Currency::Usdt),
            bcv: snapshot.rate_for(Currency::Bcv),
            eur: snapshot.rate_for(Currency::Eur),
        }
    }

    /// Bolívars per unit of `currency`; zero when not loaded.
    pub fn rate(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Ves => Decimal::ONE,
            Currency::Usdt => self.usdt,
            Currency::Bcv => self.bcv,
            Currency::Eur => self.eur,
        }
    }

    /// Units of `to` per unit of `from`; zero if either side is unpriced.
    pub fn conversion_rate(&self, from: Currency, to: Currency) -> Decimal {
        let rate_from = self.rate(from);
        let rate_to = self.rate(to);
        if rate_from.is_zero() || rate_to.is_zero() {
            return Decimal::ZERO;
        }
        rate_from.checked_div(rate_to).unwrap_or(Decimal::ZERO)
    }
}

/// Convert `amount` from `from` into `to`, rounded for `to`.
///
/// `None` when a rate is missing or the result does not fit.
pub fn convert(amount: Decimal, from: Currency, to: Currency, table: &RateTable) -> Option<Decimal> {
    let rate = table.conversion_rate(from, to);
    if rate.is_zero() {
        return None;
    }
    amount.checked_mul(rate).map(|value| to.round(value))
}

/// The linked amount fields and currency selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionState {
    pub amount_top: String,
    pub amount_bot: String,
    pub from: Currency,
    pub to: Currency,
    /// The authoritative field; the other one is derived.
    pub last_edited: Side,
}

impl Default for ConversionState {
    fn default() -> Self {
        Self {
            amount_top: String::new(),
            amount_bot: String::new(),
            from: Currency::Usdt,
            to: Currency::Ves,
            last_edited: Side::Top,
        }
    }
}

/// Calculator configuration.
#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    /// Time an edit must stay unchanged before it is saved to history.
    pub quiet_period: Duration,
    /// Number of history entries kept.
    pub history_capacity: usize,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            quiet_period: constants::HISTORY_QUIET_PERIOD,
            history_capacity: constants::HISTORY_CAPACITY,
        }
    }
}

/// Keeps the two amount fields in sync with the current rates.
///
/// History capture is driven by the host: every edit schedules a
/// [`PendingCapture`], and [`Calculator::flush_due`] commits it once its
/// quiet period has passed.
#[derive(Debug, Clone)]
pub struct Calculator {
    state: ConversionState,
    table: RateTable,
    current_rate: Decimal,
    history: History,
    pending: Option<PendingCapture>,
    config: CalculatorConfig,
}

impl Calculator {
    /// Create a calculator over `snapshot` with default settings.
    pub fn new(snapshot: &RateSnapshot) -> Self {
        Self::with_config(snapshot, CalculatorConfig::default())
    }

    pub fn with_config(snapshot: &RateSnapshot, config: CalculatorConfig) -> Self {
        let table = RateTable::from_snapshot(snapshot);
        let mut calculator = Self {
            state: ConversionState::default(),
            table,
            current_rate: Decimal::ZERO,
            history: History::new(config.history_capacity),
            pending: None,
            config,
        };
        calculator.recompute();
        calculator
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    /// Rate from the `from` currency into the `to` currency; zero until both
    /// are priced.
    pub fn current_rate(&self) -> Decimal {
        self.current_rate
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// When the pending history capture becomes due, if one is scheduled.
    pub fn pending_due_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due_at)
    }

    /// Swap in a new snapshot and recompute the derived field.
    pub fn set_rates(&mut self, snapshot: &RateSnapshot) {
        self.table = RateTable::from_snapshot(snapshot);
        self.recompute();
    }

    /// Apply a keystroke to one amount field.
    ///
    /// Returns `false` and leaves the state untouched when `value` is not a
    /// valid entry for that field's currency.
    pub fn set_amount(&mut self, value: &str, side: Side) -> bool {
        let currency = match side {
            Side::Top => self.state.from,
            Side::Bot => self.state.to,
        };

        if !currency.accepts_input(value) {
            debug!(value, currency = %currency, "Rejected amount input");
            return false;
        }

        match side {
            Side::Top => self.state.amount_top = value.to_string(),
            Side::Bot => self.state.amount_bot = value.to_string(),
        }
        self.state.last_edited = side;
        self.recompute();
        true
    }

    /// Change one of the currency selectors.
    ///
    /// An amount the new currency would not accept keeps only its whole part.
    pub fn set_currency(&mut self, selector: Selector, currency: Currency) {
        let field = match selector {
            Selector::From => {
                self.state.from = currency;
                &mut self.state.amount_top
            }
            Selector::To => {
                self.state.to = currency;
                &mut self.state.amount_bot
            }
        };

        if !currency.accepts_input(field) {
            let whole: String = field.chars().take_while(|c| c.is_ascii_digit()).collect();
            debug!(
                amount = field.as_str(),
                whole = whole.as_str(),
                currency = %currency,
                "Amount truncated for new currency"
            );
            *field = whole;
        }
        self.recompute();
    }

    /// Exchange the currencies, carrying the bottom amount into the top field.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.state.from, &mut self.state.to);
        self.state.amount_top = std::mem::take(&mut self.state.amount_bot);
        self.state.last_edited = Side::Top;
        self.recompute();
    }

    /// Empty both fields and drop any pending capture.
    pub fn clear(&mut self) {
        self.state.amount_top.clear();
        self.state.amount_bot.clear();
        self.pending = None;
    }

    /// Restore a conversion from history.
    pub fn load_history_entry(&mut self, entry: &HistoryEntry) {
        self.state.from = entry.from;
        self.state.to = entry.to;
        self.state.amount_top = entry.amount_top.to_string();
        self.state.last_edited = Side::Top;
        self.recompute();
    }

    /// Commit the pending capture if its quiet period is over at `at`.
    ///
    /// Returns the entry added to history, if any.
    pub fn flush_due(&mut self, at: Instant) -> Option<HistoryEntry> {
        if !self.pending.as_ref().is_some_and(|p| p.is_due(at)) {
            return None;
        }

        let entry = self.pending.take()?.into_entry(now());
        if self.history.push(entry.clone()) {
            debug!(from = %entry.from, to = %entry.to, "Conversion saved to history");
            Some(entry)
        } else {
            None
        }
    }

    /// One-line description of the current conversion for copying.
    pub fn summary(&self) -> Option<String> {
        let top = parse_amount(&self.state.amount_top);
        let bot = parse_amount(&self.state.amount_bot);
        if top <= Decimal::ZERO || bot <= Decimal::ZERO {
            return None;
        }

        Some(format!(
            "{} {} son {} {}",
            format_grouped(top, 2),
            self.state.from,
            format_grouped(bot, 2),
            self.state.to
        ))
    }

    /// Re-derive the non-authoritative field and reschedule history capture.
    fn recompute(&mut self) {
        // Any edit cancels the capture scheduled by the previous one.
        self.pending = None;

        let rate = self.table.conversion_rate(self.state.from, self.state.to);
        self.current_rate = rate;

        let (source_text, target_currency) = match self.state.last_edited {
            Side::Top => (&self.state.amount_top, self.state.to),
            Side::Bot => (&self.state.amount_bot, self.state.from),
        };

        let derived = if rate.is_zero() || source_text.is_empty() {
            None
        } else {
            let amount = parse_amount(source_text);
            let raw = match self.state.last_edited {
                Side::Top => amount.checked_mul(rate),
                Side::Bot => amount.checked_div(rate),
            };
            raw.map(|value| target_currency.round(value))
        };

        let derived_text = derived.map(|v| v.to_string()).unwrap_or_default();
        match self.state.last_edited {
            Side::Top => self.state.amount_bot = derived_text,
            Side::Bot => self.state.amount_top = derived_text,
        }

        let top = parse_amount(&self.state.amount_top);
        let bot = parse_amount(&self.state.amount_bot);
        if top > Decimal::ZERO && bot > Decimal::ZERO {
            self.pending = Some(PendingCapture {
                from: self.state.from,
                to: self.state.to,
                amount_top: top,
                amount_bot: bot,
                rate,
                due_at: Instant::now() + self.config.quiet_period,
            });
        }
    }
}
