//! Rate snapshot types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::monetary::Currency;

/// Label used for entries that have never been fetched.
pub const UNKNOWN_SOURCE: &str = "---";

/// Where a rate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateType {
    /// Central bank reference rate.
    Official,
    /// Peer-to-peer market rate.
    #[serde(alias = "p2p")]
    Peer,
    /// Not fetched yet.
    #[default]
    None,
}

/// One priced currency inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    /// Bolívars per unit. Never negative.
    pub price: Decimal,
    /// Human-readable source label.
    pub source: String,
    /// Signed percent change against the previous snapshot.
    pub change: Decimal,
    /// Rate family.
    #[serde(rename = "type", default)]
    pub rate_type: RateType,
}

impl RateEntry {
    /// Entry for a currency that has not been fetched yet.
    pub fn empty() -> Self {
        Self {
            price: Decimal::ZERO,
            source: UNKNOWN_SOURCE.to_string(),
            change: Decimal::ZERO,
            rate_type: RateType::None,
        }
    }
}

impl Default for RateEntry {
    fn default() -> Self {
        Self::empty()
    }
}

/// The full set of rates shown to the user.
///
/// A snapshot is replaced as a whole at the end of every reconciliation cycle;
/// nothing mutates a published snapshot in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    /// USDT at the peer-to-peer rate.
    #[serde(default)]
    pub usdt: RateEntry,
    /// Official dollar rate.
    #[serde(default)]
    pub bcv: RateEntry,
    /// Official euro rate.
    #[serde(default)]
    pub euro: RateEntry,
    /// When the snapshot was last refreshed.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl RateSnapshot {
    /// Snapshot with every entry unpriced.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bolívars per unit of `currency`. Zero when the rate is not loaded yet.
    pub fn rate_for(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Ves => Decimal::ONE,
            Currency::Usdt => self.usdt.price,
            Currency::Bcv => self.bcv.price,
            Currency::Eur => self.euro.price,
        }
    }
}

/// Percent change from `old` to `new`.
///
/// Zero unless both prices are positive, or when the ratio does not fit.
pub fn percent_change(new: Decimal, old: Decimal) -> Decimal {
    if new <= Decimal::ZERO || old <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    new.checked_sub(old)
        .and_then(|delta| delta.checked_div(old))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(dec!(36.50), dec!(36.00)).round_dp(2), dec!(1.39));
        assert_eq!(percent_change(dec!(36.00), dec!(40.00)), dec!(-10));
        assert_eq!(percent_change(dec!(36.50), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percent_change(Decimal::ZERO, dec!(36.00)), Decimal::ZERO);
    }

    #[test]
    fn test_percent_change_out_of_range_is_zero() {
        let tiny = dec!(0.0000000000000000000000000001);
        assert_eq!(percent_change(dec!(1000000), tiny), Decimal::ZERO);
    }

    #[test]
    fn test_rate_for() {
        let mut snapshot = RateSnapshot::empty();
        snapshot.usdt.price = dec!(40.5);
        snapshot.bcv.price = dec!(36.5);

        assert_eq!(snapshot.rate_for(Currency::Ves), Decimal::ONE);
        assert_eq!(snapshot.rate_for(Currency::Usdt), dec!(40.5));
        assert_eq!(snapshot.rate_for(Currency::Bcv), dec!(36.5));
        assert_eq!(snapshot.rate_for(Currency::Eur), Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_reads_cached_layout() {
        let json = r#"{
            "usdt": {"price": 40.25, "source": "Binance P2P (Directo)", "type": "p2p", "change": 0.5},
            "bcv": {"price": 36.5, "source": "BCV Oficial (Privado)", "change": 1.2},
            "euro": {"price": 39.8, "source": "Euro Oficial (Privado)", "change": 0},
            "lastUpdate": "2024-05-01T12:00:00.000Z"
        }"#;

        let snapshot: RateSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.usdt.rate_type, RateType::Peer);
        assert_eq!(snapshot.bcv.rate_type, RateType::None);
        assert_eq!(snapshot.bcv.price, dec!(36.5));
        assert!(snapshot.last_update.is_some());
    }

    #[test]
    fn test_snapshot_serde_round_trip() {
        let mut snapshot = RateSnapshot::empty();
        snapshot.bcv = RateEntry {
            price: dec!(36.5),
            source: "BCV Oficial (Privado)".to_string(),
            change: dec!(1.39),
            rate_type: RateType::Official,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"lastUpdate\""));
        assert!(json.contains("\"type\":\"official\""));

        let back: RateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
