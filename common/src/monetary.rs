//! Currencies, amount parsing and the rounding policy of the calculator.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TasasError;

/// Currencies the calculator can convert between.
///
/// Every rate is expressed in bolívars per unit, so `Ves` is the pivot with a
/// fixed rate of 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Venezuelan bolívar.
    Ves,
    /// Tether at the peer-to-peer market rate.
    Usdt,
    /// US dollar at the official central bank rate.
    Bcv,
    /// Euro at the official central bank rate.
    Eur,
}

impl Currency {
    /// All calculator currencies in display order.
    pub const ALL: [Currency; 4] = [Currency::Ves, Currency::Usdt, Currency::Bcv, Currency::Eur];

    /// Get the currency code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Ves => "VES",
            Currency::Usdt => "USDT",
            Currency::Bcv => "BCV",
            Currency::Eur => "EUR",
        }
    }

    /// Short label shown next to amounts.
    pub fn label(&self) -> &'static str {
        match self {
            Currency::Ves => "Bs.",
            Currency::Usdt => "USDT",
            Currency::Bcv => "$ BCV",
            Currency::Eur => "Euro",
        }
    }

    /// Decimal places kept for amounts in this currency.
    ///
    /// Bolívars are handled as whole bills.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::Ves => 0,
            _ => 2,
        }
    }

    /// Whether this is the pivot currency.
    pub fn is_pivot(&self) -> bool {
        matches!(self, Currency::Ves)
    }

    /// Round a computed amount with the policy for this currency.
    ///
    /// Bolívar amounts are rounded up to the next whole bill so a cash quote is
    /// never short. Everything else is rounded to exactly two decimals.
    pub fn round(&self, value: Decimal) -> Decimal {
        match self {
            Currency::Ves => {
                let mut rounded = value.ceil();
                rounded.rescale(self.decimal_places());
                rounded
            }
            _ => {
                let places = self.decimal_places();
                let mut rounded =
                    value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
                rounded.rescale(places);
                rounded
            }
        }
    }

    /// Check whether `text` is an acceptable amount entry for this currency.
    ///
    /// Commas count as decimal separators. Bolívar fields take digits only;
    /// other fields take at most two fractional digits. Partial entries such as
    /// `""` or `"12."` are accepted so the user can keep typing.
    pub fn accepts_input(&self, text: &str) -> bool {
        if self.is_pivot() {
            return text.chars().all(|c| c.is_ascii_digit());
        }

        let normalized = text.replace(',', ".");
        let (whole, fraction) = match normalized.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (normalized.as_str(), None),
        };

        if !whole.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }

        match fraction {
            Some(fraction) => fraction.len() <= 2 && fraction.chars().all(|c| c.is_ascii_digit()),
            None => true,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = TasasError;

    /// Parse a currency code. `USD` names the official dollar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VES" | "BS" => Ok(Currency::Ves),
            "USDT" => Ok(Currency::Usdt),
            "BCV" | "USD" => Ok(Currency::Bcv),
            "EUR" | "EURO" => Ok(Currency::Eur),
            other => Err(TasasError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Parse a decimal that may use a comma separator or scientific notation.
///
/// Returns `None` for text that is not a number.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Parse an amount field, treating empty or unparseable text as zero.
pub fn parse_amount(text: &str) -> Decimal {
    parse_decimal(text).unwrap_or(Decimal::ZERO)
}

/// Format an amount with Venezuelan grouping: `1.234.567,89`.
pub fn format_grouped(value: Decimal, places: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);

    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (text, None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{sign}{grouped},{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Format an amount in its currency: `Bs. 1.234,00` or `12,50 USDT`.
pub fn format_money(value: Decimal, currency: Currency) -> String {
    match currency {
        Currency::Ves => format!("{} {}", currency.label(), format_grouped(value, 2)),
        other => format!("{} {}", format_grouped(value, 2), other.code()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_parse() {
        assert_eq!("usdt".parse::<Currency>().unwrap(), Currency::Usdt);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Bcv);
        assert_eq!("Euro".parse::<Currency>().unwrap(), Currency::Eur);
        for currency in Currency::ALL {
            assert_eq!(currency.code().parse::<Currency>().unwrap(), currency);
        }
        assert!(matches!(
            "GBP".parse::<Currency>(),
            Err(TasasError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn test_input_validation_non_pivot() {
        assert!(Currency::Usdt.accepts_input("12.34"));
        assert!(Currency::Usdt.accepts_input("12,34"));
        assert!(Currency::Usdt.accepts_input("12."));
        assert!(Currency::Usdt.accepts_input(""));
        assert!(!Currency::Usdt.accepts_input("12.345"));
        assert!(!Currency::Eur.accepts_input("1.2.3"));
        assert!(!Currency::Bcv.accepts_input("12a"));
        assert!(!Currency::Bcv.accepts_input("-5"));
    }

    #[test]
    fn test_input_validation_pivot() {
        assert!(Currency::Ves.accepts_input("12"));
        assert!(Currency::Ves.accepts_input(""));
        assert!(!Currency::Ves.accepts_input("12.5"));
        assert!(!Currency::Ves.accepts_input("12,5"));
    }

    #[test]
    fn test_rounding_policy() {
        assert_eq!(Currency::Ves.round(dec!(3650.01)), dec!(3651));
        assert_eq!(Currency::Ves.round(dec!(3650)), dec!(3650));
        assert_eq!(Currency::Usdt.round(dec!(2.735)).to_string(), "2.74");
        assert_eq!(Currency::Eur.round(dec!(12)).to_string(), "12.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12,5"), dec!(12.5));
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("."), Decimal::ZERO);
        assert_eq!(parse_decimal("1e2"), Some(dec!(100)));
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(dec!(1234567.891), 2), "1.234.567,89");
        assert_eq!(format_grouped(dec!(12), 2), "12,00");
        assert_eq!(format_grouped(dec!(999), 0), "999");
        assert_eq!(format_money(dec!(3650), Currency::Ves), "Bs. 3.650,00");
        assert_eq!(format_money(dec!(100), Currency::Usdt), "100,00 USDT");
    }

    proptest! {
        #[test]
        fn prop_pivot_rounding_is_integral(cents in 0i64..100_000_000) {
            let value = Decimal::new(cents, 3);
            let rounded = Currency::Ves.round(value);
            prop_assert_eq!(rounded.fract(), Decimal::ZERO);
            prop_assert!(rounded >= value);
            prop_assert!(rounded - value < Decimal::ONE);
        }

        #[test]
        fn prop_non_pivot_rounding_has_two_places(units in 0i64..1_000_000_000) {
            let value = Decimal::new(units, 5);
            let rounded = Currency::Usdt.round(value);
            prop_assert_eq!(rounded.scale(), 2);
            prop_assert!((rounded - value).abs() <= dec!(0.005));
        }
    }
}
