//! Quotes for commands extracted by the conversational front end.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tasas_common::{Currency, RateSnapshot};

use crate::conversion::{Calculator, RateTable};

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatIntent {
    #[default]
    Calcular,
    Invertir,
}

/// Structured command as returned by the language model.
///
/// Every field is optional; models leave out whatever they did not hear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatCommand {
    pub intent: ChatIntent,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub target_currency: Option<String>,
    pub client_name: Option<String>,
}

/// A resolved quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuote {
    pub original_amount: Decimal,
    pub original_source: Currency,
    pub result_amount: Decimal,
    pub target_currency: Currency,
    pub rate_used: Decimal,
    pub rate_name: String,
    pub client_name: Option<String>,
}

/// Result of handling a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Quote(ChatQuote),
    /// The calculator currencies were swapped.
    Swapped,
    /// No usable amount or currency in the command.
    NotUnderstood,
    /// One of the rates involved has not been loaded.
    RatesUnavailable,
}

impl ChatOutcome {
    /// Reply shown when the command could not be used.
    pub fn fallback_message(&self) -> Option<&'static str> {
        match self {
            ChatOutcome::NotUnderstood => Some("No entendí el monto. Intenta \"100 USDT a BCV\"."),
            ChatOutcome::RatesUnavailable => Some("Las tasas aún no están disponibles."),
            _ => None,
        }
    }
}

/// Target assumed when the command names only a source.
pub fn infer_target(source: Currency) -> Currency {
    match source {
        Currency::Usdt => Currency::Bcv,
        Currency::Bcv => Currency::Usdt,
        Currency::Eur => Currency::Ves,
        Currency::Ves => Currency::Bcv,
    }
}

/// Display name for the rate between two currencies.
pub fn rate_name(from: Currency, to: Currency) -> String {
    let name = match (from, to) {
        (a, b) if a == b => "Mismo valor",
        (Currency::Usdt, Currency::Bcv) => "Brecha (USDT → BCV)",
        (Currency::Bcv, Currency::Usdt) => "Brecha (BCV → USDT)",
        (Currency::Bcv, Currency::Eur) => "Dólar a Euro",
        (Currency::Eur, Currency::Bcv) => "Euro a Dólar",
        (Currency::Usdt, Currency::Ves) => "Tasa USDT",
        (Currency::Eur, Currency::Ves) => "Tasa Euro",
        (Currency::Bcv, Currency::Ves) => "Tasa BCV",
        _ => return format!("{} → {}", from, to),
    };
    name.to_string()
}

/// Resolve `command` against `snapshot`.
pub fn quote(command: &ChatCommand, snapshot: &RateSnapshot) -> ChatOutcome {
    let Some(amount) = command.amount.filter(|a| *a > Decimal::ZERO) else {
        return ChatOutcome::NotUnderstood;
    };

    let source = match command.currency.as_deref() {
        Some(code) => match code.parse::<Currency>() {
            Ok(currency) => currency,
            Err(_) => return ChatOutcome::NotUnderstood,
        },
        None => Currency::Bcv,
    };

    let target = match command.target_currency.as_deref() {
        Some(code) => match code.parse::<Currency>() {
            Ok(currency) => currency,
            Err(_) => return ChatOutcome::NotUnderstood,
        },
        None => infer_target(source),
    };

    let table = RateTable::from_snapshot(snapshot);
    let rate = if source == target {
        Decimal::ONE
    } else {
        table.conversion_rate(source, target)
    };
    if rate.is_zero() {
        debug!(%source, %target, "Chat quote without loaded rates");
        return ChatOutcome::RatesUnavailable;
    }

    let Some(result) = amount.checked_mul(rate).map(|v| target.round(v)) else {
        return ChatOutcome::NotUnderstood;
    };

    ChatOutcome::Quote(ChatQuote {
        original_amount: amount,
        original_source: source,
        result_amount: result,
        target_currency: target,
        rate_used: rate,
        rate_name: rate_name(source, target),
        client_name: command.client_name.clone().filter(|n| !n.trim().is_empty()),
    })
}

/// Handle `command`, swapping `calculator` for an `invertir` intent.
pub fn handle(
    command: &ChatCommand,
    snapshot: &RateSnapshot,
    calculator: Option<&mut Calculator>,
) -> ChatOutcome {
    if command.intent == ChatIntent::Invertir {
        if let Some(calculator) = calculator {
            calculator.swap();
            return ChatOutcome::Swapped;
        }
    }
    quote(command, snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::Side;
    use rust_decimal_macros::dec;

    fn snapshot() -> RateSnapshot {
        let mut snapshot = RateSnapshot::empty();
        snapshot.usdt.price = dec!(40.00);
        snapshot.bcv.price = dec!(36.50);
        snapshot.euro.price = dec!(39.80);
        snapshot
    }

    fn command(json: &str) -> ChatCommand {
        serde_json::from_str(json).unwrap()
    }

    fn expect_quote(outcome: ChatOutcome) -> ChatQuote {
        match outcome {
            ChatOutcome::Quote(quote) => quote,
            other => panic!("expected quote, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_model_output() {
        let cmd = command(
            r#"{"intent":"calcular","amount":100,"currency":"USDT","targetCurrency":"VES","clientName":"Ana"}"#,
        );
        assert_eq!(cmd.intent, ChatIntent::Calcular);
        assert_eq!(cmd.amount, Some(dec!(100)));
        assert_eq!(cmd.target_currency.as_deref(), Some("VES"));
        assert_eq!(cmd.client_name.as_deref(), Some("Ana"));

        let sparse = command(r#"{"amount":"12.5"}"#);
        assert_eq!(sparse.intent, ChatIntent::Calcular);
        assert_eq!(sparse.amount, Some(dec!(12.5)));
        assert!(sparse.currency.is_none());
    }

    #[test]
    fn test_usdt_to_ves() {
        let quote = expect_quote(quote(
            &command(r#"{"amount":100,"currency":"USDT","targetCurrency":"VES"}"#),
            &snapshot(),
        ));
        assert_eq!(quote.result_amount, dec!(4000));
        assert_eq!(quote.rate_name, "Tasa USDT");
    }

    #[test]
    fn test_target_inference() {
        let q = expect_quote(quote(&command(r#"{"amount":100,"currency":"USDT"}"#), &snapshot()));
        assert_eq!(q.target_currency, Currency::Bcv);
        assert_eq!(q.rate_name, "Brecha (USDT → BCV)");
        // 100 * 40 / 36.5 = 109.589...
        assert_eq!(q.result_amount, dec!(109.59));

        let q = expect_quote(quote(&command(r#"{"amount":10,"currency":"USD"}"#), &snapshot()));
        assert_eq!(q.original_source, Currency::Bcv);
        assert_eq!(q.target_currency, Currency::Usdt);
        assert_eq!(q.rate_name, "Brecha (BCV → USDT)");

        let q = expect_quote(quote(&command(r#"{"amount":10,"currency":"EUR"}"#), &snapshot()));
        assert_eq!(q.target_currency, Currency::Ves);
        assert_eq!(q.result_amount, dec!(398));
        assert_eq!(q.rate_name, "Tasa Euro");
    }

    #[test]
    fn test_source_defaults_to_official_dollar() {
        let q = expect_quote(quote(&command(r#"{"amount":10,"targetCurrency":"VES"}"#), &snapshot()));
        assert_eq!(q.original_source, Currency::Bcv);
        assert_eq!(q.result_amount, dec!(365));
        assert_eq!(q.rate_name, "Tasa BCV");
    }

    #[test]
    fn test_same_currency() {
        let q = expect_quote(quote(
            &command(r#"{"amount":"7.5","currency":"EUR","targetCurrency":"EURO"}"#),
            &snapshot(),
        ));
        assert_eq!(q.rate_used, Decimal::ONE);
        assert_eq!(q.result_amount, dec!(7.50));
        assert_eq!(q.rate_name, "Mismo valor");
    }

    #[test]
    fn test_missing_amount_not_understood() {
        let outcome = quote(&command(r#"{"currency":"USDT"}"#), &snapshot());
        assert_eq!(outcome, ChatOutcome::NotUnderstood);
        assert!(outcome.fallback_message().is_some());

        let outcome = quote(&command(r#"{"amount":5,"currency":"GBP"}"#), &snapshot());
        assert_eq!(outcome, ChatOutcome::NotUnderstood);
    }

    #[test]
    fn test_rates_unavailable() {
        let outcome = quote(
            &command(r#"{"amount":5,"currency":"USDT"}"#),
            &RateSnapshot::empty(),
        );
        assert_eq!(outcome, ChatOutcome::RatesUnavailable);
    }

    #[test]
    fn test_invertir_swaps_calculator() {
        let snapshot = snapshot();
        let mut calculator = Calculator::new(&snapshot);
        calculator.set_amount("10", Side::Top);

        let outcome = handle(&command(r#"{"intent":"invertir"}"#), &snapshot, Some(&mut calculator));

        assert_eq!(outcome, ChatOutcome::Swapped);
        assert_eq!(calculator.state().from, Currency::Ves);
        assert_eq!(calculator.state().amount_top, "400");
    }

    #[test]
    fn test_other_rate_names() {
        assert_eq!(rate_name(Currency::Ves, Currency::Usdt), "VES → USDT");
        assert_eq!(rate_name(Currency::Eur, Currency::Bcv), "Euro a Dólar");
    }
}
