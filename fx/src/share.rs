//! Payment messages and share links.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tasas_common::{format_money, parse_amount, Currency};

use crate::conversion::ConversionState;

const WHATSAPP_SHARE_URL: &str = "https://wa.me/?text=";

/// Kind of receiving account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    PagoMovil,
    Binance,
    Zelle,
    #[serde(other)]
    Bank,
}

impl AccountKind {
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::PagoMovil => "Pago Móvil",
            AccountKind::Binance => "Binance",
            AccountKind::Zelle => "Zelle",
            AccountKind::Bank => "Transferencia",
        }
    }
}

/// A saved account the user gets paid into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAccount {
    pub alias: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    /// Free-form account details, one item per line.
    #[serde(default)]
    pub details: String,
}

/// An amount to be paid, in one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentAmount {
    pub amount: Decimal,
    pub currency: Currency,
}

impl PaymentAmount {
    /// The amount in the bottom field of a calculator.
    pub fn from_conversion(state: &ConversionState) -> Self {
        Self {
            amount: parse_amount(&state.amount_bot),
            currency: state.to,
        }
    }
}

/// Build the message sent to a client asking for payment.
pub fn payment_message(
    payment: PaymentAmount,
    account: &PaymentAccount,
    client_name: Option<&str>,
) -> String {
    let mut lines = Vec::new();

    match client_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => lines.push(format!("Hola {}, estos son los datos para el pago.", name)),
        None => lines.push("Hola, estos son los datos para el pago.".to_string()),
    }

    lines.push(String::new());
    lines.push(format!("Monto: {}", format_money(payment.amount, payment.currency)));
    lines.push(String::new());
    lines.push(format!("{} ({})", account.alias, account.kind.label()));

    lines.extend(
        account
            .details
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string),
    );

    lines.join("\n")
}

/// Deep link that opens WhatsApp with `message` prefilled.
pub fn whatsapp_link(message: &str) -> String {
    format!("{}{}", WHATSAPP_SHARE_URL, urlencoding::encode(message))
}
