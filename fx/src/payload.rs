//! Payload shapes returned by the rate endpoints and their adapters.
//!
//! Each official tier answers with its own JSON layout. The layouts are
//! decoded into [`RatePayload`] and then mapped into a single
//! [`OfficialQuote`] before any merging happens.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use tasas_common::parse_decimal;

use crate::config::OfficialTier;
use crate::error::{RateError, RateResult};

/// A number that may arrive as a JSON number or as a numeric string.
///
/// Anything unreadable decodes as zero, which the engine then ignores as an
/// unpriced value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LooseDecimal(pub Decimal);

impl<'de> Deserialize<'de> for LooseDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s),
            _ => None,
        };
        Ok(LooseDecimal(parsed.unwrap_or(Decimal::ZERO)))
    }
}

/// A quoted currency: either a bare price or a `{price, change}` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuoteField {
    Detailed {
        price: LooseDecimal,
        #[serde(default)]
        change: Option<LooseDecimal>,
    },
    Bare(LooseDecimal),
}

impl QuoteField {
    fn into_quoted(self) -> QuotedPrice {
        match self {
            QuoteField::Detailed { price, change } => QuotedPrice {
                price: price.0,
                change: change.map(|c| c.0),
            },
            QuoteField::Bare(price) => QuotedPrice {
                price: price.0,
                change: None,
            },
        }
    }
}

/// Layout of the private APIs: `{"bcv": .., "euro": ..}`.
#[derive(Debug, Clone, Deserialize)]
pub struct OfficialShape {
    #[serde(default, alias = "usd")]
    pub bcv: Option<QuoteField>,
    #[serde(default, alias = "eur")]
    pub euro: Option<QuoteField>,
}

/// One entry of the public fallback array.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicEntry {
    #[serde(default)]
    pub fuente: String,
    #[serde(default)]
    pub promedio: Option<LooseDecimal>,
    #[serde(default)]
    pub venta: Option<LooseDecimal>,
}

/// Decoded payload of one official tier.
#[derive(Debug, Clone)]
pub enum RatePayload {
    Primary(OfficialShape),
    Secondary(OfficialShape),
    Public(Vec<PublicEntry>),
}

/// A price with the change percentage the provider reported, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedPrice {
    pub price: Decimal,
    pub change: Option<Decimal>,
}

/// Official rates in canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfficialQuote {
    pub bcv: Option<QuotedPrice>,
    pub euro: Option<QuotedPrice>,
}

impl OfficialQuote {
    /// Whether at least one currency carries a positive price.
    pub fn has_price(&self) -> bool {
        [self.bcv, self.euro]
            .iter()
            .flatten()
            .any(|q| q.price > Decimal::ZERO)
    }
}

impl RatePayload {
    /// Decode the body returned by `tier`.
    pub fn decode(tier: OfficialTier, body: Value) -> RateResult<Self> {
        Ok(match tier {
            OfficialTier::Primary => RatePayload::Primary(serde_json::from_value(body)?),
            OfficialTier::Secondary => RatePayload::Secondary(serde_json::from_value(body)?),
            OfficialTier::PublicFallback => RatePayload::Public(serde_json::from_value(body)?),
        })
    }

    /// Map the payload into the canonical quote.
    ///
    /// Fails when the payload carries no usable official price, so the caller
    /// moves on to the next tier.
    pub fn into_quote(self) -> RateResult<OfficialQuote> {
        let quote = match self {
            RatePayload::Primary(shape) | RatePayload::Secondary(shape) => OfficialQuote {
                bcv: shape.bcv.map(QuoteField::into_quoted),
                euro: shape.euro.map(QuoteField::into_quoted),
            },
            RatePayload::Public(entries) => {
                let oficial = entries
                    .into_iter()
                    .find(|e| e.fuente.eq_ignore_ascii_case("oficial"))
                    .ok_or_else(|| RateError::Parse("no \"oficial\" entry".to_string()))?;

                let price = oficial
                    .promedio
                    .filter(|p| p.0 > Decimal::ZERO)
                    .or(oficial.venta)
                    .map(|p| p.0);

                // The public feed has no euro figure.
                OfficialQuote {
                    bcv: price.map(|price| QuotedPrice {
                        price,
                        change: None,
                    }),
                    euro: None,
                }
            }
        };

        if !quote.has_price() {
            return Err(RateError::Parse("payload has no official price".to_string()));
        }

        Ok(quote)
    }
}

/// Ticker returned by the peer-to-peer aggregator.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerTicker {
    #[serde(default)]
    pub ask: Option<LooseDecimal>,
    #[serde(default)]
    pub bid: Option<LooseDecimal>,
}

impl PeerTicker {
    /// Mean of best ask and best bid; `None` when the sum overflows.
    pub fn average(&self) -> Option<Decimal> {
        let ask = self.ask.map(|a| a.0).unwrap_or(Decimal::ZERO);
        let bid = self.bid.map(|b| b.0).unwrap_or(Decimal::ZERO);
        ask.checked_add(bid)?.checked_div(Decimal::TWO)
    }
}

/// Decode an aggregator body into a positive USDT price.
pub fn peer_price(body: Value) -> RateResult<Decimal> {
    let ticker: PeerTicker = serde_json::from_value(body)?;
    let average = ticker
        .average()
        .ok_or_else(|| RateError::Parse("P2P ask/bid out of range".to_string()))?;
    if average <= Decimal::ZERO {
        return Err(RateError::Parse(format!(
            "non-positive P2P average {}",
            average
        )));
    }
    Ok(average)
}
