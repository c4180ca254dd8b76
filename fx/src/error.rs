//! Rate acquisition error types.

use std::fmt;

use thiserror::Error;

/// The two independently fetched rate families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateFamily {
    /// Central bank dollar and euro.
    Official,
    /// Peer-to-peer USDT.
    Peer,
}

impl fmt::Display for RateFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateFamily::Official => write!(f, "official"),
            RateFamily::Peer => write!(f, "peer"),
        }
    }
}

/// Errors raised while fetching or decoding rates.
///
/// None of these escape a reconciliation cycle; the engine falls back to the
/// previous snapshot value instead.
#[derive(Debug, Error)]
pub enum RateError {
    /// The request did not finish within the fetch timeout.
    #[error("Request to {url} timed out")]
    NetworkTimeout { url: String },

    /// The endpoint answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The request failed before a response arrived.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Every source for a rate family failed.
    #[error("No data available for the {0} rates")]
    NoDataAvailable(RateFamily),
}

impl RateError {
    /// Short outcome label for attempt records.
    pub fn kind(&self) -> &'static str {
        match self {
            RateError::NetworkTimeout { .. } => "timeout",
            RateError::Http { .. } => "http_error",
            RateError::Transport(_) => "transport_error",
            RateError::Parse(_) => "parse_error",
            RateError::NoDataAvailable(_) => "no_data",
        }
    }
}

impl From<serde_json::Error> for RateError {
    fn from(err: serde_json::Error) -> Self {
        RateError::Parse(err.to_string())
    }
}

/// Result type for rate operations.
pub type RateResult<T> = Result<T, RateError>;
