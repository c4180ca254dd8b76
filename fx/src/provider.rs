//! Rate source clients and fetch attempt records.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::error::{RateError, RateResult};

/// A transport that performs a single JSON GET against one endpoint.
///
/// Timeouts are applied by the caller, so an implementation may simply await
/// the response.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch and decode the JSON body at `url`.
    async fn get_json(&self, url: &str) -> RateResult<Value>;
}

/// `reqwest`-backed rate source.
pub struct HttpRateSource {
    client: reqwest::Client,
}

impl HttpRateSource {
    /// Create a new HTTP source.
    pub fn new() -> RateResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| RateError::Transport(e.to_string()))?;

        Ok(Self::with_client(client))
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn get_json(&self, url: &str) -> RateResult<Value> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RateError::NetworkTimeout {
                    url: url.to_string(),
                }
            } else {
                RateError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RateError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| RateError::Transport(e.to_string()))?;

        debug!(url, bytes = body.len(), "Fetched rate payload");
        Ok(serde_json::from_str(&body)?)
    }
}

/// Run one fetch under `limit`, mapping an elapsed deadline to a timeout error.
pub async fn fetch_with_timeout(
    source: &dyn RateSource,
    url: &str,
    limit: Duration,
) -> RateResult<Value> {
    match tokio::time::timeout(limit, source.get_json(url)).await {
        Ok(result) => result,
        Err(_) => Err(RateError::NetworkTimeout {
            url: url.to_string(),
        }),
    }
}

/// Outcome of one endpoint call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Payload fetched and accepted.
    Success,
    /// Deadline elapsed.
    Timeout,
    /// Non-success HTTP status.
    HttpError(u16),
    /// Body missing or malformed.
    ParseError(String),
    /// Connection-level failure.
    TransportError(String),
}

impl From<&RateError> for AttemptOutcome {
    fn from(err: &RateError) -> Self {
        match err {
            RateError::NetworkTimeout { .. } => AttemptOutcome::Timeout,
            RateError::Http { status, .. } => AttemptOutcome::HttpError(*status),
            RateError::Parse(msg) => AttemptOutcome::ParseError(msg.clone()),
            RateError::Transport(msg) => AttemptOutcome::TransportError(msg.clone()),
            RateError::NoDataAvailable(family) => {
                AttemptOutcome::ParseError(format!("no {} data", family))
            }
        }
    }
}

impl AttemptOutcome {
    /// Whether the attempt produced a usable payload.
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success => write!(f, "ok"),
            AttemptOutcome::Timeout => write!(f, "timed out"),
            AttemptOutcome::HttpError(status) => write!(f, "invalid response (status {})", status),
            AttemptOutcome::ParseError(msg) => write!(f, "unreadable payload: {}", msg),
            AttemptOutcome::TransportError(msg) => write!(f, "connection failed: {}", msg),
        }
    }
}

/// Ephemeral record of one endpoint call within a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    /// Requested URL.
    pub url: String,
    /// Tier or strategy name.
    pub strategy: String,
    /// What happened.
    pub outcome: AttemptOutcome,
}

/// Scripted response for [`MockRateSource`].
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this JSON body.
    Json(Value),
    /// Fail with this HTTP status.
    Status(u16),
    /// Never answer.
    Hang,
    /// Fail with a timeout error right away.
    Timeout,
}

/// Mock rate source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateSource {
    responses: dashmap::DashMap<String, MockResponse>,
    calls: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a new mock source with no scripted endpoints.
    pub fn new() -> Self {
        Self {
            responses: dashmap::DashMap::new(),
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Script the response for `url`.
    pub fn respond(&self, url: impl Into<String>, response: MockResponse) {
        self.responses.insert(url.into(), response);
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockRateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSource for MockRateSource {
    fn name(&self) -> &str {
        "MOCK"
    }

    async fn get_json(&self, url: &str) -> RateResult<Value> {
        self.calls.lock().push(url.to_string());

        let response = self.responses.get(url).map(|r| r.clone());
        match response {
            Some(MockResponse::Json(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(RateError::Http {
                status,
                url: url.to_string(),
            }),
            Some(MockResponse::Timeout) => Err(RateError::NetworkTimeout {
                url: url.to_string(),
            }),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Err(RateError::Transport(format!("connection refused: {}", url))),
        }
    }
}
