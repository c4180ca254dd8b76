//! Rate reconciliation engine.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use tasas_common::{now, percent_change, RateEntry, RateSnapshot, RateType};

use crate::config::{OfficialTier, PeerStrategy, RateEngineConfig};
use crate::error::{RateError, RateFamily, RateResult};
use crate::notify::RateNotification;
use crate::payload::{peer_price, OfficialQuote, QuotedPrice, RatePayload};
use crate::provider::{fetch_with_timeout, AttemptOutcome, FetchAttempt, RateSource};

/// Result of one reconciliation cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The snapshot to publish.
    pub snapshot: RateSnapshot,
    /// Set when every official tier failed.
    pub offline: bool,
    /// Official tier that answered, if any.
    pub official_tier: Option<OfficialTier>,
    /// Peer strategy that answered, if any.
    pub peer_strategy: Option<PeerStrategy>,
    /// Every endpoint call made during the cycle, in order.
    pub attempts: Vec<FetchAttempt>,
    /// Notifications to deliver.
    pub notifications: Vec<RateNotification>,
}

/// Fetches both rate families and merges them into a new snapshot.
pub struct RateEngine {
    source: Arc<dyn RateSource>,
    config: RateEngineConfig,
}

impl RateEngine {
    /// Create a new engine over the given source.
    pub fn new(source: Arc<dyn RateSource>, config: RateEngineConfig) -> Self {
        Self { source, config }
    }

    /// Engine configuration.
    pub fn config(&self) -> &RateEngineConfig {
        &self.config
    }

    /// Run one reconciliation cycle.
    ///
    /// Never fails: a family that cannot be fetched keeps its values from
    /// `previous`, and an unreachable official family marks the cycle offline.
    #[instrument(skip_all, fields(has_previous = previous.is_some()))]
    pub async fn reconcile(
        &self,
        previous: Option<&RateSnapshot>,
        notifications_enabled: bool,
    ) -> CycleReport {
        let base = previous.cloned().unwrap_or_default();
        let mut snapshot = base.clone();
        let mut attempts = Vec::new();

        let official = self.fetch_official(&mut attempts).await;
        let peer = self.fetch_peer(&mut attempts).await;

        let official_tier = match official {
            Ok((tier, quote)) => {
                apply_official(&mut snapshot, tier, quote);
                Some(tier)
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "All official rate sources failed");
                None
            }
        };

        let peer_strategy = match peer {
            Ok((strategy, price)) => {
                snapshot.usdt = RateEntry {
                    price,
                    source: strategy.source_label(),
                    change: percent_change(price, base.usdt.price),
                    rate_type: RateType::Peer,
                };
                Some(strategy)
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "USDT rate unavailable");
                None
            }
        };

        snapshot.last_update = Some(now());

        let notifications = if notifications_enabled {
            self.notifications_for(previous, &snapshot)
        } else {
            Vec::new()
        };

        info!(
            offline = official_tier.is_none(),
            bcv = %snapshot.bcv.price,
            euro = %snapshot.euro.price,
            usdt = %snapshot.usdt.price,
            attempts = attempts.len(),
            "Reconciliation cycle completed"
        );

        CycleReport {
            snapshot,
            offline: official_tier.is_none(),
            official_tier,
            peer_strategy,
            attempts,
            notifications,
        }
    }

    /// Walk the official tiers in order until one yields a usable quote.
    async fn fetch_official(
        &self,
        attempts: &mut Vec<FetchAttempt>,
    ) -> RateResult<(OfficialTier, OfficialQuote)> {
        for (tier, url) in self.config.official_tiers() {
            debug!(tier = tier.name(), url = %url, "Querying official tier");

            let result = fetch_with_timeout(self.source.as_ref(), &url, self.config.fetch_timeout)
                .await
                .and_then(|body| RatePayload::decode(tier, body))
                .and_then(RatePayload::into_quote);

            match result {
                Ok(quote) => {
                    info!(tier = tier.name(), "Official rates fetched");
                    attempts.push(FetchAttempt {
                        url,
                        strategy: tier.name().to_string(),
                        outcome: AttemptOutcome::Success,
                    });
                    return Ok((tier, quote));
                }
                Err(e) => {
                    warn!(tier = tier.name(), error = %e, kind = e.kind(), "Official tier failed");
                    attempts.push(FetchAttempt {
                        url,
                        strategy: tier.name().to_string(),
                        outcome: AttemptOutcome::from(&e),
                    });
                }
            }
        }

        Err(RateError::NoDataAvailable(RateFamily::Official))
    }

    /// Try each peer strategy in order until one yields a positive average.
    async fn fetch_peer(
        &self,
        attempts: &mut Vec<FetchAttempt>,
    ) -> RateResult<(PeerStrategy, Decimal)> {
        for strategy in self.config.peer_strategies() {
            let url = strategy.build_url(&self.config.p2p_url);
            debug!(strategy = strategy.name(), url = %url, "Querying P2P aggregator");

            let result = fetch_with_timeout(self.source.as_ref(), &url, self.config.fetch_timeout)
                .await
                .and_then(peer_price);

            match result {
                Ok(price) => {
                    info!(strategy = strategy.name(), price = %price, "USDT rate fetched");
                    attempts.push(FetchAttempt {
                        url,
                        strategy: strategy.name().to_string(),
                        outcome: AttemptOutcome::Success,
                    });
                    return Ok((strategy, price));
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, kind = e.kind(), "P2P strategy failed");
                    attempts.push(FetchAttempt {
                        url,
                        strategy: strategy.name().to_string(),
                        outcome: AttemptOutcome::from(&e),
                    });
                }
            }
        }

        Err(RateError::NoDataAvailable(RateFamily::Peer))
    }

    fn notifications_for(
        &self,
        previous: Option<&RateSnapshot>,
        current: &RateSnapshot,
    ) -> Vec<RateNotification> {
        let Some(previous) = previous else {
            return Vec::new();
        };

        let mut notifications = Vec::new();
        if previous.bcv.price != current.bcv.price {
            notifications.push(RateNotification::official(
                current.bcv.price,
                self.config.notification_icon.clone(),
            ));
        }
        if self.config.notify_peer_changes && previous.usdt.price != current.usdt.price {
            notifications.push(RateNotification::peer(
                current.usdt.price,
                self.config.notification_icon.clone(),
            ));
        }
        notifications
    }
}

/// Merge an official quote into `snapshot`, one currency at a time.
fn apply_official(snapshot: &mut RateSnapshot, tier: OfficialTier, quote: OfficialQuote) {
    if let Some(entry) = quote
        .bcv
        .and_then(|q| merge_quote(&snapshot.bcv, q, tier.source_label().to_string()))
    {
        snapshot.bcv = entry;
    }

    if let Some(entry) = quote
        .euro
        .and_then(|q| merge_quote(&snapshot.euro, q, tier.euro_source_label()))
    {
        snapshot.euro = entry;
    }
}

/// New entry for a quoted price, or `None` when the price is not positive.
///
/// A change reported by the provider wins over the computed one.
pub fn merge_quote(previous: &RateEntry, quoted: QuotedPrice, source: String) -> Option<RateEntry> {
    if quoted.price <= Decimal::ZERO {
        return None;
    }

    let change = quoted
        .change
        .unwrap_or_else(|| percent_change(quoted.price, previous.price));

    Some(RateEntry {
        price: quoted.price,
        source,
        change,
        rate_type: RateType::Official,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PROXY_PREFIX;
    use crate::provider::{MockRateSource, MockResponse};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::time::Duration;

    const PRIMARY: &str = "https://primary.test/exec";
    const SECONDARY: &str = "https://secondary.test/exec";
    const PUBLIC: &str = "https://public.test/v1/dolares";
    const P2P: &str = "https://p2p.test/USDT/VES/1";

    fn config() -> RateEngineConfig {
        RateEngineConfig {
            primary_url: Some(PRIMARY.to_string()),
            secondary_url: Some(SECONDARY.to_string()),
            public_url: PUBLIC.to_string(),
            p2p_url: P2P.to_string(),
            proxy_prefix: DEFAULT_PROXY_PREFIX.to_string(),
            fetch_timeout: Duration::from_millis(50),
            ..Default::default()
        }
    }

    fn proxy_url() -> String {
        PeerStrategy::Proxy {
            prefix: DEFAULT_PROXY_PREFIX.to_string(),
        }
        .build_url(P2P)
    }

    fn setup(source: Arc<MockRateSource>) -> RateEngine {
        RateEngine::new(source, config())
    }

    fn previous(bcv: Decimal, euro: Decimal, usdt: Decimal) -> RateSnapshot {
        let mut snapshot = RateSnapshot::empty();
        snapshot.bcv = RateEntry {
            price: bcv,
            source: OfficialTier::Primary.source_label().to_string(),
            change: Decimal::ZERO,
            rate_type: RateType::Official,
        };
        snapshot.euro = RateEntry {
            price: euro,
            source: OfficialTier::Primary.euro_source_label(),
            change: Decimal::ZERO,
            rate_type: RateType::Official,
        };
        snapshot.usdt = RateEntry {
            price: usdt,
            source: PeerStrategy::Direct.source_label(),
            change: Decimal::ZERO,
            rate_type: RateType::Peer,
        };
        snapshot
    }

    #[tokio::test]
    async fn test_falls_back_to_public_tier() {
        let source = Arc::new(MockRateSource::new());
        source.respond(PRIMARY, MockResponse::Hang);
        source.respond(SECONDARY, MockResponse::Status(500));
        source.respond(
            PUBLIC,
            MockResponse::Json(json!([
                {"fuente": "paralelo", "promedio": 41.0},
                {"fuente": "oficial", "promedio": 36.50}
            ])),
        );
        source.respond(P2P, MockResponse::Json(json!({"ask": 40.6, "bid": 40.4})));

        let engine = setup(source.clone());
        let report = engine.reconcile(None, false).await;

        assert!(!report.offline);
        assert_eq!(report.official_tier, Some(OfficialTier::PublicFallback));
        assert_eq!(report.snapshot.bcv.price, dec!(36.50));
        assert_eq!(report.snapshot.bcv.source, "BCV Oficial (Respaldo Público)");
        assert_eq!(report.snapshot.bcv.rate_type, RateType::Official);
        assert_eq!(report.snapshot.euro, RateEntry::empty());

        let outcomes: Vec<AttemptOutcome> =
            report.attempts.iter().map(|a| a.outcome.clone()).collect();
        assert_eq!(
            outcomes,
            vec![
                AttemptOutcome::Timeout,
                AttemptOutcome::HttpError(500),
                AttemptOutcome::Success,
                AttemptOutcome::Success,
            ]
        );
        assert_eq!(source.calls(), vec![PRIMARY, SECONDARY, PUBLIC, P2P]);
    }

    #[tokio::test]
    async fn test_primary_success_skips_backups() {
        let source = Arc::new(MockRateSource::new());
        source.respond(PRIMARY, MockResponse::Json(json!({"bcv": 36.5, "euro": 39.9})));
        source.respond(P2P, MockResponse::Json(json!({"ask": 40.6, "bid": 40.4})));

        let engine = setup(source.clone());
        let report = engine.reconcile(None, false).await;

        assert_eq!(report.official_tier, Some(OfficialTier::Primary));
        assert_eq!(report.snapshot.euro.price, dec!(39.9));
        assert_eq!(report.snapshot.euro.source, "Euro Oficial (Privado)");
        assert!(!source.calls().contains(&SECONDARY.to_string()));
        assert!(report.snapshot.last_update.is_some());
    }

    #[tokio::test]
    async fn test_change_and_notification() {
        let source = Arc::new(MockRateSource::new());
        source.respond(PRIMARY, MockResponse::Json(json!({"bcv": 36.50, "euro": 39.0})));
        source.respond(P2P, MockResponse::Json(json!({"ask": 40.0, "bid": 40.0})));

        let engine = setup(source);
        let prev = previous(dec!(36.00), dec!(39.0), dec!(40.0));

        let report = engine.reconcile(Some(&prev), true).await;

        assert_eq!(report.snapshot.bcv.change.round_dp(2), dec!(1.39));
        assert_eq!(report.snapshot.euro.change, Decimal::ZERO);
        assert_eq!(report.notifications.len(), 1);
        assert_eq!(report.notifications[0].price, dec!(36.50));

        let silent = engine.reconcile(Some(&prev), false).await;
        assert!(silent.notifications.is_empty());

        let first_run = engine.reconcile(None, true).await;
        assert!(first_run.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_peer_change_notifies() {
        let source = Arc::new(MockRateSource::new());
        source.respond(PRIMARY, MockResponse::Json(json!({"bcv": 36.0})));
        source.respond(P2P, MockResponse::Json(json!({"ask": 41.0, "bid": 41.0})));

        let engine = setup(source.clone());
        let prev = previous(dec!(36.0), dec!(39.0), dec!(40.0));
        let report = engine.reconcile(Some(&prev), true).await;

        assert_eq!(report.notifications.len(), 1);
        assert_eq!(report.notifications[0].title, "Cambio Tasa USDT");

        let quiet = RateEngine::new(
            source,
            RateEngineConfig {
                notify_peer_changes: false,
                ..config()
            },
        );
        assert!(quiet.reconcile(Some(&prev), true).await.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_change_is_used_verbatim() {
        let source = Arc::new(MockRateSource::new());
        source.respond(
            PRIMARY,
            MockResponse::Json(json!({"bcv": {"price": 36.5, "change": 0.25}, "euro": {"price": 0}})),
        );

        let engine = setup(source);
        let prev = previous(dec!(36.0), dec!(39.0), dec!(40.0));
        let report = engine.reconcile(Some(&prev), false).await;

        assert_eq!(report.snapshot.bcv.change, dec!(0.25));
        // A zero euro price leaves the previous entry in place.
        assert_eq!(report.snapshot.euro, prev.euro);
    }

    #[tokio::test]
    async fn test_all_official_tiers_fail() {
        let source = Arc::new(MockRateSource::new());
        source.respond(PRIMARY, MockResponse::Timeout);
        source.respond(SECONDARY, MockResponse::Status(502));
        source.respond(PUBLIC, MockResponse::Json(json!([{"fuente": "paralelo", "promedio": 41}])));
        source.respond(P2P, MockResponse::Json(json!({"ask": 40.6, "bid": 40.4})));

        let engine = setup(source);
        let prev = previous(dec!(36.0), dec!(39.0), dec!(40.0));
        let report = engine.reconcile(Some(&prev), true).await;

        assert!(report.offline);
        assert_eq!(report.official_tier, None);
        assert_eq!(report.snapshot.bcv, prev.bcv);
        assert_eq!(report.snapshot.euro, prev.euro);
        assert_eq!(report.snapshot.usdt.price, dec!(40.5));
    }

    #[tokio::test]
    async fn test_peer_falls_back_to_proxy() {
        let source = Arc::new(MockRateSource::new());
        source.respond(PRIMARY, MockResponse::Json(json!({"bcv": 36.0})));
        source.respond(P2P, MockResponse::Json(json!({"ask": 0, "bid": 0})));
        source.respond(proxy_url(), MockResponse::Json(json!({"ask": "40.6", "bid": "40.4"})));

        let engine = setup(source);
        let prev = previous(dec!(36.0), dec!(39.0), dec!(40.0));
        let report = engine.reconcile(Some(&prev), false).await;

        assert_eq!(report.peer_strategy.as_ref().map(|s| s.name()), Some("Proxy (AllOrigins)"));
        assert_eq!(report.snapshot.usdt.price, dec!(40.5));
        assert_eq!(report.snapshot.usdt.source, "Binance P2P (Proxy (AllOrigins))");
        assert_eq!(report.snapshot.usdt.rate_type, RateType::Peer);
        assert_eq!(report.snapshot.usdt.change, dec!(1.25));
    }

    #[tokio::test]
    async fn test_out_of_range_ticker_falls_back_to_proxy() {
        let source = Arc::new(MockRateSource::new());
        source.respond(PRIMARY, MockResponse::Json(json!({"bcv": 36.0})));
        source.respond(
            P2P,
            MockResponse::Json(json!({
                "ask": "79228162514264337593543950335",
                "bid": "79228162514264337593543950335"
            })),
        );
        source.respond(proxy_url(), MockResponse::Json(json!({"ask": 40.6, "bid": 40.4})));

        let engine = setup(source);
        let prev = previous(dec!(36.0), dec!(39.0), dec!(0.0000000000000000000000000001));
        let report = engine.reconcile(Some(&prev), false).await;

        assert!(matches!(report.attempts[1].outcome, AttemptOutcome::ParseError(_)));
        assert_eq!(report.snapshot.usdt.price, dec!(40.5));
        assert_eq!(report.snapshot.usdt.change, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_peer_failure_keeps_previous() {
        let source = Arc::new(MockRateSource::new());
        source.respond(PRIMARY, MockResponse::Json(json!({"bcv": 36.0})));
        source.respond(P2P, MockResponse::Status(503));
        source.respond(proxy_url(), MockResponse::Hang);

        let engine = setup(source);
        let prev = previous(dec!(36.0), dec!(39.0), dec!(40.0));
        let report = engine.reconcile(Some(&prev), false).await;

        assert!(report.peer_strategy.is_none());
        assert!(!report.offline);
        assert_eq!(report.snapshot.usdt, prev.usdt);
    }

    #[test]
    fn test_merge_quote_skips_non_positive() {
        let entry = RateEntry::empty();
        let quoted = QuotedPrice {
            price: dec!(-1),
            change: None,
        };
        assert!(merge_quote(&entry, quoted, "x".to_string()).is_none());
    }
}
