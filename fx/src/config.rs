//! Rate engine configuration.

use std::time::Duration;

use tasas_common::constants;

/// Default public fallback for the official rate.
pub const DEFAULT_PUBLIC_URL: &str = "https://ve.dolarapi.com/v1/dolares";
/// Default peer-to-peer aggregator query.
pub const DEFAULT_P2P_URL: &str = "https://criptoya.com/api/binancep2p/USDT/VES/1";
/// Default CORS proxy prefix; the target URL is appended URL-encoded.
pub const DEFAULT_PROXY_PREFIX: &str = "https://api.allorigins.win/raw?url=";

/// Tiers of the official rate fallback chain, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficialTier {
    /// Private primary API.
    Primary,
    /// Private backup API.
    Secondary,
    /// Public aggregator with a different payload shape.
    PublicFallback,
}

impl OfficialTier {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            OfficialTier::Primary => "API Principal",
            OfficialTier::Secondary => "Respaldo Privado",
            OfficialTier::PublicFallback => "Respaldo Público",
        }
    }

    /// Source label stored on the dollar entry.
    pub fn source_label(&self) -> &'static str {
        match self {
            OfficialTier::Primary => "BCV Oficial (Privado)",
            OfficialTier::Secondary => "BCV Oficial (Respaldo Privado)",
            OfficialTier::PublicFallback => "BCV Oficial (Respaldo Público)",
        }
    }

    /// Source label stored on the euro entry.
    pub fn euro_source_label(&self) -> String {
        self.source_label().replacen("BCV", "Euro", 1)
    }
}

/// How the peer-to-peer aggregator is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerStrategy {
    /// Plain request to the aggregator.
    Direct,
    /// Request routed through a CORS passthrough proxy.
    Proxy { prefix: String },
}

impl PeerStrategy {
    /// Name used in logs and in the USDT source label.
    pub fn name(&self) -> &'static str {
        match self {
            PeerStrategy::Direct => "Directo",
            PeerStrategy::Proxy { .. } => "Proxy (AllOrigins)",
        }
    }

    /// URL to request for `target`.
    pub fn build_url(&self, target: &str) -> String {
        match self {
            PeerStrategy::Direct => target.to_string(),
            PeerStrategy::Proxy { prefix } => {
                format!("{}{}", prefix, urlencoding::encode(target))
            }
        }
    }

    /// Source label stored on the USDT entry.
    pub fn source_label(&self) -> String {
        format!("Binance P2P ({})", self.name())
    }
}

/// Configuration for the rate engine.
#[derive(Debug, Clone)]
pub struct RateEngineConfig {
    /// Primary private API. Skipped when unset.
    pub primary_url: Option<String>,
    /// Backup private API. Skipped when unset.
    pub secondary_url: Option<String>,
    /// Public fallback API.
    pub public_url: String,
    /// Peer-to-peer aggregator query.
    pub p2p_url: String,
    /// CORS proxy prefix for the second peer strategy.
    pub proxy_prefix: String,
    /// Timeout applied to every fetch.
    pub fetch_timeout: Duration,
    /// Icon attached to change notifications.
    pub notification_icon: String,
    /// Whether USDT price changes also notify.
    pub notify_peer_changes: bool,
}

impl Default for RateEngineConfig {
    fn default() -> Self {
        Self {
            primary_url: None,
            secondary_url: None,
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            p2p_url: DEFAULT_P2P_URL.to_string(),
            proxy_prefix: DEFAULT_PROXY_PREFIX.to_string(),
            fetch_timeout: constants::FETCH_TIMEOUT,
            notification_icon: "/logodark.png".to_string(),
            notify_peer_changes: true,
        }
    }
}

impl RateEngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TASAS_PRIMARY_URL") {
            config.primary_url = Some(url).filter(|u| !u.is_empty());
        }

        if let Ok(url) = std::env::var("TASAS_SECONDARY_URL") {
            config.secondary_url = Some(url).filter(|u| !u.is_empty());
        }

        if let Ok(url) = std::env::var("TASAS_PUBLIC_URL") {
            config.public_url = url;
        }

        if let Ok(url) = std::env::var("TASAS_P2P_URL") {
            config.p2p_url = url;
        }

        if let Ok(prefix) = std::env::var("TASAS_PROXY_PREFIX") {
            config.proxy_prefix = prefix;
        }

        if let Ok(secs) = std::env::var("TASAS_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.fetch_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(flag) = std::env::var("TASAS_NOTIFY_PEER_CHANGES") {
            config.notify_peer_changes = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.public_url.is_empty() {
            return Err("Public fallback URL cannot be empty".to_string());
        }

        if self.p2p_url.is_empty() {
            return Err("P2P aggregator URL cannot be empty".to_string());
        }

        if self.fetch_timeout.is_zero() {
            return Err("Fetch timeout cannot be 0".to_string());
        }

        Ok(())
    }

    /// Official tiers that have an endpoint, in fallback order.
    pub fn official_tiers(&self) -> Vec<(OfficialTier, String)> {
        [
            (OfficialTier::Primary, self.primary_url.clone()),
            (OfficialTier::Secondary, self.secondary_url.clone()),
            (OfficialTier::PublicFallback, Some(self.public_url.clone())),
        ]
        .into_iter()
        .filter_map(|(tier, url)| url.map(|url| (tier, url)))
        .collect()
    }

    /// Peer strategies in the order they are tried.
    pub fn peer_strategies(&self) -> Vec<PeerStrategy> {
        vec![
            PeerStrategy::Direct,
            PeerStrategy::Proxy {
                prefix: self.proxy_prefix.clone(),
            },
        ]
    }
}
