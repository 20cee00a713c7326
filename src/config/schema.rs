//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Origin that passing requests are forwarded to.
    pub origin: OriginConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Counter store backend.
    pub store: StoreConfig,

    /// Denylists and allowlist for the classifier chain.
    pub filters: FilterConfig,

    /// Per-client sliding window quota.
    pub rate_limit: RateLimitConfig,

    /// Attack detection thresholds.
    pub attack: AttackConfig,

    /// ASN lookup service.
    pub asn: AsnConfig,

    /// Operator notification channel.
    pub notifier: NotifierConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Origin service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL of the protected origin (e.g., "http://127.0.0.1:3000").
    pub url: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration for the request path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Which counter store backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis instance (production, multi-node).
    Redis,
    /// In-process map (single node, development).
    Memory,
}

/// Counter store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Redis connection URL. Without it the redis backend is considered
    /// unconfigured and filtering is disabled.
    pub url: Option<String>,

    /// Prefix applied to every key the guard writes.
    pub key_prefix: String,

    /// Per-command timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            url: None,
            key_prefix: "edge-guard".to_string(),
            timeout_ms: 500,
        }
    }
}

/// Classifier chain lists.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Two-letter country codes that are always denied.
    pub blocked_countries: Vec<String>,

    /// Autonomous system numbers that are always denied.
    pub blocked_asns: Vec<u32>,

    /// A request passes the agent filter if its user agent contains any of these.
    pub allowed_user_agents: Vec<String>,

    /// Header carrying the platform-supplied country code.
    pub country_header: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blocked_countries: Vec::new(),
            blocked_asns: Vec::new(),
            allowed_user_agents: vec![
                "Mozilla".to_string(),
                "Googlebot".to_string(),
                "bingbot".to_string(),
            ],
            country_header: "x-vercel-ip-country".to_string(),
        }
    }
}

/// Sliding window rate limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per client in any window.
    pub requests: u64,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 10,
            window_secs: 10,
        }
    }
}

/// Attack detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Total requests in one window above which an alert fires.
    pub threshold: u64,

    /// Counting window in seconds.
    pub window_secs: u64,

    /// Minimum seconds between two alerts.
    pub cooldown_secs: u64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            threshold: 10_000,
            window_secs: 60,
            cooldown_secs: 30,
        }
    }
}

/// ASN lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AsnConfig {
    /// Lookup URL; `{ip}` is replaced with the client address.
    pub lookup_url: String,

    /// JSON field holding the provider ASN identifier (e.g. "AS15169").
    pub asn_field: String,

    /// How long a resolved ASN stays cached, in seconds.
    pub cache_ttl_secs: u64,

    /// Lookup timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for AsnConfig {
    fn default() -> Self {
        Self {
            lookup_url: "https://ipapi.co/{ip}/json/".to_string(),
            asn_field: "asn".to_string(),
            cache_ttl_secs: 3600,
            timeout_ms: 1500,
        }
    }
}

/// Notification channel configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Bot token. Usually supplied through the environment.
    pub bot_token: Option<String>,

    /// Target chat identifier.
    pub chat_id: Option<String>,

    /// Messaging API base URL.
    pub api_base: String,

    /// Pending alerts kept before new ones are dropped.
    pub queue_capacity: usize,

    /// Delivery timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            queue_capacity: 16,
            timeout_secs: 10,
        }
    }
}

impl NotifierConfig {
    /// Token and chat id, if both are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat = self.chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat))
    }
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("queue_capacity", &self.queue_capacity)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
