//! Startup orchestration: turn a validated config into a running guard.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::asn::HttpAsnLookup;
use crate::config::{GuardConfig, StoreBackend};
use crate::guard::EdgeGuard;
use crate::lifecycle::ShutdownSignal;
use crate::notify::Notifier;
use crate::store::{CounterStore, MemoryStore, RedisStore, StoreError};

/// How often the memory backend drops expired keys.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("counter store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Build the guard, or `None` when no store is configured.
pub async fn build_guard(
    config: &GuardConfig,
    shutdown: ShutdownSignal,
) -> Result<Option<Arc<EdgeGuard>>, StartupError> {
    let Some(store) = connect_store(config, shutdown.clone()).await? else {
        tracing::warn!("No counter store configured, all requests pass through unfiltered");
        return Ok(None);
    };

    let notifier = Notifier::spawn(&config.notifier, shutdown)?;
    let lookup = Arc::new(HttpAsnLookup::new(&config.asn)?);

    tracing::info!(
        blocked_countries = config.filters.blocked_countries.len(),
        blocked_asns = config.filters.blocked_asns.len(),
        allowed_user_agents = config.filters.allowed_user_agents.len(),
        rate_limit = config.rate_limit.requests,
        rate_window_secs = config.rate_limit.window_secs,
        attack_threshold = config.attack.threshold,
        alerting = notifier.is_enabled(),
        "Edge guard ready"
    );

    Ok(Some(Arc::new(EdgeGuard::from_parts(config, store, lookup, notifier))))
}

async fn connect_store(
    config: &GuardConfig,
    shutdown: ShutdownSignal,
) -> Result<Option<Arc<dyn CounterStore>>, StoreError> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-process counter store");
            let store = MemoryStore::new();
            tokio::spawn(store.clone().run_sweeper(SWEEP_INTERVAL, shutdown));
            Ok(Some(Arc::new(store)))
        }
        StoreBackend::Redis => {
            let Some(url) = config.store.url.as_deref() else {
                return Ok(None);
            };
            let timeout = Duration::from_millis(config.store.timeout_ms);
            Ok(Some(Arc::new(RedisStore::connect(url, timeout).await?)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;

    #[tokio::test]
    async fn test_redis_without_url_is_pass_through() {
        let shutdown = Shutdown::new();
        let config = GuardConfig::default();
        assert!(config.store.url.is_none());
        assert!(build_guard(&config, shutdown.subscribe()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_backend_builds_guard() {
        let shutdown = Shutdown::new();
        let mut config = GuardConfig::default();
        config.store.backend = StoreBackend::Memory;
        assert!(build_guard(&config, shutdown.subscribe()).await.unwrap().is_some());
        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_fatal() {
        let shutdown = Shutdown::new();
        let mut config = GuardConfig::default();
        config.store.url = Some("redis://127.0.0.1:1/".into());
        let result = build_guard(&config, shutdown.subscribe()).await;
        assert!(matches!(result, Err(StartupError::Store(_))));
    }
}
