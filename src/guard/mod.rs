//! Edge interceptor: the per-request decision sequence.
//!
//! # Data Flow
//! ```text
//! ClientIdentity
//!     → detection::record_and_check   (every request is counted)
//!     → detection::check_for_attack   (may enqueue one alert)
//!     → filters::FilterChain::run     (first rejection wins)
//!     → Verdict
//! ```
//!
//! # Design Decisions
//! - Counting happens before classification so rejected requests count
//! - Alerting never changes the verdict of the request that triggered it
//! - The guard holds no state of its own; everything lives in the store

pub mod identity;

use std::sync::Arc;
use std::time::{Duration, Instant};

pub use identity::ClientIdentity;

use crate::asn::{AsnLookup, AsnResolver};
use crate::config::GuardConfig;
use crate::detection::{AttackDetector, DetectionPolicy};
use crate::filters::{FilterChain, Verdict};
use crate::limiter::SlidingWindowLimiter;
use crate::notify::Notifier;
use crate::observability::metrics;
use crate::store::{CounterStore, KeySpace};

/// Attack detection plus the classifier chain.
pub struct EdgeGuard {
    detector: AttackDetector,
    chain: FilterChain,
}

impl EdgeGuard {
    pub fn new(detector: AttackDetector, chain: FilterChain) -> Self {
        Self { detector, chain }
    }

    /// Wire the standard pipeline over one store.
    pub fn from_parts(
        config: &GuardConfig,
        store: Arc<dyn CounterStore>,
        lookup: Arc<dyn AsnLookup>,
        notifier: Notifier,
    ) -> Self {
        let keys = KeySpace::new(&config.store.key_prefix);

        let detector = AttackDetector::new(
            store.clone(),
            keys.clone(),
            DetectionPolicy::from(&config.attack),
            notifier,
        );
        let resolver = AsnResolver::new(
            store.clone(),
            lookup,
            keys.clone(),
            Duration::from_secs(config.asn.cache_ttl_secs),
        );
        let limiter = SlidingWindowLimiter::from_config(store, keys, &config.rate_limit);
        let chain = FilterChain::standard(&config.filters, resolver, Arc::new(limiter));

        Self::new(detector, chain)
    }

    /// Decide what happens to one request.
    pub async fn inspect(&self, client: &ClientIdentity) -> Verdict {
        let started = Instant::now();

        let snapshot = self.detector.record_and_check().await;
        self.detector.check_for_attack(snapshot).await;

        let verdict = self.chain.run(client, &self.detector).await;

        metrics::record_decision_duration(started);
        metrics::record_verdict(&verdict);
        verdict
    }
}
