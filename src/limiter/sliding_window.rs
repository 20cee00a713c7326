//! Sliding window counter over the shared store.
//!
//! Each client has one counter per fixed window. The effective count at time
//! `t` weights the previous window by how much of it still overlaps the
//! rolling span ending at `t`:
//!
//! ```text
//! weighted = floor(previous * (1 - elapsed / window)) + current
//! ```
//!
//! A request is admitted while `weighted < quota`; only admitted requests
//! increment the current bucket. The read and the increment are separate
//! round trips, so concurrent requests can overshoot the quota slightly.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{RateDecision, RateLimiter};
use crate::config::RateLimitConfig;
use crate::store::{CounterStore, KeySpace, StoreResult};

/// Fixed quota per rolling window, keyed by client identity.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    store: Arc<dyn CounterStore>,
    keys: KeySpace,
    quota: u64,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn CounterStore>, keys: KeySpace, quota: u64, window: Duration) -> Self {
        Self {
            store,
            keys,
            quota,
            window,
        }
    }

    pub fn from_config(store: Arc<dyn CounterStore>, keys: KeySpace, config: &RateLimitConfig) -> Self {
        Self::new(
            store,
            keys,
            config.requests,
            Duration::from_secs(config.window_secs),
        )
    }

    /// Decide one request from `identity` at `now` (time since the Unix
    /// epoch). Only admitted requests are counted.
    pub async fn limit_at(&self, identity: &str, now: Duration) -> StoreResult<RateDecision> {
        let window_ms = (self.window.as_millis() as u64).max(1);
        let now_ms = now.as_millis() as u64;
        let index = now_ms / window_ms;
        let elapsed_ms = now_ms % window_ms;

        let current_key = self.keys.rate(identity, index);
        let previous_key = self.keys.rate(identity, index.saturating_sub(1));

        let (current, previous) = self.store.get_pair(&current_key, &previous_key).await?;
        let current = count(current);
        // Window zero has no predecessor; its index saturates onto itself.
        let previous = if index == 0 { 0 } else { count(previous) };
        let weighted = weigh(previous, window_ms - elapsed_ms, window_ms);
        let used = weighted + current;

        if used >= self.quota {
            return Ok(RateDecision {
                allowed: false,
                limit: self.quota,
                remaining: 0,
                reset_after: self.wait_for_slot(current, previous, elapsed_ms, window_ms),
            });
        }

        // Buckets must outlive the following window, which still reads them.
        let ttl = self.window * 2 + Duration::from_secs(1);
        let admitted = self.store.incr_with_ttl(&current_key, ttl).await?.max(0) as u64;
        let used = weighted + admitted;

        Ok(RateDecision {
            allowed: true,
            limit: self.quota,
            remaining: self.quota.saturating_sub(used),
            reset_after: Duration::from_millis(window_ms - elapsed_ms),
        })
    }

    /// Time until `weigh(previous) + current` drops below the quota, assuming
    /// no further admissions. Capped at one window.
    fn wait_for_slot(&self, current: u64, previous: u64, elapsed_ms: u64, window_ms: u64) -> Duration {
        let wait_ms = if current >= self.quota {
            // The current bucket becomes the previous one at the boundary.
            window_ms - elapsed_ms + first_admitting_ms(current, self.quota.saturating_sub(1), window_ms)
        } else {
            let allowance = self.quota - current - 1;
            first_admitting_ms(previous, allowance, window_ms)
                .saturating_sub(elapsed_ms)
                .max(1)
        };
        Duration::from_millis(wait_ms).min(self.window)
    }
}

fn count(raw: Option<i64>) -> u64 {
    raw.unwrap_or(0).max(0) as u64
}

/// `floor(previous * remaining_ms / window_ms)`.
fn weigh(previous: u64, remaining_ms: u64, window_ms: u64) -> u64 {
    (previous as u128 * remaining_ms as u128 / window_ms as u128) as u64
}

/// Earliest elapsed millisecond at which `weigh(previous)` is at most
/// `allowance`.
fn first_admitting_ms(previous: u64, allowance: u64, window_ms: u64) -> u64 {
    if previous <= allowance {
        return 0;
    }
    let excess = (previous - allowance - 1) as u128;
    (window_ms as u128 * excess / previous as u128) as u64 + 1
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn limit(&self, identity: &str) -> StoreResult<RateDecision> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.limit_at(identity, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::DownStore;

    fn limiter(quota: u64, window_secs: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(
            Arc::new(MemoryStore::new()),
            KeySpace::new("t"),
            quota,
            Duration::from_secs(window_secs),
        )
    }

    fn at(ms: u64) -> Duration {
        // Anchor somewhere far from the epoch, on a 10s boundary.
        Duration::from_millis(1_700_000_000_000 + ms)
    }

    #[tokio::test]
    async fn test_eleventh_request_in_two_seconds_is_limited() {
        let limiter = limiter(10, 10);

        for i in 0..10 {
            let decision = limiter.limit_at("1.2.3.4", at(i * 200)).await.unwrap();
            assert!(decision.allowed, "request {} should pass", i + 1);
            assert_eq!(decision.remaining, 9 - i);
        }
        let eleventh = limiter.limit_at("1.2.3.4", at(2_000)).await.unwrap();
        assert!(!eleventh.allowed);
        assert_eq!(eleventh.remaining, 0);
        // The full bucket carries into the next window at full weight.
        assert_eq!(eleventh.reset_after, Duration::from_millis(8_001));
    }

    #[tokio::test]
    async fn test_retry_after_denial_is_admitted() {
        let limiter = limiter(10, 10);
        for i in 0..10 {
            limiter.limit_at("c", at(i * 200)).await.unwrap();
        }
        let denied = limiter.limit_at("c", at(2_000)).await.unwrap();
        assert!(!denied.allowed);

        let retry = at(2_000) + denied.reset_after;
        assert!(!limiter.limit_at("c", retry - Duration::from_millis(1)).await.unwrap().allowed);
        assert!(limiter.limit_at("c", retry).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_rejected_attempts_are_not_counted() {
        let limiter = limiter(10, 10);
        for i in 0..11 {
            limiter.limit_at("1.2.3.4", at(i * 100)).await.unwrap();
        }

        // floor(10 * 0.95) = 9 leaves one slot early in the next window.
        let early = limiter.limit_at("1.2.3.4", at(10_500)).await.unwrap();
        assert!(early.allowed);
        assert_eq!(early.remaining, 0);

        let over = limiter.limit_at("1.2.3.4", at(10_500)).await.unwrap();
        assert!(!over.allowed);
        assert_eq!(over.reset_after, Duration::from_millis(501));
        assert!(limiter.limit_at("1.2.3.4", at(11_001)).await.unwrap().allowed);

        // A full window after the burst the client is clear.
        let later = limiter.limit_at("1.2.3.4", at(20_500)).await.unwrap();
        assert!(later.allowed);
        assert_eq!(later.remaining, 8);
    }

    #[tokio::test]
    async fn test_steady_over_quota_client_keeps_getting_quota() {
        let limiter = limiter(10, 10);
        let mut admitted = [0u32; 6];

        // 11 evenly spaced requests per window, six windows running.
        for k in 0..66u64 {
            let ms = k * 10_000 / 11;
            if limiter.limit_at("steady", at(ms)).await.unwrap().allowed {
                admitted[(ms / 10_000) as usize] += 1;
            }
        }
        assert_eq!(admitted, [10; 6]);
    }

    #[tokio::test]
    async fn test_previous_window_decays() {
        let limiter = limiter(10, 10);
        for i in 0..8 {
            limiter.limit_at("c", at(i * 1_000)).await.unwrap();
        }
        // Halfway into the next window: floor(8 * 0.5) + n < 10 lets 6 through.
        for n in 0..6 {
            let d = limiter.limit_at("c", at(15_000)).await.unwrap();
            assert!(d.allowed, "request {} should pass", n + 1);
        }
        assert!(!limiter.limit_at("c", at(15_000)).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let limiter = limiter(1, 10);
        assert!(limiter.limit_at("a", at(0)).await.unwrap().allowed);
        assert!(!limiter.limit_at("a", at(100)).await.unwrap().allowed);
        assert!(limiter.limit_at("b", at(200)).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let limiter = SlidingWindowLimiter::new(
            Arc::new(DownStore),
            KeySpace::new("t"),
            10,
            Duration::from_secs(10),
        );
        assert!(limiter.limit("1.2.3.4").await.is_err());
    }
}
