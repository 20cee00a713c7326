//! Per-client rate limit stage.

use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::Arc;

use super::{Denial, DenyReason, FailPolicy, Filter, Outcome, Stage};
use crate::guard::ClientIdentity;
use crate::limiter::RateLimiter;

/// Applies the per-client quota. Fails closed: if the limiter cannot
/// account the request the client gets a 429.
pub struct RateFilter {
    limiter: Arc<dyn RateLimiter>,
}

impl RateFilter {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Filter for RateFilter {
    fn stage(&self) -> Stage {
        Stage::Rate
    }

    fn fail_policy(&self) -> FailPolicy {
        FailPolicy::Closed {
            status: StatusCode::TOO_MANY_REQUESTS,
        }
    }

    async fn evaluate(&self, client: &ClientIdentity) -> Outcome {
        match self.limiter.limit(client.address()).await {
            Ok(decision) if decision.allowed => Outcome::Allow,
            Ok(decision) => Outcome::Deny(Denial::too_many_requests(
                DenyReason::RateLimited,
                Some(decision.reset_after),
            )),
            Err(e) => Outcome::Indeterminate(format!("rate limiter unavailable: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::SlidingWindowLimiter;
    use crate::store::{KeySpace, MemoryStore};
    use crate::test_support::DownStore;
    use std::time::Duration;

    fn filter(store: Arc<dyn crate::store::CounterStore>) -> RateFilter {
        let limiter = SlidingWindowLimiter::new(store, KeySpace::new("t"), 10, Duration::from_secs(10));
        RateFilter::new(Arc::new(limiter))
    }

    #[tokio::test]
    async fn test_over_quota_is_429_with_retry_after() {
        let filter = filter(Arc::new(MemoryStore::new()));
        let client = ClientIdentity::new("198.51.100.1", None, "Mozilla");

        for _ in 0..10 {
            assert_eq!(filter.evaluate(&client).await, Outcome::Allow);
        }
        match filter.evaluate(&client).await {
            Outcome::Deny(denial) => {
                assert_eq!(denial.status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(denial.reason, DenyReason::RateLimited);
                let retry = denial.retry_after.unwrap();
                assert!(retry > Duration::ZERO && retry <= Duration::from_secs(10));
            }
            other => panic!("expected deny, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed() {
        let filter = filter(Arc::new(DownStore));
        let outcome = filter
            .evaluate(&ClientIdentity::new("198.51.100.1", None, "Mozilla"))
            .await;
        assert!(matches!(outcome, Outcome::Indeterminate(_)));

        let denial = filter.fail_policy().resolve(Stage::Rate, outcome).unwrap();
        assert_eq!(denial.status, StatusCode::TOO_MANY_REQUESTS);
    }
}
