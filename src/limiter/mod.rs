//! Per-client rate limiting.
//!
//! # Design Decisions
//! - Sliding window counter, not token bucket: the quota bounds any rolling
//!   span of `window`, not only clock-aligned windows
//! - State lives in the shared store so every edge node sees the same quota
//! - Only admitted requests count, so a client over quota still gets its
//!   full quota in every window
//! - Store failures are returned to the caller, which decides the policy

pub mod sliding_window;

use async_trait::async_trait;
use std::time::Duration;

pub use sliding_window::SlidingWindowLimiter;

use crate::store::StoreResult;

/// Outcome of accounting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// When admitted, time until the current fixed window ends. When
    /// rejected, time until the next request would be admitted.
    pub reset_after: Duration,
}

/// A limiter that accounts requests per identity.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn limit(&self, identity: &str) -> StoreResult<RateDecision>;
}
