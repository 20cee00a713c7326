//! Counter store subsystem.
//!
//! # Data Flow
//! ```text
//! detection / limiter / asn cache
//!     → CounterStore trait (INCR + EXPIRE NX, GET, SET EX, SET NX EX)
//!     → redis.rs (pipelined round trips against a shared Redis)
//!     → memory.rs (DashMap with lazy expiry, single node)
//! ```
//!
//! # Design Decisions
//! - The store holds all shared state; callers hold none
//! - Multi-command operations are pipelined, never transactional
//! - Expiry on increment is set-if-absent so windows are not extended

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Errors raised by a counter store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the command.
    #[error("store backend error: {0}")]
    Backend(#[from] ::redis::RedisError),

    /// The backend did not answer within the configured deadline.
    #[error("store command timed out after {0:?}")]
    Timeout(Duration),

    /// A stored value could not be interpreted as a counter.
    #[error("value at '{key}' is not an integer")]
    NotAnInteger { key: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Atomic counter primitives the guard expects from its key-value store.
///
/// Each method is a single round trip. Operations inside one call are
/// individually atomic but not mutually atomic.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// `INCR key` then `EXPIRE key ttl NX`. Returns the incremented value.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> StoreResult<i64>;

    /// `INCR key`, `EXPIRE key ttl NX` and `GET read_key` in one pipeline.
    async fn incr_and_get(
        &self,
        key: &str,
        ttl: Duration,
        read_key: &str,
    ) -> StoreResult<(i64, Option<i64>)>;

    /// `GET key`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// `GET first` and `GET second` in one pipeline, both as counters.
    async fn get_pair(&self, first: &str, second: &str) -> StoreResult<(Option<i64>, Option<i64>)>;

    /// `SET key value EX ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// `SET key value NX EX ttl`. Returns true if this call created the key.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;
}

/// Key naming for everything the guard keeps in the store.
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Requests seen in the current detection window.
    pub fn total(&self) -> String {
        format!("{}:attack:total", self.prefix)
    }

    /// Requests rejected in the current detection window.
    pub fn blocked(&self) -> String {
        format!("{}:attack:blocked", self.prefix)
    }

    /// Present while alerts are suppressed.
    pub fn notified(&self) -> String {
        format!("{}:attack:notified", self.prefix)
    }

    pub fn asn(&self, address: &str) -> String {
        format!("{}:asn:{}", self.prefix, address)
    }

    /// Sliding window bucket for one client and one fixed window index.
    pub fn rate(&self, identity: &str, window: u64) -> String {
        format!("{}:rate:{}:{}", self.prefix, identity, window)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new("edge-guard")
    }
}

/// Seconds for an `EXPIRE`/`EX` argument; Redis rejects zero.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
