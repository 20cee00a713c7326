//! In-process counter store.
//!
//! Per-key atomicity comes from DashMap's shard locks. Expiry is lazy: an
//! expired entry behaves as absent on the next access and is dropped by
//! [`MemoryStore::purge_expired`].

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::{CounterStore, StoreError, StoreResult};
use crate::lifecycle::ShutdownSignal;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Single-node store with the same semantics as the Redis backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.inner.len())
    }

    /// Number of keys currently held, expired or not.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Periodically purge expired keys until shutdown.
    pub async fn run_sweeper(self, every: Duration, mut shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = self.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, remaining = self.len(), "Purged expired keys");
                    }
                }
                _ = shutdown.wait() => break,
            }
        }
    }

    fn incr_now(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        let now = Instant::now();
        match self.inner.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if !entry.is_live(now) {
                    *entry = Entry {
                        value: "0".to_string(),
                        expires_at: None,
                    };
                }
                let current: i64 = entry.value.parse().map_err(|_| StoreError::NotAnInteger {
                    key: key.to_string(),
                })?;
                let next = current + 1;
                entry.value = next.to_string();
                if entry.expires_at.is_none() {
                    entry.expires_at = Some(now + ttl);
                }
                Ok(next)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: "1".to_string(),
                    expires_at: Some(now + ttl),
                });
                Ok(1)
            }
        }
    }

    fn get_counter(&self, key: &str) -> StoreResult<Option<i64>> {
        match self.get_now(key) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| StoreError::NotAnInteger { key: key.to_string() }),
            None => Ok(None),
        }
    }

    fn get_now(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.inner
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        self.incr_now(key, ttl)
    }

    async fn incr_and_get(
        &self,
        key: &str,
        ttl: Duration,
        read_key: &str,
    ) -> StoreResult<(i64, Option<i64>)> {
        let count = self.incr_now(key, ttl)?;
        Ok((count, self.get_counter(read_key)?))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get_now(key))
    }

    async fn get_pair(&self, first: &str, second: &str) -> StoreResult<(Option<i64>, Option<i64>)> {
        Ok((self.get_counter(first)?, self.get_counter(second)?))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.inner.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let now = Instant::now();
        let fresh = Entry {
            value: value.to_string(),
            expires_at: Some(now + ttl),
        };
        match self.inner.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    Ok(false)
                } else {
                    occupied.insert(fresh);
                    Ok(true)
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_incr_sets_expiry_only_once() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(store.incr_with_ttl("k", ttl).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(40)).await;
        // Second hit must not push the expiry out to t=100.
        assert_eq!(store.incr_with_ttl("k", ttl).await.unwrap(), 2);

        tokio::time::advance(Duration::from_secs(21)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.incr_with_ttl("k", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_and_get_reads_other_key() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);

        let (total, blocked) = store.incr_and_get("total", ttl, "blocked").await.unwrap();
        assert_eq!((total, blocked), (1, None));

        store.incr_with_ttl("blocked", ttl).await.unwrap();
        let (total, blocked) = store.incr_and_get("total", ttl, "blocked").await.unwrap();
        assert_eq!((total, blocked), (2, Some(1)));
    }

    #[tokio::test]
    async fn test_get_pair_reads_without_incrementing() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.incr_with_ttl("current", ttl).await.unwrap();
        store.incr_with_ttl("current", ttl).await.unwrap();

        assert_eq!(store.get_pair("current", "previous").await.unwrap(), (Some(2), None));
        assert_eq!(store.get_pair("current", "previous").await.unwrap(), (Some(2), None));

        store.set_ex("previous", "x", ttl).await.unwrap();
        assert!(matches!(
            store.get_pair("current", "previous").await,
            Err(StoreError::NotAnInteger { .. })
        ));
    }

    #[tokio::test]
    async fn test_incr_on_non_integer_fails() {
        let store = MemoryStore::new();
        store.set_ex("k", "AS13335", Duration::from_secs(5)).await.unwrap();
        let err = store.incr_with_ttl("k", Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnInteger { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_nx_claims_once_per_ttl() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(30);

        assert!(store.set_nx_ex("flag", "1", ttl).await.unwrap());
        assert!(!store.set_nx_ex("flag", "1", ttl).await.unwrap());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(store.set_nx_ex("flag", "1", ttl).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        store.set_ex("short", "1", Duration::from_secs(1)).await.unwrap();
        store.set_ex("long", "1", Duration::from_secs(100)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = MemoryStore::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..250 {
                    store.incr_with_ttl("hits", Duration::from_secs(60)).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.get("hits").await.unwrap().as_deref(), Some("2000"));
    }
}
