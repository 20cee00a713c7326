//! Test doubles shared by unit tests.

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::asn::{AsnLookup, LookupError};
use crate::notify::Notifier;
use crate::store::{CounterStore, StoreError, StoreResult};

/// Store whose every command times out.
pub struct DownStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Timeout(Duration::from_millis(1)))
}

#[async_trait]
impl CounterStore for DownStore {
    async fn incr_with_ttl(&self, _key: &str, _ttl: Duration) -> StoreResult<i64> {
        down()
    }

    async fn incr_and_get(
        &self,
        _key: &str,
        _ttl: Duration,
        _read_key: &str,
    ) -> StoreResult<(i64, Option<i64>)> {
        down()
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        down()
    }

    async fn get_pair(&self, _first: &str, _second: &str) -> StoreResult<(Option<i64>, Option<i64>)> {
        down()
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
        down()
    }

    async fn set_nx_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<bool> {
        down()
    }
}

/// Notifier wired to a channel the test reads from.
pub fn capturing_notifier() -> (Notifier, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(64);
    (Notifier::from_sender(tx), rx)
}

/// Drain every message currently queued.
pub fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

/// Lookup double that counts calls and answers with a fixed identifier.
pub struct CountingLookup {
    calls: AtomicUsize,
    answer: Option<&'static str>,
}

impl CountingLookup {
    pub fn answering(answer: &'static str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            answer: Some(answer),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            answer: None,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AsnLookup for CountingLookup {
    async fn lookup(&self, _address: IpAddr) -> Result<String, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .map(str::to_string)
            .ok_or(LookupError::Status(503))
    }
}
