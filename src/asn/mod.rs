//! ASN resolution subsystem.
//!
//! # Data Flow
//! ```text
//! client address
//!     → non-routable? (loopback, private, link-local) → None, no call
//!     → cache (store GET asn:{addr}) → hit → ASN
//!     → lookup.rs (HTTP GET, provider JSON)
//!     → parse "AS<digits>" → cache SET EX ttl → ASN
//! ```
//!
//! # Design Decisions
//! - Fail open: every failure yields None and is logged, never raised
//! - Only successfully parsed ASNs are cached; failures are retried next time

pub mod lookup;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

pub use lookup::{parse_asn, AsnLookup, HttpAsnLookup, LookupError};

use crate::observability::metrics;
use crate::store::{CounterStore, KeySpace};

/// Resolves client addresses to autonomous system numbers with caching.
#[derive(Clone)]
pub struct AsnResolver {
    store: Arc<dyn CounterStore>,
    lookup: Arc<dyn AsnLookup>,
    keys: KeySpace,
    cache_ttl: Duration,
}

impl AsnResolver {
    pub fn new(
        store: Arc<dyn CounterStore>,
        lookup: Arc<dyn AsnLookup>,
        keys: KeySpace,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            lookup,
            keys,
            cache_ttl,
        }
    }

    /// Resolve `address` to an ASN, or `None` if it cannot be determined.
    pub async fn resolve(&self, address: &str) -> Option<u32> {
        let ip: IpAddr = match address.parse() {
            Ok(ip) => ip,
            Err(_) => {
                tracing::debug!(client = %address, "Not an IP address, skipping ASN lookup");
                metrics::record_asn_lookup("skipped");
                return None;
            }
        };
        if !is_public(ip) {
            metrics::record_asn_lookup("skipped");
            return None;
        }

        let key = self.keys.asn(address);
        match self.store.get(&key).await {
            Ok(Some(cached)) => match cached.parse() {
                Ok(asn) => {
                    metrics::record_asn_lookup("cache_hit");
                    return Some(asn);
                }
                Err(_) => tracing::warn!(key = %key, value = %cached, "Ignoring malformed cached ASN"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(client = %address, error = %e, "ASN cache read failed"),
        }

        let identifier = match self.lookup.lookup(ip).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(client = %address, error = %e, "ASN lookup failed");
                metrics::record_asn_lookup("failed");
                return None;
            }
        };

        let Some(asn) = parse_asn(&identifier) else {
            tracing::warn!(client = %address, identifier = %identifier, "Unparsable ASN identifier");
            metrics::record_asn_lookup("failed");
            return None;
        };

        if let Err(e) = self
            .store
            .set_ex(&key, &asn.to_string(), self.cache_ttl)
            .await
        {
            tracing::warn!(client = %address, error = %e, "ASN cache write failed");
        }
        metrics::record_asn_lookup("resolved");
        tracing::debug!(client = %address, asn, "Resolved ASN");
        Some(asn)
    }
}

/// Whether an address is worth sending to an external lookup service.
pub fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation())
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}
