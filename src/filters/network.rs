//! ASN denylist.

use async_trait::async_trait;
use std::collections::HashSet;

use super::{Denial, DenyReason, Filter, Outcome, Stage};
use crate::asn::AsnResolver;
use crate::guard::ClientIdentity;

/// Rejects clients originating from denylisted autonomous systems,
/// typically hosting providers.
pub struct NetworkFilter {
    resolver: AsnResolver,
    blocked: HashSet<u32>,
}

impl NetworkFilter {
    pub fn new(resolver: AsnResolver, blocked: &[u32]) -> Self {
        Self {
            resolver,
            blocked: blocked.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl Filter for NetworkFilter {
    fn stage(&self) -> Stage {
        Stage::Network
    }

    async fn evaluate(&self, client: &ClientIdentity) -> Outcome {
        // Nothing to match against, so skip the external lookup.
        if self.blocked.is_empty() {
            return Outcome::Allow;
        }
        match client.asn(&self.resolver).await {
            Some(asn) if self.blocked.contains(&asn) => {
                Outcome::Deny(Denial::forbidden(DenyReason::Asn(asn)))
            }
            Some(_) => Outcome::Allow,
            None => Outcome::Indeterminate(format!("no ASN for {}", client.address())),
        }
    }
}
