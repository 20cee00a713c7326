//! Country denylist.

use async_trait::async_trait;
use std::collections::HashSet;

use super::{Denial, DenyReason, Filter, Outcome, Stage};
use crate::guard::ClientIdentity;

/// Rejects clients whose platform-supplied country is denylisted.
pub struct GeoFilter {
    blocked: HashSet<String>,
}

impl GeoFilter {
    pub fn new<S: AsRef<str>>(blocked: &[S]) -> Self {
        Self {
            blocked: blocked
                .iter()
                .map(|c| c.as_ref().trim().to_ascii_uppercase())
                .collect(),
        }
    }
}

#[async_trait]
impl Filter for GeoFilter {
    fn stage(&self) -> Stage {
        Stage::Geography
    }

    async fn evaluate(&self, client: &ClientIdentity) -> Outcome {
        match client.country() {
            Some(code) if self.blocked.contains(code) => {
                Outcome::Deny(Denial::forbidden(DenyReason::Country(code.to_string())))
            }
            Some(_) => Outcome::Allow,
            // No country header: nothing to check against.
            None => Outcome::Allow,
        }
    }
}
