//! User-agent allowlist.

use async_trait::async_trait;

use super::{Denial, DenyReason, Filter, Outcome, Stage};
use crate::guard::ClientIdentity;

/// Admits only clients whose user agent contains one of the allowed
/// substrings. Matching is case-sensitive.
pub struct AgentFilter {
    allowed: Vec<String>,
}

impl AgentFilter {
    pub fn new<S: AsRef<str>>(allowed: &[S]) -> Self {
        Self {
            allowed: allowed
                .iter()
                .map(|s| s.as_ref().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    fn admits(&self, user_agent: &str) -> bool {
        !user_agent.is_empty() && self.allowed.iter().any(|token| user_agent.contains(token.as_str()))
    }
}

#[async_trait]
impl Filter for AgentFilter {
    fn stage(&self) -> Stage {
        Stage::Agent
    }

    async fn evaluate(&self, client: &ClientIdentity) -> Outcome {
        if self.admits(client.user_agent()) {
            Outcome::Allow
        } else {
            Outcome::Deny(Denial::forbidden(DenyReason::UserAgent))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> AgentFilter {
        AgentFilter::new(&["Mozilla", "Googlebot", "bingbot"])
    }

    #[test]
    fn test_substring_match() {
        let f = filter();
        assert!(f.admits("Mozilla/5.0 (X11; Linux x86_64)"));
        assert!(f.admits("Mozilla/5.0 (compatible; Googlebot/2.1)"));
        assert!(f.admits("msnbot bingbot/2.0"));
        assert!(!f.admits("curl/8.4.0"));
        assert!(!f.admits("python-requests/2.31"));
        assert!(!f.admits("mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_missing_agent_denied() {
        let outcome = filter().evaluate(&ClientIdentity::new("1.1.1.1", None, "")).await;
        assert_eq!(outcome, Outcome::Deny(Denial::forbidden(DenyReason::UserAgent)));
    }

    #[test]
    fn test_blank_tokens_ignored() {
        // An empty token would otherwise match every agent.
        let f = AgentFilter::new(&["", "Mozilla"]);
        assert!(!f.admits("curl/8.4.0"));
    }
}
