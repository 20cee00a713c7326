//! Classifier chain.
//!
//! # Data Flow
//! ```text
//! ClientIdentity
//!     → geo.rs      (country denylist)          403
//!     → network.rs  (ASN denylist)              403
//!     → agent.rs    (user-agent allowlist)      403
//!     → rate.rs     (sliding window quota)      429
//!     → Verdict::Pass
//! ```
//!
//! # Design Decisions
//! - Fixed order, first rejection wins, later stages never run
//! - Every stage reports Allow, Deny or Indeterminate; the stage's
//!   FailPolicy turns Indeterminate into a concrete decision
//! - A rejection increments the blocked counter after the decision

pub mod agent;
pub mod geo;
pub mod network;
pub mod rate;

use async_trait::async_trait;
use axum::http::StatusCode;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use agent::AgentFilter;
pub use geo::GeoFilter;
pub use network::NetworkFilter;
pub use rate::RateFilter;

use crate::asn::AsnResolver;
use crate::config::FilterConfig;
use crate::detection::AttackDetector;
use crate::guard::ClientIdentity;
use crate::limiter::RateLimiter;
use crate::observability::metrics;

/// Position of a filter in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Geography,
    Network,
    Agent,
    Rate,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Geography => "geography",
            Stage::Network => "network",
            Stage::Agent => "agent",
            Stage::Rate => "rate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Country(String),
    Asn(u32),
    UserAgent,
    RateLimited,
    /// A fail-closed stage could not decide.
    Unavailable(Stage),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Country(code) => write!(f, "country {} denied", code),
            DenyReason::Asn(asn) => write!(f, "AS{} denied", asn),
            DenyReason::UserAgent => f.write_str("user agent not allowed"),
            DenyReason::RateLimited => f.write_str("rate limit exceeded"),
            DenyReason::Unavailable(stage) => write!(f, "{} check unavailable", stage),
        }
    }
}

/// A rejection with the status the client will see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenyReason,
    pub status: StatusCode,
    pub retry_after: Option<Duration>,
}

impl Denial {
    pub fn forbidden(reason: DenyReason) -> Self {
        Self {
            reason,
            status: StatusCode::FORBIDDEN,
            retry_after: None,
        }
    }

    pub fn too_many_requests(reason: DenyReason, retry_after: Option<Duration>) -> Self {
        Self {
            reason,
            status: StatusCode::TOO_MANY_REQUESTS,
            retry_after,
        }
    }
}

/// What a single stage concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Allow,
    Deny(Denial),
    /// The stage lacked the data to decide; the detail is for logs only.
    Indeterminate(String),
}

/// How a stage treats an Indeterminate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPolicy {
    Open,
    Closed { status: StatusCode },
}

impl FailPolicy {
    /// Map an outcome to a concrete decision: `Some` rejects.
    pub fn resolve(self, stage: Stage, outcome: Outcome) -> Option<Denial> {
        match outcome {
            Outcome::Allow => None,
            Outcome::Deny(denial) => Some(denial),
            Outcome::Indeterminate(detail) => match self {
                FailPolicy::Open => {
                    tracing::debug!(stage = %stage, detail = %detail, "Stage indeterminate, failing open");
                    None
                }
                FailPolicy::Closed { status } => {
                    tracing::error!(stage = %stage, detail = %detail, "Stage indeterminate, failing closed");
                    Some(Denial {
                        reason: DenyReason::Unavailable(stage),
                        status,
                        retry_after: None,
                    })
                }
            },
        }
    }
}

/// One stage of the classifier chain.
#[async_trait]
pub trait Filter: Send + Sync {
    fn stage(&self) -> Stage;

    fn fail_policy(&self) -> FailPolicy {
        FailPolicy::Open
    }

    async fn evaluate(&self, client: &ClientIdentity) -> Outcome;
}

/// Rejection produced by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub stage: Stage,
    pub denial: Denial,
}

/// Final decision for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Reject(Rejection),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Status code of a rejection, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Verdict::Pass => None,
            Verdict::Reject(rejection) => Some(rejection.denial.status),
        }
    }
}

/// Ordered filters, first rejection wins.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self { filters }
    }

    /// geography → network → agent → rate.
    pub fn standard(
        config: &FilterConfig,
        resolver: AsnResolver,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self::new(vec![
            Box::new(GeoFilter::new(&config.blocked_countries)),
            Box::new(NetworkFilter::new(resolver, &config.blocked_asns)),
            Box::new(AgentFilter::new(&config.allowed_user_agents)),
            Box::new(RateFilter::new(limiter)),
        ])
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.filters.iter().map(|f| f.stage()).collect()
    }

    /// Run every stage in order. On rejection the blocked counter is
    /// incremented before returning.
    pub async fn run(&self, client: &ClientIdentity, detector: &AttackDetector) -> Verdict {
        for filter in &self.filters {
            let stage = filter.stage();
            let started = Instant::now();
            let outcome = filter.evaluate(client).await;
            metrics::record_stage_duration(stage.as_str(), started);

            if let Some(denial) = filter.fail_policy().resolve(stage, outcome) {
                tracing::info!(
                    client = %client.address(),
                    stage = %stage,
                    status = denial.status.as_u16(),
                    reason = %denial.reason,
                    "Request rejected"
                );
                detector.record_blocked().await;
                metrics::record_blocked(stage.as_str());
                return Verdict::Reject(Rejection { stage, denial });
            }
        }
        Verdict::Pass
    }
}
