//! Rolling request counters and debounced attack alerts.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AttackConfig;
use crate::notify::{AttackReport, Notifier};
use crate::observability::metrics;
use crate::store::{CounterStore, KeySpace};

/// Counter values observed by one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub total: i64,
    pub blocked: i64,
}

/// Attack detection thresholds in their runtime form.
#[derive(Debug, Clone, Copy)]
pub struct DetectionPolicy {
    pub threshold: u64,
    pub window: Duration,
    pub cooldown: Duration,
}

impl From<&AttackConfig> for DetectionPolicy {
    fn from(config: &AttackConfig) -> Self {
        Self {
            threshold: config.threshold,
            window: Duration::from_secs(config.window_secs),
            cooldown: Duration::from_secs(config.cooldown_secs),
        }
    }
}

/// Counts every request and raises at most one alert per cooldown.
#[derive(Clone)]
pub struct AttackDetector {
    store: Arc<dyn CounterStore>,
    keys: KeySpace,
    policy: DetectionPolicy,
    notifier: Notifier,
}

impl AttackDetector {
    pub fn new(
        store: Arc<dyn CounterStore>,
        keys: KeySpace,
        policy: DetectionPolicy,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            keys,
            policy,
            notifier,
        }
    }

    /// Count this request and read the blocked counter in one round trip.
    ///
    /// Degrades to `(0, 0)` if the store is unavailable.
    pub async fn record_and_check(&self) -> CounterSnapshot {
        match self
            .store
            .incr_and_get(&self.keys.total(), self.policy.window, &self.keys.blocked())
            .await
        {
            Ok((total, blocked)) => CounterSnapshot {
                total,
                blocked: blocked.unwrap_or(0),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Attack counters unavailable, skipping detection");
                metrics::record_store_error("record_and_check");
                CounterSnapshot::default()
            }
        }
    }

    /// Count a rejected request. Best effort.
    pub async fn record_blocked(&self) {
        if let Err(e) = self
            .store
            .incr_with_ttl(&self.keys.blocked(), self.policy.window)
            .await
        {
            tracing::warn!(error = %e, "Failed to record blocked request");
            metrics::record_store_error("record_blocked");
        }
    }

    /// Alert if the window is over threshold and no alert is cooling down.
    /// Returns whether an alert was enqueued.
    pub async fn check_for_attack(&self, snapshot: CounterSnapshot) -> bool {
        if snapshot.total <= 0 || (snapshot.total as u64) <= self.policy.threshold {
            return false;
        }

        // Claiming the flag is the debounce check: only the request that
        // creates it sends, everyone else inside the cooldown skips.
        let claimed = match self
            .store
            .set_nx_ex(&self.keys.notified(), "1", self.policy.cooldown)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::warn!(error = %e, "Debounce flag unavailable, suppressing alert");
                metrics::record_store_error("debounce");
                return false;
            }
        };
        if !claimed {
            return false;
        }

        let report = AttackReport {
            total: snapshot.total,
            blocked: snapshot.blocked,
            window_secs: self.policy.window.as_secs(),
        };
        tracing::warn!(
            total = report.total,
            blocked = report.blocked,
            passed = report.passed(),
            strength = report.strength(),
            "Attack threshold exceeded"
        );
        metrics::record_attack_alert();
        self.notifier.send(report.to_string());
        true
    }
}
