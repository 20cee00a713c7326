//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_guard_requests_total` (counter): decisions by verdict and stage
//! - `edge_guard_blocked_total` (counter): rejections by stage
//! - `edge_guard_attack_alerts_total` (counter): alerts raised
//! - `edge_guard_asn_lookups_total` (counter): resolutions by result
//! - `edge_guard_notifications_total` (counter): deliveries by result
//! - `edge_guard_store_errors_total` (counter): store failures by operation
//! - `edge_guard_decision_duration_seconds` (histogram): full pipeline latency
//! - `edge_guard_stage_duration_seconds` (histogram): per-stage latency

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

use crate::filters::Verdict;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_verdict(verdict: &Verdict) {
    let (label, stage) = match verdict {
        Verdict::Pass => ("pass", "none"),
        Verdict::Reject(rejection) => ("reject", rejection.stage.as_str()),
    };
    ::metrics::counter!("edge_guard_requests_total", "verdict" => label, "stage" => stage)
        .increment(1);
}

/// Requests forwarded untouched because filtering is disabled.
pub fn record_bypass() {
    ::metrics::counter!("edge_guard_requests_total", "verdict" => "bypass", "stage" => "none")
        .increment(1);
}

pub fn record_blocked(stage: &'static str) {
    ::metrics::counter!("edge_guard_blocked_total", "stage" => stage).increment(1);
}

pub fn record_attack_alert() {
    ::metrics::counter!("edge_guard_attack_alerts_total").increment(1);
}

pub fn record_asn_lookup(result: &'static str) {
    ::metrics::counter!("edge_guard_asn_lookups_total", "result" => result).increment(1);
}

pub fn record_notification(result: &'static str) {
    ::metrics::counter!("edge_guard_notifications_total", "result" => result).increment(1);
}

pub fn record_store_error(operation: &'static str) {
    ::metrics::counter!("edge_guard_store_errors_total", "operation" => operation).increment(1);
}

pub fn record_decision_duration(started: Instant) {
    ::metrics::histogram!("edge_guard_decision_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}

pub fn record_stage_duration(stage: &'static str, started: Instant) {
    ::metrics::histogram!("edge_guard_stage_duration_seconds", "stage" => stage)
        .record(started.elapsed().as_secs_f64());
}
