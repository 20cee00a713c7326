//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! All errors are collected so an operator sees every problem at once.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GuardConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: {value}")]
    Address { field: &'static str, value: String },

    #[error("{field} is not a valid URL: {value}")]
    Url { field: &'static str, value: String },

    #[error("asn.lookup_url must contain an {{ip}} placeholder")]
    MissingIpPlaceholder,

    #[error("invalid country code '{0}' (expected two ASCII letters)")]
    CountryCode(String),

    #[error("filters.allowed_user_agents must contain at least one non-empty entry")]
    EmptyAllowlist,

    #[error("filters.country_header is not a valid header name: {0}")]
    HeaderName(String),
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let non_zero = [
        ("rate_limit.requests", config.rate_limit.requests),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("attack.threshold", config.attack.threshold),
        ("attack.window_secs", config.attack.window_secs),
        ("attack.cooldown_secs", config.attack.cooldown_secs),
        ("asn.cache_ttl_secs", config.asn.cache_ttl_secs),
        ("asn.timeout_ms", config.asn.timeout_ms),
        ("store.timeout_ms", config.store.timeout_ms),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("notifier.queue_capacity", config.notifier.queue_capacity as u64),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if url::Url::parse(&config.origin.url).is_err() {
        errors.push(ValidationError::Url {
            field: "origin.url",
            value: config.origin.url.clone(),
        });
    }
    if url::Url::parse(&config.notifier.api_base).is_err() {
        errors.push(ValidationError::Url {
            field: "notifier.api_base",
            value: config.notifier.api_base.clone(),
        });
    }
    if !config.asn.lookup_url.contains("{ip}") {
        errors.push(ValidationError::MissingIpPlaceholder);
    } else if url::Url::parse(&config.asn.lookup_url.replace("{ip}", "192.0.2.1")).is_err() {
        errors.push(ValidationError::Url {
            field: "asn.lookup_url",
            value: config.asn.lookup_url.clone(),
        });
    }

    for code in &config.filters.blocked_countries {
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push(ValidationError::CountryCode(code.clone()));
        }
    }

    if !config.filters.allowed_user_agents.iter().any(|ua| !ua.is_empty()) {
        errors.push(ValidationError::EmptyAllowlist);
    }

    if axum::http::HeaderName::from_bytes(config.filters.country_header.as_bytes()).is_err() {
        errors.push(ValidationError::HeaderName(config.filters.country_header.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
