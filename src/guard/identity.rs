//! Per-request client identity.

use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, HeaderName};
use tokio::sync::OnceCell;

use crate::asn::AsnResolver;

/// Header carrying the proxy chain, client first.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
/// Header carrying the directly connected peer.
pub const X_REAL_IP: &str = "x-real-ip";
/// Used when no address header is present.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// What the guard knows about the client behind one request.
#[derive(Debug)]
pub struct ClientIdentity {
    address: String,
    country: Option<String>,
    user_agent: String,
    asn: OnceCell<Option<u32>>,
}

impl ClientIdentity {
    pub fn new(address: impl Into<String>, country: Option<&str>, user_agent: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            country: country.and_then(normalize_country),
            user_agent: user_agent.into(),
            asn: OnceCell::new(),
        }
    }

    /// Derive the identity from request headers.
    pub fn from_headers(headers: &HeaderMap, country_header: &HeaderName) -> Self {
        let address = header_value(headers, X_FORWARDED_FOR)
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|first| !first.is_empty())
            .or_else(|| header_value(headers, X_REAL_IP))
            .unwrap_or(DEFAULT_ADDRESS);

        let country = headers
            .get(country_header)
            .and_then(|v| v.to_str().ok());

        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        Self::new(address, country, user_agent)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Upper-case two-letter country code, if the platform supplied one.
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Resolve the client's ASN once per request.
    pub async fn asn(&self, resolver: &AsnResolver) -> Option<u32> {
        *self
            .asn
            .get_or_init(|| resolver.resolve(&self.address))
            .await
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn normalize_country(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}
