//! External IP-to-ASN lookup.

use async_trait::async_trait;
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

use crate::config::AsnConfig;

/// Why a lookup produced no identifier.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("lookup service returned status {0}")]
    Status(u16),

    #[error("lookup response has no '{0}' field")]
    MissingField(String),
}

/// A service that maps an address to a provider-formatted ASN identifier.
#[async_trait]
pub trait AsnLookup: Send + Sync {
    async fn lookup(&self, address: IpAddr) -> Result<String, LookupError>;
}

/// JSON-over-HTTP lookup (ipapi.co, ipinfo.io and similar).
#[derive(Debug, Clone)]
pub struct HttpAsnLookup {
    client: reqwest::Client,
    url_template: String,
    field: String,
}

impl HttpAsnLookup {
    pub fn new(config: &AsnConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("edge-guard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url_template: config.lookup_url.clone(),
            field: config.asn_field.clone(),
        })
    }

    fn url_for(&self, address: IpAddr) -> String {
        self.url_template.replace("{ip}", &address.to_string())
    }
}

#[async_trait]
impl AsnLookup for HttpAsnLookup {
    async fn lookup(&self, address: IpAddr) -> Result<String, LookupError> {
        let response = self.client.get(self.url_for(address)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        match body.get(&self.field) {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(LookupError::MissingField(self.field.clone())),
        }
    }
}

/// Parse a provider identifier into an ASN.
///
/// Accepts `AS15169`, `as15169`, `AS15169 Google LLC` and bare `15169`.
pub fn parse_asn(identifier: &str) -> Option<u32> {
    let token = identifier.split_whitespace().next()?;
    let digits = token
        .strip_prefix("AS")
        .or_else(|| token.strip_prefix("as"))
        .unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_asn_formats() {
        assert_eq!(parse_asn("AS15169"), Some(15169));
        assert_eq!(parse_asn("as13335"), Some(13335));
        assert_eq!(parse_asn("AS16509 Amazon.com, Inc."), Some(16509));
        assert_eq!(parse_asn("  14061 "), Some(14061));
    }

    #[test]
    fn test_parse_asn_rejects_garbage() {
        assert_eq!(parse_asn(""), None);
        assert_eq!(parse_asn("AS"), None);
        assert_eq!(parse_asn("ASN15169"), None);
        assert_eq!(parse_asn("AS-1"), None);
        assert_eq!(parse_asn("AS99999999999"), None);
        assert_eq!(parse_asn("Google LLC"), None);
    }

    #[test]
    fn test_url_template_substitution() {
        let lookup = HttpAsnLookup::new(&AsnConfig::default()).unwrap();
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        assert_eq!(lookup.url_for(ip), "https://ipapi.co/8.8.8.8/json/");
    }
}
