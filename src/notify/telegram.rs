//! Chat-bot messaging API client.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::NotifierConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("messaging API returned status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Posts messages to a single chat through the Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramClient {
    /// Build a client, or `None` when credentials are missing.
    pub fn from_config(config: &NotifierConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some((token, chat_id)) = config.credentials() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Some(Self {
            http,
            endpoint: endpoint(&config.api_base, token),
            chat_id: chat_id.to_string(),
        }))
    }

    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The endpoint embeds the bot token.
        f.debug_struct("TelegramClient")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

fn endpoint(api_base: &str, token: &str) -> String {
    format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_format() {
        assert_eq!(
            endpoint("https://api.telegram.org/", "123:abc"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_missing_credentials_builds_nothing() {
        let config = NotifierConfig::default();
        assert!(TelegramClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_debug_hides_token() {
        let config = NotifierConfig {
            bot_token: Some("123:secret".into()),
            chat_id: Some("-100".into()),
            ..NotifierConfig::default()
        };
        let client = TelegramClient::from_config(&config).unwrap().unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("-100"));
    }
}
