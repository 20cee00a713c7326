//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Redis connection URL.
pub const ENV_REDIS_URL: &str = "EDGE_GUARD_REDIS_URL";
/// Notification bot token.
pub const ENV_TELEGRAM_TOKEN: &str = "EDGE_GUARD_TELEGRAM_TOKEN";
/// Notification chat id.
pub const ENV_TELEGRAM_CHAT_ID: &str = "EDGE_GUARD_TELEGRAM_CHAT_ID";
/// Origin base URL.
pub const ENV_ORIGIN: &str = "EDGE_GUARD_ORIGIN";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<GuardConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => GuardConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay credentials and deployment-specific values from the environment.
///
/// Empty variables are ignored so an exported-but-blank variable does not
/// clobber a value from the file.
pub fn apply_env_overrides<F>(config: &mut GuardConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = var(ENV_REDIS_URL) {
        config.store.url = Some(url);
    }
    if let Some(token) = var(ENV_TELEGRAM_TOKEN) {
        config.notifier.bot_token = Some(token);
    }
    if let Some(chat) = var(ENV_TELEGRAM_CHAT_ID) {
        config.notifier.chat_id = Some(chat);
    }
    if let Some(origin) = var(ENV_ORIGIN) {
        config.origin.url = origin;
    }
}
