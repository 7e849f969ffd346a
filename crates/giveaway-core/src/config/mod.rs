//! Configuration parsing and management.
//!
//! The bot reads a TOML file (`giveaway.toml` by default) with a `[bot]`
//! section naming the operator and the token source, and an optional
//! `[polling]` section tuning the update loop.
//!
//! ```toml
//! [bot]
//! operator_id = 475354897
//! admin_ids = [1234]
//! token_env = "GIVEAWAY_BOT_TOKEN"
//!
//! [polling]
//! timeout = "30s"
//! error_backoff = "5s"
//! ```

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::contest::{ChatId, UserId};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GiveawayConfig {
    /// Bot identity and permissions.
    #[serde(default)]
    pub bot: BotConfig,

    /// Update loop tuning.
    #[serde(default)]
    pub polling: PollingConfig,
}

impl GiveawayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or `[bot]` lacks
    /// `operator_id`.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Checks values that parse but cannot work.
    ///
    /// Runs after CLI overrides are applied, so a missing file plus
    /// `--operator-id` is a valid setup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a zero operator id, an empty
    /// token variable name, an empty API URL or a zero poll timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.operator_id == 0 {
            return Err(ConfigError::Validation(
                "bot.operator_id must be set to the operator's user id".to_string(),
            ));
        }
        if self.bot.token_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bot.token_env must name an environment variable".to_string(),
            ));
        }
        if self.bot.api_base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bot.api_base_url must not be empty".to_string(),
            ));
        }
        if self.polling.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "polling.timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bot identity and permissions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotConfig {
    /// User id of the operator. Receives every contest outcome and may create
    /// contests.
    pub operator_id: i64,

    /// Additional users allowed to create contests and read debug output.
    #[serde(default)]
    pub admin_ids: Vec<i64>,

    /// Environment variable holding the bot token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Bot API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl BotConfig {
    /// The operator as a notification recipient.
    #[must_use]
    pub const fn operator(&self) -> ChatId {
        ChatId(self.operator_id)
    }

    /// Whether `user` may run privileged commands.
    #[must_use]
    pub fn is_admin(&self, user: UserId) -> bool {
        user.0 == self.operator_id || self.admin_ids.contains(&user.0)
    }

    /// Reads the bot token from [`Self::token_env`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if the variable is unset or
    /// empty.
    pub fn resolve_token(&self) -> Result<SecretString, ConfigError> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(SecretString::from(token)),
            _ => Err(ConfigError::MissingToken {
                env: self.token_env.clone(),
            }),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            operator_id: 0,
            admin_ids: Vec::new(),
            token_env: default_token_env(),
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_token_env() -> String {
    "GIVEAWAY_BOT_TOKEN".to_string()
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Update loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollingConfig {
    /// Server-side long-poll timeout for `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Pause after a failed poll before retrying.
    #[serde(default = "default_error_backoff")]
    #[serde(with = "humantime_serde")]
    pub error_backoff: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout: default_poll_timeout(),
            error_backoff: default_error_backoff(),
        }
    }
}

const fn default_poll_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_error_backoff() -> Duration {
    Duration::from_secs(5)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),

    /// The token variable is unset or empty.
    #[error("bot token not found: environment variable {env} is unset or empty")]
    MissingToken {
        /// The variable that was read.
        env: String,
    },
}
