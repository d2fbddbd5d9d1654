//! Configuration models for reviewwatch.
//!
//! Every section has defaults, so running without a config file is the
//! common case: the three credentials come from the environment.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

/// Top-level configuration for reviewwatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Homework review API
    #[serde(default)]
    pub practicum: PracticumConfig,

    /// Telegram bot used for notifications
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Polling loop settings
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Homework review API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticumConfig {
    /// Status endpoint (absolute URL)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// OAuth token (can also be set via PRACTICUM_TOKEN env var)
    #[serde(default)]
    pub token: Option<String>,

    /// Environment variable name for the OAuth token
    #[serde(default = "default_practicum_token_env")]
    pub token_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for PracticumConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            token_env: default_practicum_token_env(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bot token (can also be set via TELEGRAM_TOKEN env var)
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_telegram_token_env")]
    pub token_env: String,

    /// Destination chat (can also be set via TELEGRAM_CHAT_ID env var)
    #[serde(default)]
    pub chat_id: Option<String>,

    #[serde(default = "default_chat_id_env")]
    pub chat_id_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: None,
            token_env: default_telegram_token_env(),
            chat_id: None,
            chat_id_env: default_chat_id_env(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Polling loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Fixed delay between cycles, in seconds
    #[serde(default = "default_retry_period")]
    pub retry_period_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            retry_period_secs: default_retry_period(),
        }
    }
}

fn default_endpoint() -> String {
    "https://practicum.yandex.ru/api/user_api/homework_statuses/".to_string()
}

fn default_practicum_token_env() -> String {
    "PRACTICUM_TOKEN".to_string()
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_token_env() -> String {
    "TELEGRAM_TOKEN".to_string()
}

fn default_chat_id_env() -> String {
    "TELEGRAM_CHAT_ID".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_period() -> u64 {
    600
}

/// The three secrets the bot cannot run without.
///
/// Values that were not found resolve to an empty string; use
/// [`Credentials::check_tokens`] before handing them to the clients.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("practicum_token", &redact(&self.practicum_token))
            .field("telegram_token", &redact(&self.telegram_token))
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<missing>" } else { "<redacted>" }
}

impl Credentials {
    /// True when all three values are present.
    pub fn check_tokens(&self) -> bool {
        self.missing().is_empty()
    }

    /// Names of the values that are blank.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("practicum token", &self.practicum_token),
            ("telegram token", &self.telegram_token),
            ("telegram chat id", &self.telegram_chat_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolve credentials from config values or the process environment.
    pub fn resolve_credentials(&self) -> Credentials {
        self.resolve_credentials_with(|name| std::env::var(name).ok())
    }

    /// Resolve credentials using `lookup` for environment variables.
    ///
    /// An explicit value in the config wins over the environment.
    pub fn resolve_credentials_with<F>(&self, lookup: F) -> Credentials
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |explicit: &Option<String>, env_var: &str| match explicit {
            Some(value) => expand_env_vars_with(value, &lookup),
            None => lookup(env_var).unwrap_or_default(),
        };

        Credentials {
            practicum_token: resolve(&self.practicum.token, &self.practicum.token_env),
            telegram_token: resolve(&self.telegram.token, &self.telegram.token_env),
            telegram_chat_id: resolve(&self.telegram.chat_id, &self.telegram.chat_id_env),
        }
    }

    /// Delay between polling cycles.
    pub fn retry_period(&self) -> Duration {
        Duration::from_secs(self.polling.retry_period_secs)
    }
}

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder regex"));

/// Expand ${VAR_NAME} placeholders using `lookup`.
///
/// If the variable is not set, the placeholder is left unchanged.
fn expand_env_vars_with<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_PLACEHOLDER
        .replace_all(s, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
