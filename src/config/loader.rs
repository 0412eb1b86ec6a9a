//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml structure.
//! Secrets may live in the file or in the environment (`.env` is loaded by the binary).

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::notify::TelegramConfig;
use crate::application::AmountLimits;
use crate::domain::OperatorRoster;

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeSection,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub telegram: TelegramSection,
    pub operators: OperatorsSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub poller: PollerSection,
    #[serde(default)]
    pub logging: LoggingSection,
    /// Fallback order is file order
    #[serde(default)]
    pub providers: Vec<ProviderSection>,
}

/// Exchange limits
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeSection {
    #[serde(default = "default_exchange_name")]
    pub name: String,
    /// Minimum order in RUB
    #[serde(default = "default_min_amount")]
    pub min_amount: i64,
    /// Maximum order in RUB
    #[serde(default = "default_max_amount")]
    pub max_amount: i64,
}

impl Default for ExchangeSection {
    fn default() -> Self {
        Self {
            name: default_exchange_name(),
            min_amount: default_min_amount(),
            max_amount: default_max_amount(),
        }
    }
}

fn default_exchange_name() -> String {
    "OSWBIT".to_string()
}

fn default_min_amount() -> i64 {
    1_000
}

fn default_max_amount() -> i64 {
    500_000
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    /// Per-request timeout for every provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Telegram Bot API section
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSection {
    #[serde(default = "default_telegram_url")]
    pub api_url: String,
    /// Prefer the BOT_TOKEN env var over committing this
    #[serde(default)]
    pub bot_token: Option<String>,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            api_url: default_telegram_url(),
            bot_token: None,
        }
    }
}

fn default_telegram_url() -> String {
    "https://api.telegram.org".to_string()
}

impl TelegramSection {
    /// Get bot token with environment variable override
    /// Checks BOT_TOKEN env var first, falls back to config value
    pub fn get_bot_token(&self) -> Option<String> {
        std::env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.bot_token.clone().filter(|t| !t.is_empty()))
    }
}

/// Who may drive orders
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorsSection {
    pub admin_id: i64,
    pub operator_chat_id: i64,
    /// Where admin alerts go; the admin's private chat when unset
    #[serde(default)]
    pub admin_chat_id: Option<i64>,
    #[serde(default)]
    pub operator_ids: Vec<i64>,
}

impl OperatorsSection {
    pub fn admin_chat(&self) -> i64 {
        self.admin_chat_id.unwrap_or(self.admin_id)
    }
}

/// Order persistence
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    crate::adapters::storage::DEFAULT_ORDER_FILE.to_string()
}

impl StoreSection {
    /// Path with `~` expanded
    pub fn expanded_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

/// Status poller section
#[derive(Debug, Clone, Deserialize)]
pub struct PollerSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Pending orders older than this are cancelled
    #[serde(default = "default_payment_timeout")]
    pub payment_timeout_minutes: i64,
}

impl Default for PollerSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            payment_timeout_minutes: default_payment_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}

fn default_payment_timeout() -> i64 {
    30
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    NicePay,
    Greengo,
    PspWare,
}

impl ProviderKind {
    fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::NicePay => "NICEPAY",
            ProviderKind::Greengo => "GREENGO",
            ProviderKind::PspWare => "PSPWARE",
        }
    }
}

/// One payment provider in the fallback chain
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    pub name: String,
    pub kind: ProviderKind,
    /// Overrides the adapter's default API URL
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub sell_capable: bool,
    #[serde(default = "default_true")]
    pub buy_capable: bool,
    /// Canonical payment type -> provider payment type
    #[serde(default)]
    pub pay_type_mapping: HashMap<String, String>,
    /// NicePay currency
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub merchant_key: Option<String>,
    #[serde(default)]
    pub merchant_token_key: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ProviderSection {
    /// Config value when set, otherwise `<KIND>_<SUFFIX>` from the environment
    fn secret(&self, value: &Option<String>, suffix: &str) -> Option<String> {
        if let Some(v) = value {
            if !v.is_empty() {
                return Some(v.clone());
            }
        }
        std::env::var(format!("{}_{}", self.kind.env_prefix(), suffix))
            .ok()
            .filter(|v| !v.is_empty())
    }

    pub fn get_api_key(&self) -> Option<String> {
        self.secret(&self.api_key, "API_KEY")
    }

    pub fn get_api_secret(&self) -> Option<String> {
        self.secret(&self.api_secret, "API_SECRET")
    }

    pub fn get_merchant_id(&self) -> Option<String> {
        self.secret(&self.merchant_id, "MERCHANT_ID")
    }

    pub fn get_merchant_key(&self) -> Option<String> {
        self.secret(&self.merchant_key, "MERCHANT_KEY")
    }

    pub fn get_merchant_token_key(&self) -> Option<String> {
        self.secret(&self.merchant_token_key, "MERCHANT_TOKEN_KEY")
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Missing secret for provider {provider}: {name}")]
    MissingSecret { provider: String, name: String },
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exchange.min_amount <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "min_amount must be > 0, got {}",
                self.exchange.min_amount
            )));
        }

        if self.exchange.min_amount > self.exchange.max_amount {
            return Err(ConfigError::ValidationError(format!(
                "min_amount ({}) must not exceed max_amount ({})",
                self.exchange.min_amount, self.exchange.max_amount
            )));
        }

        if self.http.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.operators.admin_id == 0 {
            return Err(ConfigError::ValidationError(
                "admin_id must be set".to_string(),
            ));
        }

        if self.operators.operator_chat_id == 0 {
            return Err(ConfigError::ValidationError(
                "operator_chat_id must be set".to_string(),
            ));
        }

        if self.poller.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }

        if self.poller.payment_timeout_minutes <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "payment_timeout_minutes must be > 0, got {}",
                self.poller.payment_timeout_minutes
            )));
        }

        if self.store.path.is_empty() {
            return Err(ConfigError::ValidationError(
                "store path cannot be empty".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "provider name cannot be empty".to_string(),
                ));
            }
            if !names.insert(provider.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate provider name: {}",
                    provider.name
                )));
            }
            if !provider.sell_capable && !provider.buy_capable {
                return Err(ConfigError::ValidationError(format!(
                    "provider {} accepts neither buy nor sell orders",
                    provider.name
                )));
            }
        }

        if !self.providers.iter().any(|p| p.enabled) {
            return Err(ConfigError::ValidationError(
                "at least one enabled provider is required".to_string(),
            ));
        }

        Ok(())
    }

    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderSection> {
        self.providers.iter().filter(|p| p.enabled)
    }

    pub fn payment_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.poller.payment_timeout_minutes)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poller.poll_interval_secs)
    }

    /// Telegram settings; None when no bot token is configured
    pub fn telegram_config(&self) -> Option<TelegramConfig> {
        let bot_token = self.telegram.get_bot_token()?;
        Some(TelegramConfig {
            api_base_url: self.telegram.api_url.clone(),
            bot_token,
            operator_chat_id: self.operators.operator_chat_id,
            admin_chat_id: self.operators.admin_chat(),
            timeout: self.http.timeout(),
        })
    }
}

impl From<&Config> for AmountLimits {
    fn from(config: &Config) -> Self {
        AmountLimits {
            min_amount: config.exchange.min_amount,
            max_amount: config.exchange.max_amount,
        }
    }
}

impl From<&Config> for OperatorRoster {
    fn from(config: &Config) -> Self {
        OperatorRoster::new(
            config.operators.admin_id,
            config.operators.operator_chat_id,
            config.operators.operator_ids.iter().copied(),
        )
    }
}
