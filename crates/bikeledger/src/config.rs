//! Configuration management for bikeledger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "bikeledger";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "records.db";

/// Default directory name for rendered invoices.
const INVOICE_DIR_NAME: &str = "invoices";

/// Prefix of environment variable overrides.
const ENV_PREFIX: &str = "BIKELEDGER_";

/// Keys whose environment values are taken verbatim rather than parsed, so
/// `+44` or `0123` stay strings instead of becoming numbers.
const VERBATIM_ENV_KEYS: &[&str] = &[
    "storage.database_path",
    "auth.username",
    "auth.password",
    "auth.country_code",
    "auth.provider_url",
    "auth.provider_api_key",
    "notify.webhook_url",
    "invoice.business_name",
    "invoice.output_dir",
];

fn country_code_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^\+\d{1,4}$").expect("country code pattern is valid"))
}

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `BIKELEDGER_`, sections split on `__`)
/// 2. TOML config file at `~/.config/bikeledger/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Customer notification configuration.
    pub notify: NotifyConfig,
    /// Invoice rendering configuration.
    pub invoice: InvoiceConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/bikeledger/records.db`
    pub database_path: Option<PathBuf>,
}

/// Which credential flow the auth gate runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategyKind {
    /// Username and password checked against configuration.
    #[default]
    Static,
    /// Phone number plus a locally generated one-time code.
    LocalOtp,
    /// Phone number plus a one-time code issued by an identity provider.
    DelegatedOtp,
}

impl AuthStrategyKind {
    /// Whether a code requested by an earlier run can still be checked.
    ///
    /// Locally generated codes live only in the process that sent them.
    #[must_use]
    pub fn accepts_earlier_codes(self) -> bool {
        matches!(self, Self::DelegatedOtp)
    }
}

impl std::fmt::Display for AuthStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::LocalOtp => write!(f, "local_otp"),
            Self::DelegatedOtp => write!(f, "delegated_otp"),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Active strategy.
    pub strategy: AuthStrategyKind,
    /// Operator username for the static strategy.
    pub username: String,
    /// Operator password for the static strategy.
    /// Static logins are refused while this is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Country code prefixed to phone numbers entered without one.
    pub country_code: String,
    /// Lifetime of a locally generated one-time code, in seconds.
    pub code_ttl_secs: u64,
    /// Base URL of the identity provider (delegated strategy only).
    pub provider_url: Option<String>,
    /// API key sent to the identity provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_api_key: Option<String>,
    /// Timeout for identity provider requests, in seconds.
    pub http_timeout_secs: u64,
}

/// Customer notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Webhook receiving outgoing messages. Messages are only logged when unset.
    pub webhook_url: Option<String>,
    /// Timeout for webhook requests, in seconds.
    pub timeout_secs: u64,
}

/// Invoice rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceConfig {
    /// Business name printed in the invoice header and footer.
    pub business_name: String,
    /// Directory rendered invoices are written to.
    /// Defaults to `~/.local/share/bikeledger/invoices`
    pub output_dir: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            strategy: AuthStrategyKind::Static,
            username: "admin".to_string(),
            password: None,
            country_code: "+91".to_string(),
            code_ttl_secs: 300,
            provider_url: None,
            provider_api_key: None,
            http_timeout_secs: 30,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            business_name: "Taj Autogarage".to_string(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_env(config_path, ENV_PREFIX)
    }

    fn load_with_env(config_path: Option<PathBuf>, env_prefix: &str) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let env = Env::prefixed(env_prefix).split("__");

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(env.clone().ignore(VERBATIM_ENV_KEYS));
        for (key, value) in env.only(VERBATIM_ENV_KEYS).iter() {
            figment = figment.merge(Serialized::default(key.as_str(), value));
        }

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !country_code_pattern().is_match(&self.auth.country_code) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "country_code must look like +91, got {:?}",
                    self.auth.country_code
                ),
            });
        }

        if self.auth.strategy == AuthStrategyKind::DelegatedOtp
            && self
                .auth
                .provider_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(Error::ConfigValidation {
                message: "provider_url is required for the delegated_otp strategy".to_string(),
            });
        }

        if self.auth.code_ttl_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "code_ttl_secs must be greater than 0".to_string(),
            });
        }

        if self.auth.http_timeout_secs == 0 || self.notify.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "HTTP timeouts must be greater than 0".to_string(),
            });
        }

        if self.invoice.business_name.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "business_name cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the invoice output directory, resolving defaults if not set.
    #[must_use]
    pub fn invoice_dir(&self) -> PathBuf {
        self.invoice
            .output_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(INVOICE_DIR_NAME))
    }

    /// Get the one-time code lifetime as a Duration.
    #[must_use]
    pub fn code_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.code_ttl_secs)
    }

    /// Get the identity provider request timeout as a Duration.
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.http_timeout_secs)
    }

    /// Get the webhook request timeout as a Duration.
    #[must_use]
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify.timeout_secs)
    }
}
