//! Configuration management for OAuth 1.0a signing and verification.
//!
//! Parses `oauth1.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ## Environment Variable Expansion
//!
//! Consumer credentials support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `consumers.key`
//! - `consumers.secret`
//! - `consumers.accessor_secret`

mod expand;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "oauth1.toml";

/// Default timestamp window: five minutes into the past and into the future.
pub const DEFAULT_TIMESTAMP_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Highest protocol version accepted by default.
pub const DEFAULT_MAX_VERSION: f64 = 1.0;

/// Signature method used when neither the message nor the consumer names one.
pub const DEFAULT_SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Replay-protection validator configuration.
    pub validator: ValidatorConfig,
    /// Signing defaults.
    pub signer: SignerConfig,
    /// Known consumers.
    pub consumers: Vec<ConsumerConfig>,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Replay-protection validator configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Accepted clock skew in milliseconds, applied both into the past and into the future.
    pub timestamp_window_ms: i64,
    /// Highest `oauth_version` accepted.
    pub max_version: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timestamp_window_ms: DEFAULT_TIMESTAMP_WINDOW_MS,
            max_version: DEFAULT_MAX_VERSION,
        }
    }
}

/// Signing defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Signature method for consumers that do not name one.
    pub signature_method: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            signature_method: DEFAULT_SIGNATURE_METHOD.to_owned(),
        }
    }
}

/// A consumer identity.
#[derive(Debug, Deserialize)]
pub struct ConsumerConfig {
    /// Consumer key (`oauth_consumer_key`).
    pub key: String,
    /// Shared secret for HMAC-SHA1 and PLAINTEXT.
    #[serde(default)]
    pub secret: Option<String>,
    /// Accessor secret for the `-Accessor` signature method variants.
    #[serde(default)]
    pub accessor_secret: Option<String>,
    /// Preferred signature method for this consumer.
    #[serde(default)]
    pub signature_method: Option<String>,
    /// PEM file holding the consumer's RSA private key (signing side).
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,
    /// PEM file holding the consumer's RSA public key (verifying side).
    #[serde(default)]
    pub public_key_file: Option<PathBuf>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`consumers.secret`").
        field: String,
        /// Error message (e.g., "${`CONSUMER_SECRET`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `oauth1.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// Relative key file paths are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml_str(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.resolve_paths(base_dir);
        config.validate()?;
        Ok(config)
    }

    /// Find a consumer by key.
    #[must_use]
    pub fn consumer(&self, key: &str) -> Option<&ConsumerConfig> {
        self.consumers.iter().find(|c| c.key == key)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml_str(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_validator()?;
        require_non_empty(&self.signer.signature_method, "signer.signature_method")?;
        self.validate_consumers()?;
        Ok(())
    }

    fn validate_validator(&self) -> Result<(), ConfigError> {
        if self.validator.timestamp_window_ms <= 0 {
            return Err(ConfigError::Validation(
                "validator.timestamp_window_ms must be greater than 0".to_owned(),
            ));
        }
        let max_version = self.validator.max_version;
        if max_version.is_nan() || max_version < DEFAULT_MAX_VERSION {
            return Err(ConfigError::Validation(format!(
                "validator.max_version must be at least {DEFAULT_MAX_VERSION:.1}"
            )));
        }
        Ok(())
    }

    fn validate_consumers(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for consumer in &self.consumers {
            require_non_empty(&consumer.key, "consumers.key")?;
            if !seen.insert(consumer.key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "consumer key {} is configured more than once",
                    consumer.key
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in consumer credentials.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        for consumer in &mut self.consumers {
            consumer.key = expand::expand_env(&consumer.key, "consumers.key")?;
            if let Some(ref secret) = consumer.secret {
                consumer.secret = Some(expand::expand_env(secret, "consumers.secret")?);
            }
            if let Some(ref secret) = consumer.accessor_secret {
                consumer.accessor_secret =
                    Some(expand::expand_env(secret, "consumers.accessor_secret")?);
            }
        }
        Ok(())
    }

    /// Resolve relative key file paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        for consumer in &mut self.consumers {
            if let Some(ref path) = consumer.private_key_file {
                consumer.private_key_file = Some(config_dir.join(path));
            }
            if let Some(ref path) = consumer.public_key_file {
                consumer.public_key_file = Some(config_dir.join(path));
            }
        }
    }
}
