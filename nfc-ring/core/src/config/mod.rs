//! TOML Configuration File Support
//!
//! Centralized configuration loading for the token client, supporting a TOML
//! configuration file at `~/.config/nfc-ring/client.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [transport]
//! daemon_addr = "127.0.0.1:8080"
//! connect_timeout_ms = 5000
//! read_timeout_ms = 1000
//! poll_interval_ms = 50
//!
//! [rings]
//! max_tokens_count = 10
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientOptions;
use crate::identity::MAX_TOKENS_COUNT;
use crate::ring_name::MAX_SLOT_COUNT;
use crate::transport::config::TransportConfig;

/// Smallest accepted `max_tokens_count` (one usable slot)
pub const MIN_TOKENS_COUNT: u32 = 2;

/// Largest accepted `max_tokens_count` (slot ids stay two digits)
pub const MAX_TOKENS_COUNT_LIMIT: u32 = MAX_SLOT_COUNT;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Transport section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// Daemon address (`host:port`)
    pub daemon_addr: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Read timeout in milliseconds
    pub read_timeout_ms: Option<u64>,

    /// Acquisition poll interval in milliseconds
    pub poll_interval_ms: Option<u64>,
}

/// Ring allocation section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RingsToml {
    /// Ring slots per user
    pub max_tokens_count: Option<u32>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Transport configuration section
    pub transport: TransportToml,

    /// Ring allocation section
    pub rings: RingsToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the token client
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Transport configuration
    pub transport: TransportConfig,

    /// Ring slots per user
    pub max_tokens_count: u32,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            max_tokens_count: MAX_TOKENS_COUNT,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Options for [`TokenClient`](crate::client::TokenClient)
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            poll_interval: self.transport.poll_interval(),
            max_tokens_count: self.max_tokens_count,
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.daemon_addr.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "daemon_addr must not be empty".to_string(),
            ));
        }
        if self.transport.read_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "read_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.transport.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if !(MIN_TOKENS_COUNT..=MAX_TOKENS_COUNT_LIMIT).contains(&self.max_tokens_count) {
            return Err(ConfigError::ValidationError(format!(
                "max_tokens_count must be between {MIN_TOKENS_COUNT} and {MAX_TOKENS_COUNT_LIMIT}, got {}",
                self.max_tokens_count
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/nfc-ring/client.toml` or
/// `~/.config/nfc-ring/client.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("nfc-ring").join("client.toml"))
}

/// Load configuration from all sources with proper priority
///
/// CLI overrides are not handled here; apply [`ConfigOverrides`] afterwards.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed,
/// or if the resulting values are out of range. A missing config file is not
/// an error (defaults are used).
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the process environment
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration from a specific path and an explicit environment lookup
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) {
    if let Some(ref addr) = toml.transport.daemon_addr {
        config.transport.daemon_addr = addr.clone();
    }
    if let Some(timeout) = toml.transport.connect_timeout_ms {
        config.transport.connect_timeout_ms = timeout;
    }
    if let Some(timeout) = toml.transport.read_timeout_ms {
        config.transport.read_timeout_ms = timeout;
    }
    if let Some(interval) = toml.transport.poll_interval_ms {
        config.transport.poll_interval_ms = interval;
    }
    if let Some(count) = toml.rings.max_tokens_count {
        config.max_tokens_count = count;
    }
}

/// Apply environment variable overrides to the config
///
/// Unparsable numeric values are ignored with a warning.
fn apply_env_config<F>(config: &mut ClientConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = env("NFC_RING_DAEMON_ADDR") {
        config.transport.daemon_addr = addr;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_env(&env, "NFC_RING_CONNECT_TIMEOUT") {
        config.transport.connect_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_env(&env, "NFC_RING_READ_TIMEOUT") {
        config.transport.read_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_env(&env, "NFC_RING_POLL_INTERVAL") {
        config.transport.poll_interval_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(count) = parse_env(&env, "NFC_RING_MAX_TOKENS") {
        config.max_tokens_count = count;
        config.source = ConfigSource::Env;
    }
}

fn parse_env<F, T>(env: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = env(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment value");
            None
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Daemon address override
    pub daemon_addr: Option<String>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,

    /// Read timeout override (milliseconds)
    pub read_timeout_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set daemon address override
    #[must_use]
    pub fn with_daemon_addr(mut self, addr: String) -> Self {
        self.daemon_addr = Some(addr);
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Set read timeout override
    #[must_use]
    pub fn with_read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout_ms = Some(ms);
        self
    }

    /// Apply overrides to a configuration and re-validate it
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if an override is out of range.
    pub fn apply(&self, config: &mut ClientConfig) -> Result<(), ConfigError> {
        if self.daemon_addr.is_some()
            || self.connect_timeout_ms.is_some()
            || self.read_timeout_ms.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref addr) = self.daemon_addr {
            config.transport.daemon_addr = addr.clone();
        }
        if let Some(timeout) = self.connect_timeout_ms {
            config.transport.connect_timeout_ms = timeout;
        }
        if let Some(timeout) = self.read_timeout_ms {
            config.transport.read_timeout_ms = timeout;
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
