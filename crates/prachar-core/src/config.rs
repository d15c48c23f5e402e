//! Configuration management for prachar
//!
//! Handles loading and validation of the TOML configuration file. Secrets
//! (bot token, channel) are not stored here; see [`crate::credentials`].

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Telegram Bot API settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Publishing behaviour
    #[serde(default)]
    pub publish: PublishConfig,

    /// Storage-related settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Base URL of the Bot API (default: https://api.telegram.org)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Pause before each reply post in milliseconds (default: 600)
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
}

impl TelegramConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            request_timeout_seconds: default_request_timeout_seconds(),
            reply_delay_ms: default_reply_delay_ms(),
        }
    }
}

/// What to do when a secondary media item cannot be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryFailurePolicy {
    /// Log the item as failed and post the rest
    #[default]
    Skip,
    /// Abort the whole campaign before anything is posted
    Abort,
}

/// Publishing configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub secondary_failure_policy: SecondaryFailurePolicy,

    /// Give replies a short "title (n/total)" caption
    #[serde(default)]
    pub reply_captions: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Base data directory (default: ~/.prachar/)
    #[serde(
        default = "default_data_dir",
        deserialize_with = "deserialize_data_dir"
    )]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Directory holding per-run step logs
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_reply_delay_ms() -> u64 {
    600
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".prachar")
}

/// Expands a leading `~` to the home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let home = match dirs::home_dir() {
        Some(home) => home,
        None => return path.to_path_buf(),
    };
    if path_str == "~" {
        home
    } else if let Some(rest) = path_str.strip_prefix("~/") {
        home.join(rest)
    } else {
        path.to_path_buf()
    }
}

fn deserialize_data_dir<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path_str = String::deserialize(deserializer)?;
    Ok(expand_tilde(Path::new(&path_str)))
}

impl Config {
    /// Validates the configuration values
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if:
    /// - `telegram.request_timeout_seconds` is 0
    /// - `telegram.api_base` is not an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "request_timeout_seconds must be > 0".to_string(),
            ));
        }

        let base = &self.telegram.api_base;
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(ConfigError::InvalidValue(format!(
                "api_base must be an http(s) URL, got '{}'",
                base
            )));
        }

        Ok(())
    }
}

/// Returns the default configuration file path (`~/.prachar/config.toml`)
pub fn get_default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

/// Loads configuration from the specified path
///
/// A missing file is created with defaults. An existing file must parse and
/// validate; it is never replaced by defaults.
///
/// # Errors
/// - `ConfigError::ParseError` if the file is not valid TOML for [`Config`]
/// - `ConfigError::InvalidValue` if [`Config::validate`] rejects it
/// - `ConfigError::Io` on read or create failures
pub fn load_config_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let default_config = Config::default();
        let toml_str = toml::to_string_pretty(&default_config)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, &toml_str)?;

        tracing::info!("Created default configuration file at {:?}", path);
        return Ok(default_config);
    }

    let content = fs::read_to_string(path)?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
    config.validate()?;

    Ok(config)
}

/// Loads configuration from the default path (`~/.prachar/config.toml`)
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from_path(&get_default_config_path())
}
