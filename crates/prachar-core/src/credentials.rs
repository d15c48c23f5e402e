//! Bot credential management
//!
//! Loads the Telegram bot token and destination channel from the process
//! environment, after optionally merging a local dotenv file.

use crate::campaign::ChannelId;
use crate::error::ConfigError;
use std::env;
use std::fmt;
use std::path::Path;

/// Environment variable holding the bot token
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable holding the destination channel
pub const CHANNEL_ENV: &str = "TELEGRAM_CHANNEL";

/// Dotenv file read at startup unless overridden
pub const DEFAULT_ENV_FILE: &str = ".env.local";

/// A bot token that never appears in logs
///
/// `Debug` and `Display` are masked; use [`SecretToken::expose`] only when
/// building the request URL.
#[derive(Clone)]
pub struct SecretToken {
    token: String,
}

impl SecretToken {
    /// Wraps a token; `None` if it is empty or whitespace-only
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self {
                token: trimmed.to_string(),
            })
        }
    }

    /// Returns the raw token. Never log the returned value.
    pub fn expose(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED BOT TOKEN]")
    }
}

/// The two values a run cannot start without
#[derive(Debug, Clone)]
pub struct ChannelCredentials {
    pub token: SecretToken,
    pub channel: ChannelId,
}

impl ChannelCredentials {
    /// Reads `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHANNEL`
    ///
    /// # Errors
    /// `ConfigError::MissingCredential` naming the first variable that is
    /// unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = env::var(BOT_TOKEN_ENV)
            .ok()
            .and_then(SecretToken::new)
            .ok_or(ConfigError::MissingCredential(BOT_TOKEN_ENV))?;

        let channel = env::var(CHANNEL_ENV)
            .ok()
            .and_then(|value| ChannelId::new(value).ok())
            .ok_or(ConfigError::MissingCredential(CHANNEL_ENV))?;

        Ok(Self { token, channel })
    }

    /// Setup instructions shown when a credential is missing
    pub fn missing_guidance() -> String {
        format!(
            r#"Telegram credentials are not configured.

To set them up:

1. Create a {DEFAULT_ENV_FILE} file next to your campaigns:
   {BOT_TOKEN_ENV}=123456:ABC-your-bot-token
   {CHANNEL_ENV}=@your_channel

2. Or export them directly:
   export {BOT_TOKEN_ENV}=123456:ABC-your-bot-token
   export {CHANNEL_ENV}=@your_channel

The bot must be an administrator of the channel with permission to post.
Create a bot with @BotFather: https://core.telegram.org/bots#botfather"#
        )
    }
}

/// Merges a dotenv file into the process environment
///
/// Values from the file override variables already set, matching how the
/// poster scripts have always treated `.env.local`.
///
/// # Returns
/// * `Ok(true)` - file found and loaded
/// * `Ok(false)` - no such file; the process environment is used as is
pub fn load_env_file(path: &Path) -> Result<bool, ConfigError> {
    if !path.exists() {
        return Ok(false);
    }
    dotenvy::from_path_override(path)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
    Ok(true)
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::env;
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serializes environment mutation across tests and restores on drop
    pub struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        pub fn new(keys: &[&'static str]) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let saved = keys.iter().map(|k| (*k, env::var(k).ok())).collect();
            Self { saved, _lock: lock }
        }

        pub fn set(&self, key: &str, value: &str) {
            env::set_var(key, value);
        }

        pub fn unset(&self, key: &str) {
            env::remove_var(key);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original) in &self.saved {
                match original {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
