//! Application initialization and exit-code mapping
//!
//! Provides the initialization sequence shared by every command and the
//! mapping from errors to process exit codes.

use anyhow::{Context, Result};
use prachar_core::{
    get_default_config_path, init_logger, load_config_from_path, CampaignError, Config,
    ConfigError, LogLevel, LoggerConfig, LoggerGuard, PracharError,
};
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

/// Exit code for failures that happen before anything is posted
pub const EXIT_PRECONDITION: u8 = 4;

/// Exit code for any other error
pub const EXIT_FAILURE: u8 = 1;

/// Application context holding initialized components
pub struct AppContext {
    /// Application configuration
    pub config: Arc<Config>,
    log_level: LogLevel,
    /// Keeps the file writer alive until exit
    logger_guard: Option<LoggerGuard>,
}

impl AppContext {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Installs the diagnostic logger
    ///
    /// With `log_dir` set, diagnostics are also written to `prachar.log`
    /// there. Only the first call has an effect.
    pub fn start_logging(&mut self, log_dir: Option<PathBuf>) -> Result<()> {
        if self.logger_guard.is_some() {
            return Ok(());
        }

        let mut logger_config = LoggerConfig::stderr().with_level(self.log_level);
        if let Some(dir) = log_dir {
            logger_config = logger_config.with_log_dir(dir.clone());
            setup_panic_hook(dir);
        }

        let guard = init_logger(logger_config).context("Failed to initialize logger")?;
        self.logger_guard = Some(guard);
        Ok(())
    }
}

/// Application initialization options
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Config file override; `~/.prachar/config.toml` otherwise
    pub config_path: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl InitOptions {
    pub fn new(config_path: Option<PathBuf>, verbosity: u8) -> Self {
        Self {
            config_path,
            log_level: LogLevel::from_verbosity(verbosity),
        }
    }

    fn resolved_config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(get_default_config_path)
    }
}

/// Initializes the application
///
/// Loads the configuration. Logging is started later by the command, once
/// its preconditions hold, so a rejected run leaves no log files behind.
pub fn initialize(options: &InitOptions) -> Result<AppContext> {
    let path = options.resolved_config_path();
    let config = load_config_from_path(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    Ok(AppContext {
        config: Arc::new(config),
        log_level: options.log_level,
        logger_guard: None,
    })
}

/// Chooses the exit code for a failed command
///
/// Configuration and campaign-loading errors anywhere in the chain are
/// precondition failures; everything else is a generic failure.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let precondition = err.chain().any(|cause| {
        cause.downcast_ref::<ConfigError>().is_some()
            || cause.downcast_ref::<CampaignError>().is_some()
            || matches!(
                cause.downcast_ref::<PracharError>(),
                Some(PracharError::Config(_)) | Some(PracharError::Campaign(_))
            )
    });
    if precondition {
        EXIT_PRECONDITION
    } else {
        EXIT_FAILURE
    }
}

/// Sets up a panic hook that points the user at the diagnostic log
fn setup_panic_hook(log_dir: PathBuf) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic payload".to_string()
        };

        error!("FATAL ERROR at {}: {}", location, message);

        eprintln!();
        eprintln!("prachar encountered a fatal error and must exit.");
        eprintln!("Location: {}", location);
        eprintln!("Error: {}", message);
        eprintln!();
        eprintln!("Step logs and prachar.log are in: {}", log_dir.display());
        eprintln!("Check the latest step log before re-running: posts already made will be duplicated.");
        eprintln!();

        default_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_init_options_verbose() {
        assert_eq!(InitOptions::new(None, 1).log_level, LogLevel::Debug);
        assert_eq!(InitOptions::new(None, 0).log_level, LogLevel::Info);
    }

    #[test]
    fn test_initialize_creates_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prachar").join("config.toml");

        let ctx = initialize(&InitOptions::new(Some(path.clone()), 0)).unwrap();
        assert!(path.exists());
        assert_eq!(ctx.config().telegram.request_timeout_seconds, 30);
    }

    #[test]
    fn test_initialize_reads_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[telegram]\nreply_delay_ms = 0\n").unwrap();

        let ctx = initialize(&InitOptions::new(Some(path), 0)).unwrap();
        assert_eq!(ctx.config().telegram.reply_delay_ms, 0);
    }

    #[test]
    fn test_initialize_rejects_broken_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[telegram]\nrequest_timeout_seconds = \"thirty\"\n").unwrap();

        let err = initialize(&InitOptions::new(Some(path), 0))
            .err()
            .expect("broken config must not load");
        assert_eq!(exit_code_for(&err), EXIT_PRECONDITION);
    }

    #[test]
    fn test_exit_code_for_preconditions() {
        let err = anyhow::Error::new(ConfigError::MissingCredential("TELEGRAM_BOT_TOKEN"))
            .context("Missing Telegram credentials");
        assert_eq!(exit_code_for(&err), EXIT_PRECONDITION);

        let err = anyhow::Error::new(CampaignError::NoUsableMedia(PathBuf::from("c")));
        assert_eq!(exit_code_for(&err), EXIT_PRECONDITION);

        let err = anyhow::Error::new(PracharError::Config(ConfigError::EmptyCampaign));
        assert_eq!(exit_code_for(&err), EXIT_PRECONDITION);
    }

    #[test]
    fn test_exit_code_for_other_errors() {
        let err = anyhow::anyhow!("disk exploded").context("Failed to open step log");
        assert_eq!(exit_code_for(&err), EXIT_FAILURE);
    }
}
