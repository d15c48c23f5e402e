//! Diagnostic logging for prachar
//!
//! Human-facing diagnostics go to stderr through `tracing-subscriber`; when a
//! log directory is configured they are also appended to `prachar.log` there.
//! The per-run audit trail lives in [`crate::step_log`], not here.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Diagnostic log file name inside the log directory
pub const DEFAULT_LOG_FILE: &str = "prachar.log";

/// Errors raised while installing the diagnostic logger
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(String),

    /// A global subscriber was already installed
    #[error("Failed to initialize logger: {0}")]
    InitializationFailed(String),
}

/// Verbosity of prachar's own targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Maps the number of `-v` flags to a level
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration for the diagnostic logger
#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
    /// Directory for `prachar.log`; stderr only when `None`
    pub log_dir: Option<PathBuf>,
    pub level: LogLevel,
    /// Whether to log to stderr
    pub log_to_stderr: bool,
}

impl LoggerConfig {
    /// Stderr-only logging at the default level
    pub fn stderr() -> Self {
        Self {
            log_dir: None,
            level: LogLevel::Info,
            log_to_stderr: true,
        }
    }

    /// Also writes `prachar.log` into `log_dir`
    pub fn with_log_dir(mut self, log_dir: PathBuf) -> Self {
        self.log_dir = Some(log_dir);
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_stderr(mut self, enabled: bool) -> Self {
        self.log_to_stderr = enabled;
        self
    }

    /// Full path to the diagnostic log file, if file output is enabled
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_dir.as_deref().map(|dir| dir.join(DEFAULT_LOG_FILE))
    }

    /// Filter used when `RUST_LOG` is unset
    pub fn default_filter(&self) -> String {
        format!(
            "prachar={level},prachar_core={level},prachar_adapters={level},prachar_cli={level}",
            level = self.level.as_str()
        )
    }
}

/// Guard that keeps the file writer alive
///
/// Dropping it flushes buffered lines to `prachar.log`.
pub struct LoggerGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

fn ensure_dir(dir: &Path) -> Result<(), LoggerError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            LoggerError::DirectoryCreationFailed(format!("{}: {}", dir.display(), e))
        })?;
    }
    Ok(())
}

/// Initializes the global tracing subscriber
///
/// # Returns
/// A `LoggerGuard` that must be kept alive for the duration of the program.
///
/// # Errors
/// Returns `LoggerError` if the log directory cannot be created or a global
/// subscriber is already installed
pub fn init_logger(config: LoggerConfig) -> Result<LoggerGuard, LoggerError> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    let stderr_layer = config.log_to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            ensure_dir(dir)?;
            let appender = tracing_appender::rolling::never(dir, DEFAULT_LOG_FILE);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggerError::InitializationFailed(e.to_string()))?;

    tracing::debug!(
        log_file = ?config.log_file_path(),
        level = config.level.as_str(),
        "Logger initialized"
    );

    Ok(LoggerGuard { _guard: guard })
}
