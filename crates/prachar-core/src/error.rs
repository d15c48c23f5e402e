//! Common error types for prachar
//!
//! Domain-specific errors live next to the code that raises them and are
//! re-exported here. `PracharError` wraps them all for `?` propagation.

use thiserror::Error;

pub use crate::campaign::CampaignError;
pub use crate::logging::LoggerError;
pub use crate::media::MediaError;
pub use crate::ports::step_log::StepLogError;
pub use crate::ports::surface::SurfaceError;

/// Top-level error type
#[derive(Debug, Error)]
pub enum PracharError {
    /// Missing or invalid configuration; nothing has been posted
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Campaign definition could not be loaded
    #[error("Campaign error: {0}")]
    Campaign(#[from] CampaignError),

    /// Media source could not be resolved
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Messaging surface call failed
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// Step log write failed
    #[error("Step log error: {0}")]
    StepLog(#[from] StepLogError),

    /// Diagnostic logger setup failed
    #[error("Logger error: {0}")]
    Logger(#[from] LoggerError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Precondition failures, raised before any network activity
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required credential is not set
    #[error("Missing required setting: {0} is not set")]
    MissingCredential(&'static str),

    /// Campaign has no media
    #[error("Campaign has no media items")]
    EmptyCampaign,

    /// File not found
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Parse error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
