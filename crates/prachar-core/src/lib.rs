//! Prachar Core - Domain logic for publishing artisan campaigns
//!
//! This crate contains the campaign model, media resolution, caption
//! formatting, the durable step logger and the channel publisher, along with
//! the port definitions the adapters implement (Hexagonal Architecture).

pub mod campaign;
pub mod caption;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod media;
pub mod metadata;
pub mod ports;
pub mod publisher;
pub mod report;
pub mod step_log;

// Re-export primary types for convenient access
pub use campaign::{Campaign, CampaignDefinition, CampaignError, ChannelId, SkippedAsset};
pub use caption::{format_captions, CaptionOptions, Captions, TELEGRAM_CAPTION_LIMIT};
pub use config::{
    get_default_config_path, load_config, load_config_from_path, Config, PublishConfig,
    SecondaryFailurePolicy, StorageConfig, TelegramConfig,
};
pub use credentials::{load_env_file, ChannelCredentials, SecretToken, DEFAULT_ENV_FILE};
pub use error::{ConfigError, PracharError};
pub use logging::{init_logger, LogLevel, LoggerConfig, LoggerError, LoggerGuard};
pub use media::{resolve_media, MediaError, MediaItem, MediaKind, MediaPayload, MediaSource};
pub use metadata::{CallToAction, CampaignMetadata, Localized, PriceRange};
pub use ports::{
    MessageId, MessagingSurfacePort, SendMediaRequest, StepEvent, StepLogError, StepLogPort,
    StepOperation, StepPhase, SurfaceError, SurfaceErrorKind, SurfaceReceipt,
};
pub use publisher::{ChannelPublisher, PublisherSettings};
pub use report::{
    ItemReport, PostFailure, PostOutcome, PostRecord, PostState, PublishReport, PublishStatus,
    SkippedMedia,
};
pub use step_log::{read_events, StepLogger};
