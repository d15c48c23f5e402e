//! CLI command implementations
//!
//! Each subcommand has its own module with the implementation logic.

pub mod post;
pub mod preview;

use anyhow::{bail, Context, Result};
use clap::Args;
use prachar_core::{CampaignDefinition, MediaSource};
use std::path::PathBuf;

/// Where the campaign comes from: a campaign folder, or a metadata file plus
/// explicit media
#[derive(Args, Debug, Clone)]
pub struct CampaignSourceArgs {
    /// Campaign folder containing metadata.json and assets/
    #[arg(
        long,
        value_name = "DIR",
        conflicts_with = "metadata",
        required_unless_present = "metadata"
    )]
    pub campaign: Option<PathBuf>,

    /// Metadata JSON file, used with explicit media arguments
    #[arg(long, value_name = "FILE", requires = "media")]
    pub metadata: Option<PathBuf>,

    /// Media files, http(s) URLs or data: URLs; the first becomes the head post
    #[arg(value_name = "MEDIA", requires = "metadata")]
    pub media: Vec<String>,
}

impl CampaignSourceArgs {
    pub fn load(&self) -> Result<CampaignDefinition> {
        match (&self.campaign, &self.metadata) {
            (Some(dir), _) => CampaignDefinition::load(dir)
                .with_context(|| format!("Failed to load campaign {}", dir.display())),
            (None, Some(metadata)) => {
                let media = self.media.iter().map(|m| MediaSource::from_arg(m)).collect();
                CampaignDefinition::from_parts(metadata, media)
                    .with_context(|| format!("Failed to load metadata {}", metadata.display()))
            }
            (None, None) => bail!("either --campaign or --metadata is required"),
        }
    }
}

/// Format file size in human-readable format
pub(crate) fn format_file_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
