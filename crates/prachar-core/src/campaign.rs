//! Campaign definition
//!
//! A campaign is the unit of work: metadata, an ordered media list whose first
//! entry becomes the head post, and the channel to publish to. Campaign
//! folders follow this layout:
//!
//! ```text
//! campaigns/<slug>/
//!   ├─ assets/          media files (posting order = metadata.assets or name sort)
//!   └─ metadata.json    titles / description / price / hashtags / cta / assets / head_index
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::error::ConfigError;
use crate::media::MediaSource;
use crate::metadata::CampaignMetadata;

/// Name of the metadata file inside a campaign folder
pub const METADATA_FILE: &str = "metadata.json";

/// Name of the media folder inside a campaign folder
pub const ASSETS_DIR: &str = "assets";

/// Destination channel (`@public_name` or numeric chat id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidValue(
                "channel identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One publishable campaign
///
/// Immutable after construction; the publisher only borrows it.
#[derive(Debug, Clone)]
pub struct Campaign {
    channel: ChannelId,
    metadata: CampaignMetadata,
    media: Vec<MediaSource>,
}

impl Campaign {
    /// # Errors
    /// `ConfigError::EmptyCampaign` when `media` is empty
    pub fn new(
        channel: ChannelId,
        metadata: CampaignMetadata,
        media: Vec<MediaSource>,
    ) -> Result<Self, ConfigError> {
        if media.is_empty() {
            return Err(ConfigError::EmptyCampaign);
        }
        Ok(Self {
            channel,
            metadata,
            media,
        })
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn metadata(&self) -> &CampaignMetadata {
        &self.metadata
    }

    /// All media, head first
    pub fn media(&self) -> &[MediaSource] {
        &self.media
    }

    pub fn head(&self) -> &MediaSource {
        &self.media[0]
    }

    pub fn secondary_count(&self) -> usize {
        self.media.len() - 1
    }
}

/// Errors while loading a campaign folder
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("Campaign folder not found: {0}")]
    FolderNotFound(PathBuf),

    #[error("metadata.json not found at {0}")]
    MetadataNotFound(PathBuf),

    #[error("assets folder not found at {0}")]
    AssetsNotFound(PathBuf),

    #[error("Invalid metadata in {path}: {reason}")]
    InvalidMetadata {
        path: PathBuf,
        reason: serde_json::Error,
    },

    #[error("No usable media found for campaign {0}")]
    NoUsableMedia(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// `metadata.json` as found on disk
#[derive(Debug, Deserialize)]
struct MetadataFile {
    #[serde(flatten)]
    metadata: CampaignMetadata,
    #[serde(default)]
    assets: Vec<String>,
    #[serde(default)]
    head_index: Option<usize>,
}

/// A listed asset that was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAsset {
    pub path: PathBuf,
    pub reason: String,
}

/// Campaign contents before a channel is attached
#[derive(Debug, Clone)]
pub struct CampaignDefinition {
    /// Folder name, or metadata file stem
    pub name: String,
    pub metadata: CampaignMetadata,
    /// Media in posting order, head first
    pub media: Vec<MediaSource>,
    /// Listed assets that do not exist
    pub skipped: Vec<SkippedAsset>,
}

impl CampaignDefinition {
    /// Loads a campaign folder
    ///
    /// Media order is `metadata.assets` (relative to the folder) when that
    /// list is non-empty, otherwise every visible file in `assets/` sorted by
    /// lower-cased name. `head_index`, when in range, moves that item first.
    pub fn load(dir: &Path) -> Result<Self, CampaignError> {
        if !dir.is_dir() {
            return Err(CampaignError::FolderNotFound(dir.to_path_buf()));
        }

        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.exists() {
            return Err(CampaignError::MetadataNotFound(metadata_path));
        }
        let file = read_metadata_file(&metadata_path)?;

        let assets_dir = dir.join(ASSETS_DIR);
        if !assets_dir.is_dir() {
            return Err(CampaignError::AssetsNotFound(assets_dir));
        }

        let candidates: Vec<PathBuf> = if file.assets.is_empty() {
            scan_assets(&assets_dir)?
        } else {
            file.assets.iter().map(|rel| dir.join(rel)).collect()
        };

        let mut media = Vec::new();
        let mut skipped = Vec::new();
        for path in candidates {
            if path.is_file() {
                media.push(path);
            } else {
                warn!(path = %path.display(), "Asset skipped: missing");
                skipped.push(SkippedAsset {
                    path,
                    reason: "missing".to_string(),
                });
            }
        }

        if media.is_empty() {
            return Err(CampaignError::NoUsableMedia(dir.to_path_buf()));
        }

        if let Some(index) = file.head_index {
            if index < media.len() {
                let head = media.remove(index);
                media.insert(0, head);
            } else {
                warn!(head_index = index, count = media.len(), "head_index out of range, ignored");
            }
        }

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "campaign".to_string());

        Ok(Self {
            name,
            metadata: file.metadata,
            media: media.into_iter().map(MediaSource::File).collect(),
            skipped,
        })
    }

    /// Builds a definition from a metadata file and an explicit media list
    pub fn from_parts(metadata_path: &Path, media: Vec<MediaSource>) -> Result<Self, CampaignError> {
        if !metadata_path.exists() {
            return Err(CampaignError::MetadataNotFound(metadata_path.to_path_buf()));
        }
        let file = read_metadata_file(metadata_path)?;
        let name = metadata_path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "campaign".to_string());

        Ok(Self {
            name,
            metadata: file.metadata,
            media,
            skipped: Vec::new(),
        })
    }

    /// Attaches the destination channel
    pub fn into_campaign(self, channel: ChannelId) -> Result<Campaign, ConfigError> {
        Campaign::new(channel, self.metadata, self.media)
    }
}

fn read_metadata_file(path: &Path) -> Result<MetadataFile, CampaignError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|reason| CampaignError::InvalidMetadata {
        path: path.to_path_buf(),
        reason,
    })
}

fn scan_assets(assets_dir: &Path) -> Result<Vec<PathBuf>, CampaignError> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(assets_dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if path.is_file() && !hidden {
            files.push(path);
        }
    }
    files.sort_by_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const METADATA: &str = r#"{
        "titles": { "en": "Kalamkari Scarf", "hi": "कलमकारी दुपट्टा" },
        "hashtags": ["kalamkari"]
    }"#;

    fn campaign_dir(metadata: &str, assets: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(METADATA_FILE), metadata).unwrap();
        fs::create_dir_all(dir.path().join(ASSETS_DIR)).unwrap();
        for name in assets {
            fs::write(dir.path().join(ASSETS_DIR).join(name), b"\xFF\xD8\xFFdata").unwrap();
        }
        dir
    }

    fn file_names(def: &CampaignDefinition) -> Vec<String> {
        def.media
            .iter()
            .map(|m| match m {
                MediaSource::File(p) => p.file_name().unwrap().to_string_lossy().into_owned(),
                other => other.label(),
            })
            .collect()
    }

    #[test]
    fn test_channel_id_rejects_blank() {
        assert!(ChannelId::new("  ").is_err());
        assert_eq!(ChannelId::new(" @prachar ").unwrap().as_str(), "@prachar");
    }

    #[test]
    fn test_campaign_requires_media() {
        let channel = ChannelId::new("@prachar").unwrap();
        let err = Campaign::new(channel, CampaignMetadata::default(), vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCampaign));
    }

    #[test]
    fn test_campaign_head_and_secondaries() {
        let channel = ChannelId::new("@prachar").unwrap();
        let media = vec![
            MediaSource::from_arg("a.jpg"),
            MediaSource::from_arg("b.jpg"),
            MediaSource::from_arg("c.jpg"),
        ];
        let campaign = Campaign::new(channel, CampaignMetadata::default(), media).unwrap();
        assert_eq!(campaign.head(), &MediaSource::from_arg("a.jpg"));
        assert_eq!(campaign.secondary_count(), 2);
    }

    #[test]
    fn test_load_scans_assets_sorted_case_insensitively() {
        let dir = campaign_dir(METADATA, &["b.jpg", "A.jpg", "c.mp4", ".DS_Store"]);
        let def = CampaignDefinition::load(dir.path()).unwrap();

        assert_eq!(file_names(&def), vec!["A.jpg", "b.jpg", "c.mp4"]);
        assert_eq!(def.metadata.titles.en(), Some("Kalamkari Scarf"));
    }

    #[test]
    fn test_load_prefers_explicit_asset_list() {
        let metadata = r#"{ "assets": ["assets/2.jpg", "assets/1.jpg", "assets/gone.jpg"] }"#;
        let dir = campaign_dir(metadata, &["1.jpg", "2.jpg", "3.jpg"]);
        let def = CampaignDefinition::load(dir.path()).unwrap();

        assert_eq!(file_names(&def), vec!["2.jpg", "1.jpg"]);
        assert_eq!(def.skipped.len(), 1);
        assert!(def.skipped[0].path.ends_with("gone.jpg"));
    }

    #[test]
    fn test_load_flat_metadata_keys() {
        let metadata = r##"{
            "title_en": "Hand-painted Diya",
            "title_hi": "हस्तचित्रित दीया",
            "description_hi": "मिट्टी का दीया",
            "hashtags": ["#handmade"],
            "cta_whatsapp": "https://wa.me/911234",
            "head_index": 1
        }"##;
        let dir = campaign_dir(metadata, &["1.jpg", "2.jpg"]);
        let def = CampaignDefinition::load(dir.path()).unwrap();

        assert_eq!(file_names(&def), vec!["2.jpg", "1.jpg"]);
        let caption = crate::caption::primary_caption(&def.metadata);
        assert_eq!(
            caption.lines().collect::<Vec<_>>(),
            vec![
                "हस्तचित्रित दीया • Hand-painted Diya",
                "मिट्टी का दीया",
                "#handmade",
                "Buy: https://wa.me/911234",
            ]
        );
    }

    #[test]
    fn test_head_index_moves_item_first() {
        let metadata = r#"{ "head_index": 2 }"#;
        let dir = campaign_dir(metadata, &["1.jpg", "2.jpg", "3.jpg"]);
        let def = CampaignDefinition::load(dir.path()).unwrap();
        assert_eq!(file_names(&def), vec!["3.jpg", "1.jpg", "2.jpg"]);
    }

    #[test]
    fn test_head_index_out_of_range_is_ignored() {
        let metadata = r#"{ "head_index": 9 }"#;
        let dir = campaign_dir(metadata, &["1.jpg", "2.jpg"]);
        let def = CampaignDefinition::load(dir.path()).unwrap();
        assert_eq!(file_names(&def), vec!["1.jpg", "2.jpg"]);
    }

    #[test]
    fn test_load_missing_folder() {
        let dir = TempDir::new().unwrap();
        let err = CampaignDefinition::load(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, CampaignError::FolderNotFound(_)));
    }

    #[test]
    fn test_load_missing_metadata() {
        let dir = TempDir::new().unwrap();
        let err = CampaignDefinition::load(dir.path()).unwrap_err();
        assert!(matches!(err, CampaignError::MetadataNotFound(_)));
    }

    #[test]
    fn test_load_missing_assets_folder() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(METADATA_FILE), METADATA).unwrap();
        let err = CampaignDefinition::load(dir.path()).unwrap_err();
        assert!(matches!(err, CampaignError::AssetsNotFound(_)));
    }

    #[test]
    fn test_load_invalid_metadata() {
        let dir = campaign_dir("{ not json", &["1.jpg"]);
        let err = CampaignDefinition::load(dir.path()).unwrap_err();
        assert!(matches!(err, CampaignError::InvalidMetadata { .. }));
    }

    #[test]
    fn test_load_without_media_fails() {
        let dir = campaign_dir(METADATA, &[]);
        let err = CampaignDefinition::load(dir.path()).unwrap_err();
        assert!(matches!(err, CampaignError::NoUsableMedia(_)));
    }

    #[test]
    fn test_from_parts_and_into_campaign() {
        let dir = TempDir::new().unwrap();
        let metadata_path = dir.path().join("diya.json");
        fs::write(&metadata_path, METADATA).unwrap();

        let def = CampaignDefinition::from_parts(
            &metadata_path,
            vec![MediaSource::from_arg("https://cdn.example.com/diya.jpg")],
        )
        .unwrap();
        assert_eq!(def.name, "diya");

        let campaign = def
            .into_campaign(ChannelId::new("@prachar").unwrap())
            .unwrap();
        assert_eq!(campaign.secondary_count(), 0);
        assert_eq!(campaign.channel().as_str(), "@prachar");
    }
}
