//! Campaign metadata record
//!
//! Mirrors the `metadata.json` shape used by campaign folders: bilingual
//! titles and description, an optional price band, hashtags and a
//! call-to-action link. Older folders use flat keys (`title_en`,
//! `description_hi`, `cta_whatsapp`, ...); those fill in whatever the nested
//! objects leave empty.

use serde::{Deserialize, Serialize};

/// Text available in English and/or Hindi
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Localized {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hi: Option<String>,
}

impl Localized {
    pub fn new(en: Option<&str>, hi: Option<&str>) -> Self {
        Self {
            en: en.map(str::to_string),
            hi: hi.map(str::to_string),
        }
    }

    /// English text, if present and not blank
    pub fn en(&self) -> Option<&str> {
        non_blank(self.en.as_deref())
    }

    /// Hindi text, if present and not blank
    pub fn hi(&self) -> Option<&str> {
        non_blank(self.hi.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.en().is_none() && self.hi().is_none()
    }
}

/// Suggested price band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

/// Where buyers are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallToAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
}

impl CallToAction {
    pub fn link(&self) -> Option<&str> {
        non_blank(self.whatsapp.as_deref())
    }
}

/// Structured description of the product being promoted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "MetadataRecord")]
pub struct CampaignMetadata {
    #[serde(default)]
    pub titles: Localized,
    #[serde(default)]
    pub description: Localized,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<PriceRange>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub cta: CallToAction,
}

impl CampaignMetadata {
    /// Shortest usable title, English first
    pub fn short_title(&self) -> Option<&str> {
        self.titles.en().or_else(|| self.titles.hi())
    }
}

/// On-disk record accepting both the nested and the flat key layout
#[derive(Deserialize)]
struct MetadataRecord {
    #[serde(default)]
    titles: Localized,
    #[serde(default)]
    description: Localized,
    #[serde(default)]
    price: Option<PriceRange>,
    #[serde(default)]
    hashtags: Vec<String>,
    #[serde(default)]
    cta: CallToAction,

    #[serde(default)]
    title_en: Option<String>,
    #[serde(default)]
    title_hi: Option<String>,
    #[serde(default)]
    description_en: Option<String>,
    #[serde(default)]
    description_hi: Option<String>,
    #[serde(default)]
    cta_whatsapp: Option<String>,
}

impl From<MetadataRecord> for CampaignMetadata {
    fn from(record: MetadataRecord) -> Self {
        Self {
            titles: record.titles.or_flat(record.title_en, record.title_hi),
            description: record
                .description
                .or_flat(record.description_en, record.description_hi),
            price: record.price,
            hashtags: record.hashtags,
            cta: CallToAction {
                whatsapp: prefer(record.cta.whatsapp, record.cta_whatsapp),
            },
        }
    }
}

impl Localized {
    fn or_flat(self, en: Option<String>, hi: Option<String>) -> Self {
        Self {
            en: prefer(self.en, en),
            hi: prefer(self.hi, hi),
        }
    }
}

/// `nested` unless it is missing or blank
fn prefer(nested: Option<String>, flat: Option<String>) -> Option<String> {
    if non_blank(nested.as_deref()).is_some() {
        nested
    } else {
        flat.or(nested)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
