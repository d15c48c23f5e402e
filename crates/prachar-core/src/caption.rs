//! Caption formatting
//!
//! Renders campaign metadata into the head post's caption and, optionally,
//! short captions for the threaded replies. Pure functions: the same metadata
//! always yields byte-identical captions.

use crate::metadata::{CampaignMetadata, PriceRange};

/// Maximum caption length Telegram accepts on media messages
pub const TELEGRAM_CAPTION_LIMIT: usize = 1024;

const ELLIPSIS: char = '…';

/// Caption rendering options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionOptions {
    /// Give each reply a short "title (n/total)" caption
    pub reply_captions: bool,
    /// Hard limit in characters
    pub max_chars: usize,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            reply_captions: false,
            max_chars: TELEGRAM_CAPTION_LIMIT,
        }
    }
}

/// Captions for one campaign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captions {
    /// Caption of the head post
    pub primary: String,
    /// One entry per secondary item, in media order
    pub replies: Vec<Option<String>>,
}

impl Captions {
    /// Caption for the secondary item at `ordinal` (1-based within the campaign)
    pub fn for_reply(&self, ordinal: usize) -> Option<&str> {
        ordinal
            .checked_sub(1)
            .and_then(|index| self.replies.get(index))
            .and_then(|caption| caption.as_deref())
    }
}

/// Formats all captions for a campaign with `secondary_count` replies
pub fn format_captions(
    metadata: &CampaignMetadata,
    secondary_count: usize,
    options: &CaptionOptions,
) -> Captions {
    let primary = truncate_caption(&primary_caption(metadata), options.max_chars);

    let total = secondary_count + 1;
    let replies = (1..=secondary_count)
        .map(|ordinal| {
            if !options.reply_captions {
                return None;
            }
            metadata.short_title().map(|title| {
                truncate_caption(
                    &format!("{} ({}/{})", title, ordinal + 1, total),
                    options.max_chars,
                )
            })
        })
        .collect();

    Captions { primary, replies }
}

/// Builds the untruncated head caption
///
/// Line order: title, description (one line per language), price, hashtags,
/// call to action. Lines whose inputs are missing are left out entirely.
pub fn primary_caption(metadata: &CampaignMetadata) -> String {
    let mut lines: Vec<String> = Vec::new();

    match (metadata.titles.hi(), metadata.titles.en()) {
        (Some(hi), Some(en)) => lines.push(format!("{} • {}", hi, en)),
        (Some(title), None) | (None, Some(title)) => lines.push(title.to_string()),
        (None, None) => {}
    }

    lines.extend(metadata.description.hi().map(str::to_string));
    lines.extend(metadata.description.en().map(str::to_string));

    if let Some(price) = metadata.price.as_ref().and_then(price_line) {
        lines.push(price);
    }

    let tags: Vec<String> = metadata
        .hashtags
        .iter()
        .filter_map(|tag| normalize_hashtag(tag))
        .collect();
    if !tags.is_empty() {
        lines.push(tags.join(" "));
    }

    if let Some(link) = metadata.cta.link() {
        lines.push(format!("Buy: {}", link));
    }

    lines.join("\n")
}

fn price_line(price: &PriceRange) -> Option<String> {
    let (low, high) = (price.low?, price.high?);
    if price.currency.eq_ignore_ascii_case("INR") {
        Some(format!("₹{}–₹{} INR", low, high))
    } else {
        Some(format!("{}–{} {}", low, high, price.currency))
    }
}

/// Normalizes a hashtag to a single leading `#` with no whitespace
///
/// Returns `None` for tags that are empty after normalization.
pub fn normalize_hashtag(tag: &str) -> Option<String> {
    let body: String = tag
        .trim()
        .trim_start_matches('#')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if body.is_empty() {
        None
    } else {
        Some(format!("#{}", body))
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `…`
pub fn truncate_caption(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut truncated: String = text.chars().take(max_chars - 1).collect();
    truncated.push(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{CallToAction, Localized};

    fn diya_metadata() -> CampaignMetadata {
        CampaignMetadata {
            titles: Localized::new(Some("Hand-painted Diya"), Some("हस्तचित्रित दीया")),
            description: Localized::new(Some("Clay lamp painted by hand."), Some("मिट्टी का दीया")),
            price: Some(PriceRange {
                low: Some(149.0),
                high: Some(299.0),
                currency: "INR".to_string(),
            }),
            hashtags: vec!["diwali".to_string(), "handmade".to_string()],
            cta: CallToAction {
                whatsapp: Some("wa.me/911234".to_string()),
            },
        }
    }

    #[test]
    fn test_primary_caption_contains_required_parts() {
        let caption = primary_caption(&diya_metadata());

        assert!(caption.contains("Hand-painted Diya"));
        assert!(caption.contains("#diwali"));
        assert!(caption.contains("#handmade"));
        assert!(caption.contains("wa.me/911234"));
    }

    #[test]
    fn test_primary_caption_line_order() {
        let caption = primary_caption(&diya_metadata());
        let lines: Vec<&str> = caption.lines().collect();

        assert_eq!(
            lines,
            vec![
                "हस्तचित्रित दीया • Hand-painted Diya",
                "मिट्टी का दीया",
                "Clay lamp painted by hand.",
                "₹149–₹299 INR",
                "#diwali #handmade",
                "Buy: wa.me/911234",
            ]
        );
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let meta = diya_metadata();
        let options = CaptionOptions {
            reply_captions: true,
            ..CaptionOptions::default()
        };
        assert_eq!(
            format_captions(&meta, 2, &options),
            format_captions(&meta, 2, &options)
        );
    }

    #[test]
    fn test_missing_optional_fields_are_omitted() {
        let meta = CampaignMetadata {
            titles: Localized::new(Some("Diya"), None),
            ..CampaignMetadata::default()
        };
        assert_eq!(primary_caption(&meta), "Diya");
    }

    #[test]
    fn test_empty_metadata_gives_empty_caption() {
        assert_eq!(primary_caption(&CampaignMetadata::default()), "");
    }

    #[test]
    fn test_price_needs_both_bounds() {
        let mut meta = CampaignMetadata::default();
        meta.price = Some(PriceRange {
            low: Some(100.0),
            high: None,
            currency: "INR".to_string(),
        });
        assert!(!primary_caption(&meta).contains('₹'));
    }

    #[test]
    fn test_foreign_currency_has_no_rupee_sign() {
        let mut meta = CampaignMetadata::default();
        meta.price = Some(PriceRange {
            low: Some(12.5),
            high: Some(20.0),
            currency: "USD".to_string(),
        });
        assert_eq!(primary_caption(&meta), "12.5–20 USD");
    }

    #[test]
    fn test_normalize_hashtag() {
        assert_eq!(normalize_hashtag("diwali"), Some("#diwali".to_string()));
        assert_eq!(normalize_hashtag("##handmade"), Some("#handmade".to_string()));
        assert_eq!(normalize_hashtag(" hand made "), Some("#handmade".to_string()));
        assert_eq!(normalize_hashtag("#"), None);
        assert_eq!(normalize_hashtag("   "), None);
    }

    #[test]
    fn test_reply_captions_disabled_by_default() {
        let captions = format_captions(&diya_metadata(), 2, &CaptionOptions::default());
        assert_eq!(captions.replies, vec![None, None]);
        assert_eq!(captions.for_reply(1), None);
    }

    #[test]
    fn test_reply_captions_when_enabled() {
        let options = CaptionOptions {
            reply_captions: true,
            ..CaptionOptions::default()
        };
        let captions = format_captions(&diya_metadata(), 2, &options);

        assert_eq!(captions.for_reply(1), Some("Hand-painted Diya (2/3)"));
        assert_eq!(captions.for_reply(2), Some("Hand-painted Diya (3/3)"));
        assert_eq!(captions.for_reply(0), None);
        assert_eq!(captions.for_reply(3), None);
    }

    #[test]
    fn test_truncate_caption_on_char_boundary() {
        let cut = truncate_caption("दीया दीया", 4);
        assert_eq!(cut.chars().count(), 4);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate_caption("short", 10), "short");
        assert_eq!(truncate_caption("abcdef", 4), "abc…");
        assert_eq!(truncate_caption("abcdef", 0), "");
    }

    #[test]
    fn test_primary_caption_respects_limit() {
        let mut meta = diya_metadata();
        meta.description.en = Some("x".repeat(2000));
        let captions = format_captions(&meta, 0, &CaptionOptions::default());

        assert_eq!(captions.primary.chars().count(), TELEGRAM_CAPTION_LIMIT);
        assert!(captions.primary.ends_with('…'));
    }
}
