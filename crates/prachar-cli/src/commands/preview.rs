//! Preview command
//!
//! Handles `prachar preview`: resolves media and renders captions exactly as
//! `post` would, without credentials or network access.

use anyhow::Result;
use clap::Args;
use prachar_core::{
    format_captions, resolve_media, CaptionOptions, Captions, MediaError, MediaItem,
};

use super::{format_file_size, CampaignSourceArgs};
use crate::app::AppContext;

/// Arguments for `prachar preview`
#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: CampaignSourceArgs,
}

/// Show what a campaign would post
pub async fn run(ctx: &AppContext, args: PreviewArgs) -> Result<u8> {
    let definition = args.source.load()?;
    let secondary_count = definition.media.len().saturating_sub(1);

    let options = CaptionOptions {
        reply_captions: ctx.config().publish.reply_captions,
        ..CaptionOptions::default()
    };
    let captions = format_captions(&definition.metadata, secondary_count, &options);
    let resolved = resolve_media(&definition.media).await;

    println!("Campaign: {}", definition.name);
    println!();
    println!("Head caption ({} chars)", captions.primary.chars().count());
    println!("------------");
    println!("{}", captions.primary);
    println!();
    println!("Media");
    println!("-----");
    for line in media_lines(&resolved, &captions) {
        println!("{}", line);
    }
    for skipped in &definition.skipped {
        println!("  [skip] {} ({})", skipped.path.display(), skipped.reason);
    }

    Ok(0)
}

fn media_lines(resolved: &[Result<MediaItem, MediaError>], captions: &Captions) -> Vec<String> {
    resolved
        .iter()
        .enumerate()
        .map(|(ordinal, result)| {
            let role = if ordinal == 0 { "head " } else { "reply" };
            match result {
                Ok(item) => {
                    let size = item
                        .size_bytes()
                        .map(format_file_size)
                        .unwrap_or_else(|| "remote".to_string());
                    let caption = captions
                        .for_reply(ordinal)
                        .map(|c| format!("  \"{}\"", c))
                        .unwrap_or_default();
                    format!(
                        "  #{} {} {:<8} {:<16} {:>10}  {}{}",
                        ordinal,
                        role,
                        item.kind.to_string(),
                        item.mime_type,
                        size,
                        item.file_name,
                        caption
                    )
                }
                Err(e) => format!("  #{} {} unreadable: {}", ordinal, role, e),
            }
        })
        .collect()
}
