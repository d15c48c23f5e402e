//! Post command
//!
//! Handles `prachar post`: checks credentials, loads the campaign, publishes
//! it to the channel and prints what happened.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use prachar_adapters::TelegramAdapter;
use prachar_core::{
    load_env_file, ChannelCredentials, ChannelPublisher, PublishReport, PublishStatus,
    PublisherSettings, StepLogger, DEFAULT_ENV_FILE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::CampaignSourceArgs;
use crate::app::AppContext;

/// Arguments for `prachar post`
#[derive(Args, Debug)]
pub struct PostArgs {
    #[command(flatten)]
    pub source: CampaignSourceArgs,

    /// Dotenv file with TELEGRAM_BOT_TOKEN and TELEGRAM_CHANNEL
    #[arg(long, value_name = "FILE", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Directory for step logs (default: <data_dir>/logs)
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Publish a campaign and return the exit code for its status
pub async fn run(ctx: &mut AppContext, args: PostArgs) -> Result<u8> {
    load_env_file(&args.env_file).context("Failed to read env file")?;

    let credentials = match ChannelCredentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("{}", ChannelCredentials::missing_guidance());
            eprintln!();
            return Err(e).context("Telegram credentials missing");
        }
    };

    let definition = args.source.load()?;
    for skipped in &definition.skipped {
        eprintln!(
            "warning: asset {} skipped ({})",
            skipped.path.display(),
            skipped.reason
        );
    }
    let name = definition.name.clone();
    let campaign = definition
        .into_campaign(credentials.channel.clone())
        .context("Campaign has nothing to post")?;

    let log_dir = args
        .log_dir
        .unwrap_or_else(|| ctx.config().storage.logs_dir());
    ctx.start_logging(Some(log_dir.clone()))?;

    let mut step_log =
        StepLogger::open(&log_dir, Local::now()).context("Failed to open step log")?;

    let adapter = TelegramAdapter::from_config(credentials.token, &ctx.config().telegram)
        .context("Failed to create Telegram client")?;
    let publisher = ChannelPublisher::new(
        Arc::new(adapter),
        PublisherSettings::from_config(ctx.config()),
    );

    info!(campaign = %name, channel = %campaign.channel(), "Starting post");
    println!(
        "Posting '{}' to {} ({} items)...",
        name,
        campaign.channel(),
        campaign.media().len()
    );

    let report = publisher.publish(&campaign, &mut step_log).await;
    print!("{}", render_report(&report, step_log.path()));

    Ok(report.status.exit_code())
}

/// Renders the end-of-run summary
fn render_report(report: &PublishReport, log_path: &Path) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("Campaign {} on {}\n", report.status, report.channel));
    for line in report.summary_lines() {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&format!(
        "Posted {} of {} items.\n",
        report.posted_count(),
        report.replies.len() + report.skipped.len() + 1
    ));
    out.push_str(&format!("Step log: {}\n", log_path.display()));

    if report.log_write_failures > 0 {
        out.push_str(&format!(
            "warning: {} step events could not be written to the log\n",
            report.log_write_failures
        ));
    }

    match report.status {
        PublishStatus::Complete => {}
        PublishStatus::Partial => out.push_str(
            "note: re-running this campaign posts the head again and creates a duplicate thread; \
             repost the failed items by hand instead.\n",
        ),
        PublishStatus::Aborted => out.push_str(
            "note: nothing was threaded; check the step log before re-running, \
             a head that reached the channel would be duplicated.\n",
        ),
    }
    out
}
