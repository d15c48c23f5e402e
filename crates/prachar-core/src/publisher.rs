//! Channel publisher
//!
//! Posts one campaign as a thread: the head item with the primary caption,
//! then each secondary item as a reply to the head. Every step is written to
//! the step log before the next one starts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::campaign::Campaign;
use crate::caption::{format_captions, CaptionOptions, Captions};
use crate::config::{Config, SecondaryFailurePolicy};
use crate::media::{resolve_media, MediaError, MediaItem};
use crate::ports::step_log::{StepEvent, StepLogPort, StepOperation};
use crate::ports::surface::{
    MessageId, MessagingSurfacePort, SendMediaRequest, SurfaceError, SurfaceReceipt,
};
use crate::report::{
    ItemReport, PostFailure, PostOutcome, PostRecord, PostState, PublishReport, PublishStatus,
    SkippedMedia,
};

/// Tunables for one publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherSettings {
    /// Upper bound for each surface call
    pub call_timeout: Duration,
    /// Pause before each reply
    pub reply_delay: Duration,
    pub secondary_failure_policy: SecondaryFailurePolicy,
    pub caption_options: CaptionOptions,
}

impl PublisherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            call_timeout: config.telegram.request_timeout(),
            reply_delay: config.telegram.reply_delay(),
            secondary_failure_policy: config.publish.secondary_failure_policy,
            caption_options: CaptionOptions {
                reply_captions: config.publish.reply_captions,
                ..CaptionOptions::default()
            },
        }
    }
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Writes step events, counting failures instead of propagating them
struct Recorder<'a, L: StepLogPort + ?Sized> {
    log: &'a mut L,
    failures: usize,
}

impl<'a, L: StepLogPort + ?Sized> Recorder<'a, L> {
    fn new(log: &'a mut L) -> Self {
        Self { log, failures: 0 }
    }

    fn record(&mut self, event: StepEvent) {
        let operation = event.operation;
        let phase = event.phase;
        if let Err(e) = self.log.record(event) {
            self.failures += 1;
            error!(%operation, %phase, error = %e, "Failed to write step event");
        }
    }
}

fn transition(ordinal: usize, from: PostState, to: PostState) {
    debug!(ordinal, %from, %to, "Post state changed");
}

/// Publishes campaigns through a messaging surface
pub struct ChannelPublisher<S>
where
    S: MessagingSurfacePort + 'static,
{
    surface: Arc<S>,
    settings: PublisherSettings,
}

impl<S> ChannelPublisher<S>
where
    S: MessagingSurfacePort + 'static,
{
    pub fn new(surface: Arc<S>, settings: PublisherSettings) -> Self {
        Self { surface, settings }
    }

    pub fn settings(&self) -> &PublisherSettings {
        &self.settings
    }

    /// Publishes `campaign`, recording every step into `log`
    ///
    /// Never fails as a whole: per-item problems end up in the report, and
    /// step log write failures are counted in
    /// [`PublishReport::log_write_failures`].
    pub async fn publish<L>(&self, campaign: &Campaign, log: &mut L) -> PublishReport
    where
        L: StepLogPort + ?Sized,
    {
        let mut recorder = Recorder::new(log);
        let channel = campaign.channel().to_string();

        recorder.record(StepEvent::start(StepOperation::Campaign).with_context(json!({
            "channel": channel,
            "media_count": campaign.media().len(),
        })));
        info!(channel = %channel, items = campaign.media().len(), "Publishing campaign");

        let captions = format_captions(
            campaign.metadata(),
            campaign.secondary_count(),
            &self.settings.caption_options,
        );

        let mut resolved = resolve_media(campaign.media()).await.into_iter();
        let head = match resolved.next() {
            Some(result) => result,
            None => Err(MediaError::Unreadable {
                path: campaign.head().label(),
                reason: "no media resolved".to_string(),
            }),
        };

        let mut secondaries: Vec<MediaItem> = Vec::new();
        let mut skipped: Vec<SkippedMedia> = Vec::new();
        for (index, result) in resolved.enumerate() {
            match result {
                Ok(item) => secondaries.push(item),
                Err(error) => {
                    let ordinal = index + 1;
                    record_resolve_failure(&mut recorder, ordinal, &error);
                    skipped.push(SkippedMedia { ordinal, error });
                }
            }
        }

        let head_item = match head {
            Ok(item) => item,
            Err(error) => {
                record_resolve_failure(&mut recorder, 0, &error);
                let head_report = ItemReport {
                    ordinal: 0,
                    label: error.path().to_string(),
                    outcome: PostOutcome::Failed(PostFailure::Media(error)),
                };
                let replies = not_attempted(secondaries, "head media unreadable");
                return self.finish(recorder, channel, head_report, replies, skipped);
            }
        };

        if !skipped.is_empty()
            && self.settings.secondary_failure_policy == SecondaryFailurePolicy::Abort
        {
            let ordinals: Vec<String> = skipped.iter().map(|s| s.ordinal.to_string()).collect();
            let reason = format!("unreadable secondary media: {}", ordinals.join(", "));
            warn!(%reason, "Aborting campaign before posting");
            let head_report = ItemReport {
                ordinal: 0,
                label: head_item.label,
                outcome: PostOutcome::NotAttempted {
                    reason: reason.clone(),
                },
            };
            let replies = not_attempted(secondaries, &reason);
            return self.finish(recorder, channel, head_report, replies, skipped);
        }

        let head_report = self
            .post_item(&mut recorder, campaign, &head_item, &captions, None)
            .await;
        let head_id = match head_report.outcome.record() {
            Some(record) => record.message_id,
            None => {
                let replies = not_attempted(secondaries, "head post failed");
                return self.finish(recorder, channel, head_report, replies, skipped);
            }
        };

        let mut replies = Vec::with_capacity(secondaries.len());
        for item in &secondaries {
            if !self.settings.reply_delay.is_zero() {
                tokio::time::sleep(self.settings.reply_delay).await;
            }
            let report = self
                .post_item(&mut recorder, campaign, item, &captions, Some(head_id))
                .await;
            replies.push(report);
        }

        self.finish(recorder, channel, head_report, replies, skipped)
    }

    async fn post_item<L>(
        &self,
        recorder: &mut Recorder<'_, L>,
        campaign: &Campaign,
        item: &MediaItem,
        captions: &Captions,
        reply_to: Option<MessageId>,
    ) -> ItemReport
    where
        L: StepLogPort + ?Sized,
    {
        let operation = if reply_to.is_none() {
            StepOperation::HeadPost
        } else {
            StepOperation::ReplyPost
        };
        let caption = match reply_to {
            None => Some(captions.primary.as_str()).filter(|c| !c.is_empty()),
            Some(_) => captions.for_reply(item.ordinal),
        };

        transition(item.ordinal, PostState::Pending, PostState::Sending);
        recorder.record(
            StepEvent::start(operation)
                .with_ordinal(item.ordinal)
                .with_context(json!({
                    "file_name": item.file_name,
                    "kind": item.kind.to_string(),
                    "reply_to": reply_to.map(|id| id.0),
                })),
        );

        let request = SendMediaRequest {
            chat_id: campaign.channel().as_str(),
            media: item,
            caption,
            reply_to,
        };

        let outcome = match self.send(request).await {
            Ok(receipt) => {
                transition(item.ordinal, PostState::Sending, PostState::Succeeded);
                recorder.record(
                    StepEvent::done(operation)
                        .with_ordinal(item.ordinal)
                        .with_context(json!({
                            "message_id": receipt.message_id.0,
                            "raw_body": receipt.raw_body,
                        })),
                );
                info!(ordinal = item.ordinal, message_id = %receipt.message_id, "Posted");
                PostOutcome::Succeeded(to_record(receipt, reply_to))
            }
            Err(e) => {
                transition(item.ordinal, PostState::Sending, PostState::Failed);
                recorder.record(
                    StepEvent::fail(operation)
                        .with_ordinal(item.ordinal)
                        .with_context(json!({
                            "kind": e.kind.as_str(),
                            "detail": e.detail,
                            "raw_body": e.raw_body,
                        })),
                );
                warn!(ordinal = item.ordinal, error = %e, "Post failed");
                PostOutcome::Failed(PostFailure::Surface(e))
            }
        };

        ItemReport {
            ordinal: item.ordinal,
            label: item.label.clone(),
            outcome,
        }
    }

    async fn send(&self, request: SendMediaRequest<'_>) -> Result<SurfaceReceipt, SurfaceError> {
        let limit = self.settings.call_timeout;
        match tokio::time::timeout(limit, self.surface.send_media(request)).await {
            Ok(result) => result,
            Err(_) => Err(SurfaceError::timeout(limit)),
        }
    }

    fn finish<L>(
        &self,
        mut recorder: Recorder<'_, L>,
        channel: String,
        head: ItemReport,
        replies: Vec<ItemReport>,
        skipped: Vec<SkippedMedia>,
    ) -> PublishReport
    where
        L: StepLogPort + ?Sized,
    {
        let status = PublishReport::compute_status(&head, &replies, &skipped);
        let report = PublishReport {
            channel,
            head,
            replies,
            skipped,
            status,
            log_write_failures: 0,
        };
        let posted = report.posted_count();

        let event = if status == PublishStatus::Aborted {
            StepEvent::fail(StepOperation::Campaign)
        } else {
            StepEvent::done(StepOperation::Campaign)
        };
        recorder.record(event.with_context(json!({
            "status": status.as_str(),
            "posted": posted,
            "not_posted": report.replies.len() + 1 - posted,
            "skipped": report.skipped.len(),
        })));

        info!(status = %status, posted, skipped = report.skipped.len(), "Campaign finished");

        PublishReport {
            log_write_failures: recorder.failures,
            ..report
        }
    }
}

fn record_resolve_failure<L>(recorder: &mut Recorder<'_, L>, ordinal: usize, error: &MediaError)
where
    L: StepLogPort + ?Sized,
{
    warn!(ordinal, error = %error, "Media could not be resolved");
    let MediaError::Unreadable { path, reason } = error;
    recorder.record(
        StepEvent::fail(StepOperation::MediaResolve)
            .with_ordinal(ordinal)
            .with_context(json!({ "path": path, "reason": reason })),
    );
}

fn not_attempted(items: Vec<MediaItem>, reason: &str) -> Vec<ItemReport> {
    items
        .into_iter()
        .map(|item| ItemReport {
            ordinal: item.ordinal,
            label: item.label,
            outcome: PostOutcome::NotAttempted {
                reason: reason.to_string(),
            },
        })
        .collect()
}

fn to_record(receipt: SurfaceReceipt, parent_id: Option<MessageId>) -> PostRecord {
    let posted_at = receipt
        .date
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);
    PostRecord {
        message_id: receipt.message_id,
        parent_id,
        posted_at,
        raw_body: receipt.raw_body,
    }
}
