//! Publish report
//!
//! The publisher's answer to "what happened": one outcome per media item plus
//! an overall status the CLI maps to its exit code.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::media::MediaError;
use crate::ports::surface::{MessageId, SurfaceError};

/// Per-attempt state of one post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostState {
    Pending,
    Sending,
    Succeeded,
    Failed,
}

impl fmt::Display for PostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostState::Pending => write!(f, "pending"),
            PostState::Sending => write!(f, "sending"),
            PostState::Succeeded => write!(f, "succeeded"),
            PostState::Failed => write!(f, "failed"),
        }
    }
}

/// A message that now exists on the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub message_id: MessageId,
    /// Head message this post replies to; `None` for the head itself
    pub parent_id: Option<MessageId>,
    pub posted_at: DateTime<Utc>,
    /// Surface response, verbatim
    pub raw_body: String,
}

/// Why a post did not go out
#[derive(Debug, Clone)]
pub enum PostFailure {
    Media(MediaError),
    Surface(SurfaceError),
}

impl fmt::Display for PostFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostFailure::Media(e) => write!(f, "{}", e),
            PostFailure::Surface(e) => write!(f, "{}", e),
        }
    }
}

/// Result of one item
#[derive(Debug, Clone)]
pub enum PostOutcome {
    Succeeded(PostRecord),
    Failed(PostFailure),
    /// The run stopped before this item was tried
    NotAttempted { reason: String },
}

impl PostOutcome {
    pub fn state(&self) -> PostState {
        match self {
            PostOutcome::Succeeded(_) => PostState::Succeeded,
            PostOutcome::Failed(_) => PostState::Failed,
            PostOutcome::NotAttempted { .. } => PostState::Pending,
        }
    }

    pub fn record(&self) -> Option<&PostRecord> {
        match self {
            PostOutcome::Succeeded(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PostOutcome::Succeeded(_))
    }
}

/// Outcome of one media item, with enough context to print it
#[derive(Debug, Clone)]
pub struct ItemReport {
    pub ordinal: usize,
    pub label: String,
    pub outcome: PostOutcome,
}

/// A secondary item left out because it could not be resolved
#[derive(Debug, Clone)]
pub struct SkippedMedia {
    pub ordinal: usize,
    pub error: MediaError,
}

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    /// Head and every secondary posted
    Complete,
    /// Head posted, at least one secondary failed or was skipped
    Partial,
    /// Head not posted
    Aborted,
}

impl PublishStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            PublishStatus::Complete => 0,
            PublishStatus::Partial => 2,
            PublishStatus::Aborted => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PublishStatus::Complete => "complete",
            PublishStatus::Partial => "partial",
            PublishStatus::Aborted => "aborted",
        }
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub channel: String,
    pub head: ItemReport,
    /// Attempted replies, in media order
    pub replies: Vec<ItemReport>,
    pub skipped: Vec<SkippedMedia>,
    pub status: PublishStatus,
    /// Step events that could not be written
    pub log_write_failures: usize,
}

impl PublishReport {
    /// Derives the status from the item outcomes
    pub(crate) fn compute_status(
        head: &ItemReport,
        replies: &[ItemReport],
        skipped: &[SkippedMedia],
    ) -> PublishStatus {
        if !head.outcome.is_success() {
            PublishStatus::Aborted
        } else if skipped.is_empty() && replies.iter().all(|r| r.outcome.is_success()) {
            PublishStatus::Complete
        } else {
            PublishStatus::Partial
        }
    }

    pub fn head_message_id(&self) -> Option<MessageId> {
        self.head.outcome.record().map(|r| r.message_id)
    }

    pub fn posted_count(&self) -> usize {
        std::iter::once(&self.head)
            .chain(self.replies.iter())
            .filter(|item| item.outcome.is_success())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        std::iter::once(&self.head)
            .chain(self.replies.iter())
            .filter(|item| matches!(item.outcome, PostOutcome::Failed(_)))
            .count()
    }

    /// One human-readable line per item
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(item_line("head", &self.head));
        for reply in &self.replies {
            lines.push(item_line("reply", reply));
        }
        for skipped in &self.skipped {
            lines.push(format!(
                "  [skip] #{} {}: {}",
                skipped.ordinal,
                skipped.error.path(),
                skipped.error
            ));
        }
        lines
    }
}

fn item_line(role: &str, item: &ItemReport) -> String {
    match &item.outcome {
        PostOutcome::Succeeded(record) => format!(
            "  [ok]   #{} {} {} -> message {}",
            item.ordinal, role, item.label, record.message_id
        ),
        PostOutcome::Failed(failure) => format!(
            "  [fail] #{} {} {}: {}",
            item.ordinal, role, item.label, failure
        ),
        PostOutcome::NotAttempted { reason } => format!(
            "  [--]   #{} {} {}: not attempted ({})",
            item.ordinal, role, item.label, reason
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::surface::SurfaceErrorKind;

    fn ok(ordinal: usize, id: i64) -> ItemReport {
        ItemReport {
            ordinal,
            label: format!("{}.jpg", ordinal),
            outcome: PostOutcome::Succeeded(PostRecord {
                message_id: MessageId(id),
                parent_id: if ordinal == 0 { None } else { Some(MessageId(1)) },
                posted_at: Utc::now(),
                raw_body: "{}".to_string(),
            }),
        }
    }

    fn failed(ordinal: usize) -> ItemReport {
        ItemReport {
            ordinal,
            label: format!("{}.jpg", ordinal),
            outcome: PostOutcome::Failed(PostFailure::Surface(SurfaceError::new(
                SurfaceErrorKind::RateLimited { retry_after: Some(3) },
                "Too Many Requests",
            ))),
        }
    }

    fn report(head: ItemReport, replies: Vec<ItemReport>, skipped: Vec<SkippedMedia>) -> PublishReport {
        let status = PublishReport::compute_status(&head, &replies, &skipped);
        PublishReport {
            channel: "@prachar".to_string(),
            head,
            replies,
            skipped,
            status,
            log_write_failures: 0,
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(PublishStatus::Complete.exit_code(), 0);
        assert_eq!(PublishStatus::Partial.exit_code(), 2);
        assert_eq!(PublishStatus::Aborted.exit_code(), 3);
    }

    #[test]
    fn test_status_complete() {
        let r = report(ok(0, 1), vec![ok(1, 2), ok(2, 3)], vec![]);
        assert_eq!(r.status, PublishStatus::Complete);
        assert_eq!(r.posted_count(), 3);
        assert_eq!(r.head_message_id(), Some(MessageId(1)));
    }

    #[test]
    fn test_status_partial_on_reply_failure() {
        let r = report(ok(0, 1), vec![ok(1, 2), failed(2)], vec![]);
        assert_eq!(r.status, PublishStatus::Partial);
        assert_eq!(r.failed_count(), 1);
    }

    #[test]
    fn test_status_partial_on_skipped_media() {
        let skipped = vec![SkippedMedia {
            ordinal: 1,
            error: MediaError::Unreadable {
                path: "1.jpg".to_string(),
                reason: "missing".to_string(),
            },
        }];
        let r = report(ok(0, 1), vec![], skipped);
        assert_eq!(r.status, PublishStatus::Partial);
    }

    #[test]
    fn test_status_aborted_without_head() {
        let r = report(failed(0), vec![], vec![]);
        assert_eq!(r.status, PublishStatus::Aborted);
        assert_eq!(r.head_message_id(), None);
        assert_eq!(r.posted_count(), 0);
    }

    #[test]
    fn test_summary_lines() {
        let r = report(ok(0, 10), vec![failed(1)], vec![]);
        let lines = r.summary_lines();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[ok]"));
        assert!(lines[0].contains("message 10"));
        assert!(lines[1].contains("[fail]"));
        assert!(lines[1].contains("rate_limited"));
    }

    #[test]
    fn test_not_attempted_state() {
        let outcome = PostOutcome::NotAttempted {
            reason: "media 2 unreadable".to_string(),
        };
        assert_eq!(outcome.state(), PostState::Pending);
        assert!(outcome.record().is_none());
    }
}
