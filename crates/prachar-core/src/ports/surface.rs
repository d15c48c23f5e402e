//! Messaging surface port definition

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::media::MediaItem;

/// Identifier the surface assigns to a posted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One media post to send to the surface
#[derive(Debug, Clone, Copy)]
pub struct SendMediaRequest<'a> {
    /// Destination channel (`@name` or numeric chat id)
    pub chat_id: &'a str,
    /// Resolved media to attach
    pub media: &'a MediaItem,
    /// Caption text, if any
    pub caption: Option<&'a str>,
    /// Message to thread this post under
    pub reply_to: Option<MessageId>,
}

/// Successful response from the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceReceipt {
    /// Identifier of the created message
    pub message_id: MessageId,
    /// Unix timestamp reported by the surface
    pub date: Option<i64>,
    /// Response body, verbatim
    pub raw_body: String,
}

/// Classification of a failed surface call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceErrorKind {
    /// Bot credential rejected (401/403)
    Unauthorized,
    /// Too many requests (429)
    RateLimited {
        /// Seconds the surface asked us to wait
        retry_after: Option<u64>,
    },
    /// Malformed or refused request (other 4xx, or `ok: false`)
    Rejected,
    /// Surface-side failure (5xx)
    Unavailable,
    /// Connection or transport failure
    Transport,
    /// Call did not complete within its deadline
    Timeout,
    /// Success status but an unusable body
    InvalidResponse,
}

impl SurfaceErrorKind {
    /// Stable snake_case name used in step log context
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceErrorKind::Unauthorized => "unauthorized",
            SurfaceErrorKind::RateLimited { .. } => "rate_limited",
            SurfaceErrorKind::Rejected => "rejected",
            SurfaceErrorKind::Unavailable => "unavailable",
            SurfaceErrorKind::Transport => "transport",
            SurfaceErrorKind::Timeout => "timeout",
            SurfaceErrorKind::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for SurfaceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceErrorKind::RateLimited {
                retry_after: Some(secs),
            } => write!(f, "rate_limited (retry after {}s)", secs),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A failed surface call
///
/// `raw_body` carries whatever the surface answered, untouched, so it can be
/// written into the step log for post-mortem debugging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct SurfaceError {
    /// Error classification
    pub kind: SurfaceErrorKind,
    /// Human-readable description
    pub detail: String,
    /// Response body, if one was received
    pub raw_body: Option<String>,
}

impl SurfaceError {
    /// Creates an error without a response body
    pub fn new(kind: SurfaceErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            raw_body: None,
        }
    }

    /// Attaches the raw response body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    /// Error for a call that exceeded `limit`
    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            SurfaceErrorKind::Timeout,
            format!("no response within {}s", limit.as_secs_f64()),
        )
    }
}

/// Port for the external messaging surface
#[async_trait]
pub trait MessagingSurfacePort: Send + Sync {
    /// Post one media message, optionally as a reply
    async fn send_media(
        &self,
        request: SendMediaRequest<'_>,
    ) -> Result<SurfaceReceipt, SurfaceError>;
}
