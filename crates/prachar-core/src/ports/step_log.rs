//! Step log port definition
//!
//! Every state transition of a publish run is recorded as a [`StepEvent`].
//! Implementations must make the event durable before `record` returns.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Phase of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepPhase {
    /// Step began
    Start,
    /// Step completed successfully
    Done,
    /// Step failed
    Fail,
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepPhase::Start => write!(f, "START"),
            StepPhase::Done => write!(f, "DONE"),
            StepPhase::Fail => write!(f, "FAIL"),
        }
    }
}

/// Operation a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOperation {
    /// The whole publish run
    Campaign,
    /// Reading and classifying one media item
    MediaResolve,
    /// Posting the head message
    HeadPost,
    /// Posting one threaded reply
    ReplyPost,
}

impl fmt::Display for StepOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepOperation::Campaign => "campaign",
            StepOperation::MediaResolve => "media_resolve",
            StepOperation::HeadPost => "head_post",
            StepOperation::ReplyPost => "reply_post",
        };
        f.write_str(name)
    }
}

/// One structured audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Emission time
    pub timestamp: DateTime<Utc>,
    /// START / DONE / FAIL
    pub phase: StepPhase,
    /// Operation name
    pub operation: StepOperation,
    /// Media ordinal, for per-item steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,
    /// Free-form payload (API response, error detail, counts)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
}

impl StepEvent {
    /// Creates an event stamped with the current time
    pub fn new(phase: StepPhase, operation: StepOperation) -> Self {
        Self {
            timestamp: Utc::now(),
            phase,
            operation,
            ordinal: None,
            context: Value::Null,
        }
    }

    pub fn start(operation: StepOperation) -> Self {
        Self::new(StepPhase::Start, operation)
    }

    pub fn done(operation: StepOperation) -> Self {
        Self::new(StepPhase::Done, operation)
    }

    pub fn fail(operation: StepOperation) -> Self {
        Self::new(StepPhase::Fail, operation)
    }

    /// Attributes the event to a media ordinal
    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Sets the context payload
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Errors raised by a step log sink
#[derive(Debug, Error)]
pub enum StepLogError {
    /// Log directory could not be created
    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(String),

    /// Log file could not be opened
    #[error("Failed to open step log {path}: {reason}")]
    OpenFailed {
        /// Path of the log file
        path: String,
        /// Underlying error
        reason: std::io::Error,
    },

    /// Event could not be serialized
    #[error("Failed to serialize step event: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Write or flush failed
    #[error("Failed to write step event: {0}")]
    Write(#[from] std::io::Error),
}

/// Port for the append-only step log
///
/// `record` is synchronous and may block on disk IO. The publisher runs one
/// step at a time and must not start the next step before the previous event
/// is durable, so implementations block the calling task rather than hand the
/// write off.
pub trait StepLogPort: Send {
    /// Appends one event; returns only after the event is durable
    fn record(&mut self, event: StepEvent) -> Result<(), StepLogError>;

    /// Physical location of the log, when it has one
    fn location(&self) -> Option<&Path> {
        None
    }
}
