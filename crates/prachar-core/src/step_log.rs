//! Durable JSON Lines step logger
//!
//! One file per run, named after the run's start time. Each event is written
//! as a single line and synced to disk before `record` returns, so a crash
//! mid-campaign leaves an accurate trail of what was attempted.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::ports::step_log::{StepEvent, StepLogError, StepLogPort, StepPhase};

/// File name for a run started at `started_at`
pub fn step_log_file_name(started_at: DateTime<Local>) -> String {
    format!("{}.jsonl", started_at.format("%Y%m%d_%H%M%S"))
}

/// Append-only step log backed by a local file
#[derive(Debug)]
pub struct StepLogger {
    path: PathBuf,
    file: File,
    events_written: usize,
}

impl StepLogger {
    /// Opens the log file for a run, creating `log_dir` when needed
    ///
    /// A run starting within the same second as a previous one appends to
    /// the existing file.
    pub fn open(log_dir: &Path, started_at: DateTime<Local>) -> Result<Self, StepLogError> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).map_err(|e| {
                StepLogError::DirectoryCreationFailed(format!("{}: {}", log_dir.display(), e))
            })?;
        }

        let path = log_dir.join(step_log_file_name(started_at));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|reason| StepLogError::OpenFailed {
                path: path.display().to_string(),
                reason,
            })?;

        info!(path = %path.display(), "Step log opened");

        Ok(Self {
            path,
            file,
            events_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Events written by this handle
    pub fn events_written(&self) -> usize {
        self.events_written
    }
}

impl StepLogPort for StepLogger {
    fn record(&mut self, event: StepEvent) -> Result<(), StepLogError> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()?;
        self.events_written += 1;

        mirror_to_tracing(&event);
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

fn mirror_to_tracing(event: &StepEvent) {
    match event.phase {
        StepPhase::Fail => warn!(
            target: "prachar::step",
            phase = %event.phase,
            operation = %event.operation,
            ordinal = ?event.ordinal,
            context = %event.context,
            "step"
        ),
        _ => info!(
            target: "prachar::step",
            phase = %event.phase,
            operation = %event.operation,
            ordinal = ?event.ordinal,
            "step"
        ),
    }
}

/// Reads every event back from a step log file
pub fn read_events(path: &Path) -> Result<Vec<StepEvent>, StepLogError> {
    let file = File::open(path).map_err(|reason| StepLogError::OpenFailed {
        path: path.display().to_string(),
        reason,
    })?;

    let mut events = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}
