//! Alert events and delivery sinks.
//!
//! The orchestrator and the monitor describe what went wrong as
//! [`AlertEvent`]s and hand them to an [`AlertSink`]. Delivery is best
//! effort: a failing sink is logged and the run carries on.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use barwatch_core::ThresholdBreach;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// What an alert is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    /// A validator metric crossed its limit.
    ThresholdExceeded(ThresholdBreach),
    /// The latest bar is older than the staleness limit.
    StaleData {
        symbol: String,
        minutes_old: f64,
        limit: f64,
    },
    /// Consecutive bars further apart than twice the expected interval.
    TimestampGaps {
        symbol: String,
        gap_count: usize,
        gap_pct: f64,
    },
    /// The symbol could not be fetched or cleaned.
    SymbolFailed { symbol: String, reason: String },
}

impl AlertKind {
    pub fn symbol(&self) -> &str {
        match self {
            AlertKind::ThresholdExceeded(b) => &b.symbol,
            AlertKind::StaleData { symbol, .. }
            | AlertKind::TimestampGaps { symbol, .. }
            | AlertKind::SymbolFailed { symbol, .. } => symbol,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlertKind::SymbolFailed { .. } | AlertKind::StaleData { .. } => Severity::Critical,
            AlertKind::ThresholdExceeded(_) | AlertKind::TimestampGaps { .. } => {
                Severity::Warning
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub kind: AlertKind,
}

impl AlertEvent {
    pub fn new(timestamp: NaiveDateTime, kind: AlertKind) -> Self {
        Self { timestamp, kind }
    }

    /// One-line summary for logs and terminals.
    pub fn message(&self) -> String {
        match &self.kind {
            AlertKind::ThresholdExceeded(b) => format!("threshold exceeded: {b}"),
            AlertKind::StaleData {
                symbol,
                minutes_old,
                limit,
            } => format!("{symbol}: data is {minutes_old:.1} minutes old (limit {limit:.1})"),
            AlertKind::TimestampGaps {
                symbol,
                gap_count,
                gap_pct,
            } => format!("{symbol}: {gap_count} timestamp gaps ({gap_pct:.2}% of rows)"),
            AlertKind::SymbolFailed { symbol, reason } => format!("{symbol}: failed: {reason}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert sink {sink}: I/O error: {reason}")]
    Io { sink: String, reason: String },

    #[error("alert sink {sink}: encode event: {reason}")]
    Encode { sink: String, reason: String },
}

/// Destination for alert events.
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    fn notify(&self, event: &AlertEvent) -> Result<(), AlertError>;
}

/// Deliver an event, logging instead of failing when the sink errors.
pub fn dispatch(sink: &dyn AlertSink, event: &AlertEvent) {
    if let Err(e) = sink.notify(event) {
        error!(sink = sink.name(), error = %e, "alert delivery failed");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl AlertSink for NoopSink {
    fn name(&self) -> &str {
        "noop"
    }

    fn notify(&self, _event: &AlertEvent) -> Result<(), AlertError> {
        Ok(())
    }
}

/// Writes events to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn notify(&self, event: &AlertEvent) -> Result<(), AlertError> {
        let symbol = event.kind.symbol();
        match event.kind.severity() {
            Severity::Critical => error!(%symbol, at = %event.timestamp, "{}", event.message()),
            Severity::Warning => warn!(%symbol, at = %event.timestamp, "{}", event.message()),
        }
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    /// Open (or create) the file in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AlertError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AlertError::Io {
                sink: path.display().to_string(),
                reason: e.to_string(),
            })?;
        info!(path = %path.display(), "writing alerts");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, e: impl ToString) -> AlertError {
        AlertError::Io {
            sink: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

impl AlertSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn notify(&self, event: &AlertEvent) -> Result<(), AlertError> {
        let mut line = serde_json::to_string(event).map_err(|e| AlertError::Encode {
            sink: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        line.push('\n');
        let mut file = self.file.lock().map_err(|e| self.io_err(e))?;
        file.write_all(line.as_bytes()).map_err(|e| self.io_err(e))?;
        file.flush().map_err(|e| self.io_err(e))
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AlertEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<AlertEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AlertSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn notify(&self, event: &AlertEvent) -> Result<(), AlertError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
        Ok(())
    }
}
