//! barwatch runner — data sources, alerting, monitoring and batch runs.
//!
//! This crate builds on `barwatch-core` to provide:
//! - Data sources (CSV directories, in-memory fixtures, synthetic bars)
//! - Alert events and sinks (log, JSON lines, in-memory)
//! - Health monitoring with staleness alerts
//! - The orchestrator that cleans, validates and monitors a batch in parallel

pub mod alert;
pub mod monitor;
pub mod orchestrator;
pub mod source;

pub use alert::{
    AlertError, AlertEvent, AlertKind, AlertSink, JsonlSink, LogSink, MemorySink, NoopSink,
    Severity,
};
pub use monitor::{Monitor, MonitoringResult, SymbolHealth};
pub use orchestrator::{dataset_hash, Orchestrator, RunError, RunSummary};
pub use source::{
    CsvSource, DataSource, MemorySource, SourceBatch, SourceError, SyntheticSource,
};
