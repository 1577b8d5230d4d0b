//! Data source trait and structured error types.
//!
//! The DataSource trait abstracts over where raw bars come from (CSV files,
//! in-memory fixtures, the synthetic generator) so the orchestrator never
//! depends on a particular feed. Sources hand back canonical series: sorted
//! by timestamp with duplicate timestamps removed.

pub mod csv;
pub mod memory;
pub mod synthetic;

use std::collections::BTreeMap;

use barwatch_core::{Bar, Field, Series};
use thiserror::Error;
use tracing::{info, warn};

pub use self::csv::CsvSource;
pub use memory::MemorySource;
pub use synthetic::SyntheticSource;

/// Structured error types for data acquisition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("{symbol}: missing required column '{column}'")]
    MissingColumn { symbol: String, column: String },

    #[error("{symbol}: I/O error: {reason}")]
    Io { symbol: String, reason: String },

    #[error("{symbol}: line {line}: {reason}")]
    Parse {
        symbol: String,
        line: usize,
        reason: String,
    },
}

/// Result of fetching a batch of symbols.
///
/// Failures are per symbol: one unreadable file never hides the others.
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub series: BTreeMap<String, Series>,
    pub failures: BTreeMap<String, SourceError>,
}

/// Trait for raw bar sources.
pub trait DataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the raw series for one symbol.
    fn fetch_symbol(&self, symbol: &str) -> Result<Series, SourceError>;

    /// Fetch several symbols, collecting failures instead of stopping.
    fn fetch(&self, symbols: &[&str]) -> SourceBatch {
        let mut batch = SourceBatch::default();
        for symbol in symbols {
            match self.fetch_symbol(symbol) {
                Ok(series) => {
                    info!(source = self.name(), %symbol, bars = series.len(), "fetched");
                    batch.series.insert(symbol.to_string(), series);
                }
                Err(e) => {
                    warn!(source = self.name(), %symbol, error = %e, "fetch failed");
                    batch.failures.insert(symbol.to_string(), e);
                }
            }
        }
        batch
    }
}

/// Sort bars by timestamp and drop duplicate timestamps, keeping the first
/// occurrence. Returns the number of duplicates dropped.
pub fn canonicalize(bars: &mut Vec<Bar>) -> usize {
    let before = bars.len();
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    before - bars.len()
}

/// Check a set of supplied columns against the required ones.
pub fn check_required(
    symbol: &str,
    supplied: &[Field],
    required: &[Field],
) -> Result<(), SourceError> {
    match required.iter().find(|f| !supplied.contains(*f)) {
        Some(column) => Err(SourceError::MissingColumn {
            symbol: symbol.to_string(),
            column: column.name().to_string(),
        }),
        None => Ok(()),
    }
}
