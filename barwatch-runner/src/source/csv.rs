//! CSV file source.
//!
//! Expects one file per symbol with a header row: a timestamp column
//! (`Date`, `Datetime` or `Timestamp`) followed by any of
//! `Open,High,Low,Close,Volume` in any order and case. Blank, `NaN` and
//! `null` cells read as missing. Timestamps with a UTC offset are kept as
//! their local wall-clock time.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use barwatch_core::{Bar, Field, Series};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use super::{canonicalize, check_required, DataSource, SourceError};

const TIMESTAMP_HEADERS: [&str; 4] = ["date", "datetime", "timestamp", "time"];

/// Reads `<dir>/<SYMBOL>.csv`, or an explicit path per symbol.
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
    paths: BTreeMap<String, PathBuf>,
    required: Vec<Field>,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>, required: &[Field]) -> Self {
        Self {
            dir: dir.into(),
            paths: BTreeMap::new(),
            required: required.to_vec(),
        }
    }

    /// Override the file used for one symbol.
    pub fn with_path(mut self, symbol: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(symbol.into(), path.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.paths
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| self.dir.join(format!("{symbol}.csv")))
    }
}

impl DataSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_symbol(&self, symbol: &str) -> Result<Series, SourceError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(SourceError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        read_csv_file(symbol, &path, &self.required)
    }
}

/// Read one symbol's bars from a CSV file.
pub fn read_csv_file(symbol: &str, path: &Path, required: &[Field]) -> Result<Series, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        symbol: symbol.to_string(),
        reason: format!("{}: {e}", path.display()),
    })?;
    parse_csv(symbol, file, required)
}

/// Parse CSV bar data from any reader.
pub fn parse_csv<R: Read>(
    symbol: &str,
    reader: R,
    required: &[Field],
) -> Result<Series, SourceError> {
    let csv_err = |line: usize, e: ::csv::Error| SourceError::Parse {
        symbol: symbol.to_string(),
        line,
        reason: e.to_string(),
    };

    let mut rdr = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| csv_err(1, e))?.clone();

    let ts_idx = headers
        .iter()
        .position(|h| TIMESTAMP_HEADERS.contains(&h.to_ascii_lowercase().as_str()))
        .ok_or_else(|| SourceError::MissingColumn {
            symbol: symbol.to_string(),
            column: "date".into(),
        })?;

    let columns: Vec<(Field, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| Field::from_header(h).map(|f| (f, i)))
        .collect();
    let supplied: Vec<Field> = columns.iter().map(|(f, _)| *f).collect();
    check_required(symbol, &supplied, required)?;

    let mut bars = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        // Header is line 1.
        let line = row + 2;
        let record = record.map_err(|e| csv_err(line, e))?;

        let raw_ts = record.get(ts_idx).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| SourceError::Parse {
            symbol: symbol.to_string(),
            line,
            reason: format!("unrecognised timestamp '{raw_ts}'"),
        })?;

        let mut bar = Bar::empty(timestamp);
        for (field, idx) in &columns {
            let raw = record.get(*idx).unwrap_or_default();
            let value = parse_value(*field, raw).map_err(|reason| {
                SourceError::Parse {
                    symbol: symbol.to_string(),
                    line,
                    reason: format!("{field}: {reason}"),
                }
            })?;
            bar.set(*field, value);
        }
        bars.push(bar);
    }

    let dropped = canonicalize(&mut bars);
    if dropped > 0 {
        debug!(%symbol, dropped, "dropped duplicate timestamps");
    }

    Ok(Series::with_columns(symbol, supplied, bars))
}

/// Parse the timestamp formats seen in exported bar files.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Blank, `NaN` and `null` are missing. Infinite values are rejected and a
/// negative volume reads as missing.
fn parse_value(field: Field, raw: &str) -> Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|e| format!("invalid number '{raw}': {e}"))?;
    if value.is_nan() {
        return Ok(None);
    }
    if !value.is_finite() {
        return Err(format!("non-finite value '{raw}'"));
    }
    if field == Field::Volume && value < 0.0 {
        return Ok(None);
    }
    Ok(Some(value))
}
