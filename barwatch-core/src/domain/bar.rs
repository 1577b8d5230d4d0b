//! Bar — the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One OHLCV column of a bar series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    /// The four price columns, in OHLC order.
    pub const PRICES: [Field; 4] = [Field::Open, Field::High, Field::Low, Field::Close];

    /// Every OHLCV column.
    pub const ALL: [Field; 5] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
    ];

    /// Lowercase column name, used for metric keys (`close_missing_pct`).
    pub fn name(self) -> &'static str {
        match self {
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
        }
    }

    pub fn is_price(self) -> bool {
        !matches!(self, Field::Volume)
    }

    /// Parse a column header, ignoring case and surrounding whitespace.
    pub fn from_header(header: &str) -> Option<Field> {
        match header.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Field::Open),
            "high" => Some(Field::High),
            "low" => Some(Field::Low),
            "close" => Some(Field::Close),
            "volume" => Some(Field::Volume),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// OHLCV bar for a single symbol over a single interval.
///
/// Every value is nullable: raw feeds drop fields, and the cleaning stages
/// are what turn `None` into numbers. After repair a bar with all four
/// prices present satisfies `high >= max(open, close)` and
/// `low <= min(open, close)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Exchange-local wall-clock time the interval starts at.
    pub timestamp: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl Bar {
    /// A fully populated bar.
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }

    /// A bar with every value missing.
    pub fn empty(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        }
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Open => self.open,
            Field::High => self.high,
            Field::Low => self.low,
            Field::Close => self.close,
            Field::Volume => self.volume,
        }
    }

    pub fn set(&mut self, field: Field, value: Option<f64>) {
        let slot = match field {
            Field::Open => &mut self.open,
            Field::High => &mut self.high,
            Field::Low => &mut self.low,
            Field::Close => &mut self.close,
            Field::Volume => &mut self.volume,
        };
        *slot = value;
    }

    /// Returns true if all four prices are present (NaN counts as missing).
    pub fn has_all_prices(&self) -> bool {
        Field::PRICES
            .iter()
            .all(|&f| self.get(f).is_some_and(|v| !v.is_nan()))
    }

    /// Returns true if none of the given columns is missing.
    pub fn is_complete<'a>(&self, columns: impl IntoIterator<Item = &'a Field>) -> bool {
        columns
            .into_iter()
            .all(|&f| self.get(f).is_some_and(|v| !v.is_nan()))
    }

    /// OHLC ordering check. Bars with a missing price are not judged and
    /// return true.
    pub fn satisfies_ohlc(&self) -> bool {
        match (self.open, self.high, self.low, self.close) {
            (Some(o), Some(h), Some(l), Some(c)) => h >= o.max(c) && l <= o.min(c),
            _ => true,
        }
    }

    /// Midpoint of the high/low range.
    pub fn mid_price(&self) -> Option<f64> {
        Some((self.high? + self.low?) / 2.0)
    }

    /// High minus low.
    pub fn range(&self) -> Option<f64> {
        Some(self.high? - self.low?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn sample_bar() -> Bar {
        Bar::new(ts(), 100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn bar_satisfies_ohlc() {
        assert!(sample_bar().satisfies_ohlc());
        assert!(sample_bar().has_all_prices());
    }

    #[test]
    fn bar_detects_inverted_high() {
        let mut bar = sample_bar();
        bar.high = Some(101.0); // below close
        assert!(!bar.satisfies_ohlc());
    }

    #[test]
    fn nan_counts_as_missing() {
        let mut bar = sample_bar();
        bar.open = Some(f64::NAN);
        assert!(!bar.has_all_prices());
        assert!(!bar.is_complete(&Field::ALL));
    }

    #[test]
    fn missing_price_is_not_judged() {
        let mut bar = sample_bar();
        bar.low = None;
        bar.high = Some(1.0);
        assert!(bar.satisfies_ohlc());
    }

    #[test]
    fn derived_prices() {
        let bar = sample_bar();
        assert_eq!(bar.mid_price(), Some(101.5));
        assert_eq!(bar.range(), Some(7.0));
        assert_eq!(Bar::empty(ts()).mid_price(), None);
    }

    #[test]
    fn field_headers_parse_case_insensitively() {
        assert_eq!(Field::from_header(" Close "), Some(Field::Close));
        assert_eq!(Field::from_header("VOLUME"), Some(Field::Volume));
        assert_eq!(Field::from_header("Adj Close"), None);
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
