//! Series — the time-ordered bars of one symbol.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::bar::{Bar, Field};

/// Time-ordered bars for one symbol.
///
/// `columns` records which OHLCV fields the data source actually supplied.
/// Values of absent fields are always `None`; stages that need an absent
/// column skip themselves. Timestamps are expected to be strictly
/// increasing, which the data source guarantees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub symbol: String,
    pub columns: BTreeSet<Field>,
    pub bars: Vec<Bar>,
}

impl Series {
    /// A series carrying all five OHLCV columns.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            columns: Field::ALL.into_iter().collect(),
            bars,
        }
    }

    /// A series carrying only the given columns. Values of other fields are
    /// cleared so the two views never disagree.
    pub fn with_columns(
        symbol: impl Into<String>,
        columns: impl IntoIterator<Item = Field>,
        mut bars: Vec<Bar>,
    ) -> Self {
        let columns: BTreeSet<Field> = columns.into_iter().collect();
        for field in Field::ALL {
            if !columns.contains(&field) {
                for bar in &mut bars {
                    bar.set(field, None);
                }
            }
        }
        Self {
            symbol: symbol.into(),
            columns,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn has_column(&self, field: Field) -> bool {
        self.columns.contains(&field)
    }

    /// Values of one column, or `None` if the source did not supply it.
    pub fn column(&self, field: Field) -> Option<Vec<Option<f64>>> {
        if !self.has_column(field) {
            return None;
        }
        Some(
            self.bars
                .iter()
                .map(|b| b.get(field).filter(|v| !v.is_nan()))
                .collect(),
        )
    }

    /// Overwrite one column. `values` must have one entry per bar.
    pub fn set_column(&mut self, field: Field, values: &[Option<f64>]) {
        debug_assert_eq!(values.len(), self.bars.len());
        for (bar, value) in self.bars.iter_mut().zip(values) {
            bar.set(field, *value);
        }
        self.columns.insert(field);
    }

    /// Number of missing values in a column (0 for absent columns).
    pub fn null_count(&self, field: Field) -> usize {
        self.column(field)
            .map(|values| values.iter().filter(|v| v.is_none()).count())
            .unwrap_or(0)
    }

    /// The most recent bar timestamp.
    pub fn latest_timestamp(&self) -> Option<chrono::NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).max()
    }

    /// Close-to-close fractional returns. A missing close carries the last
    /// known close forward, so it contributes a zero return and the bar
    /// after it is measured against the last known close. Leading missing
    /// closes and pairs with a zero previous close yield no return.
    pub fn close_returns(&self) -> Vec<f64> {
        let mut returns = Vec::with_capacity(self.bars.len().saturating_sub(1));
        let mut prev: Option<f64> = None;
        for bar in &self.bars {
            let current = bar.close.filter(|c| !c.is_nan()).or(prev);
            if let (Some(p), Some(c)) = (prev, current) {
                if p != 0.0 {
                    returns.push(c / p - 1.0);
                }
            }
            prev = current;
        }
        returns
    }

    /// Keep only the bars matching `keep`, returning how many were dropped.
    pub fn retain(&mut self, keep: impl FnMut(&Bar) -> bool) -> usize {
        let before = self.bars.len();
        self.bars.retain(keep);
        before - self.bars.len()
    }
}
