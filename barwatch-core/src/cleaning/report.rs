//! Cleaning report: what the pipeline did to one symbol.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Field;

/// One corrective action applied to a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CleaningAction {
    NegativePricesCleared { field: Field, count: usize },
    FilledMissing { field: Field, count: usize },
    FilledVolumeMedian { count: usize },
    ReplacedOutliers { field: Field, count: usize },
    FixedOhlc { count: usize },
    RemovedOutsideSession { count: usize },
}

impl fmt::Display for CleaningAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleaningAction::NegativePricesCleared { field, count } => {
                write!(f, "Cleared {count} negative values in {field}")
            }
            CleaningAction::FilledMissing { field, count } => {
                write!(f, "Filled {count} missing values in {field}")
            }
            CleaningAction::FilledVolumeMedian { count } => {
                write!(f, "Filled {count} missing volume values with median")
            }
            CleaningAction::ReplacedOutliers { field, count } => {
                write!(f, "Replaced {count} outliers in {field}")
            }
            CleaningAction::FixedOhlc { count } => {
                write!(f, "Fixed {count} OHLC relationship violations")
            }
            CleaningAction::RemovedOutsideSession { count } => {
                write!(f, "Removed {count} records outside market hours")
            }
        }
    }
}

/// Per-symbol cleaning summary. Built once by the pipeline and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    symbol: String,
    actions: Vec<CleaningAction>,
    original_rows: usize,
    cleaned_rows: usize,
    cleaned_at: NaiveDateTime,
}

impl CleaningReport {
    pub(crate) fn new(
        symbol: String,
        actions: Vec<CleaningAction>,
        original_rows: usize,
        cleaned_rows: usize,
        cleaned_at: NaiveDateTime,
    ) -> Self {
        Self {
            symbol,
            actions,
            original_rows,
            cleaned_rows,
            cleaned_at,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn actions(&self) -> &[CleaningAction] {
        &self.actions
    }

    /// Human-readable action lines, in the order they were applied.
    pub fn descriptions(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.to_string()).collect()
    }

    pub fn original_rows(&self) -> usize {
        self.original_rows
    }

    pub fn cleaned_rows(&self) -> usize {
        self.cleaned_rows
    }

    pub fn cleaned_at(&self) -> NaiveDateTime {
        self.cleaned_at
    }
}
