//! Symbol-scoped errors.
//!
//! These abort work on one symbol only; the orchestrator records them and
//! moves on to the next symbol.

use thiserror::Error;

use crate::domain::Field;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QualityError {
    #[error("{symbol}: missing required column '{column}'")]
    MissingColumn { symbol: String, column: Field },
}

/// Reasons a stage declined to act. Logged, never recorded as an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSkip {
    /// The column is not carried by the series.
    ColumnAbsent(Field),
    /// Too few non-null values for a statistical test.
    InsufficientData {
        field: Field,
        available: usize,
        required: usize,
    },
}
