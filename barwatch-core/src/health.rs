//! Health scoring — per-symbol quality factors and a system-wide score.
//!
//! Three factors, each in [0, 100]:
//! - **freshness**: `100 - hours_since_latest_bar * 100` (stale after one hour)
//! - **completeness**: share of rows with no missing value in any carried column
//! - **consistency**: share of close-to-close returns within the move limit
//!
//! The symbol score weights them 0.4 / 0.4 / 0.2; a series with no bars
//! scores 0.0 outright. The system score is the plain mean of symbol scores,
//! or 0.0 when there are no symbols.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, QualityConfig};
use crate::domain::Series;

pub const FRESHNESS_WEIGHT: f64 = 0.4;
pub const COMPLETENESS_WEIGHT: f64 = 0.4;
pub const CONSISTENCY_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthFactors {
    pub freshness: f64,
    pub completeness: f64,
    pub consistency: f64,
}

impl HealthFactors {
    /// Weighted symbol score.
    pub fn score(&self) -> f64 {
        self.freshness * FRESHNESS_WEIGHT
            + self.completeness * COMPLETENESS_WEIGHT
            + self.consistency * CONSISTENCY_WEIGHT
    }
}

#[derive(Debug, Clone)]
pub struct HealthScorer {
    /// Absolute fractional return above which a move counts as extreme.
    extreme_return: f64,
}

impl HealthScorer {
    pub fn new(config: &QualityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            extreme_return: config.thresholds.max_price_change_pct / 100.0,
        })
    }

    /// All three factors for one series, judged at `as_of`.
    pub fn factors(&self, series: &Series, as_of: NaiveDateTime) -> HealthFactors {
        HealthFactors {
            freshness: freshness(series, as_of),
            completeness: completeness(series),
            consistency: self.consistency(series),
        }
    }

    pub fn consistency(&self, series: &Series) -> f64 {
        let returns = series.close_returns();
        if returns.is_empty() {
            return 100.0;
        }
        let extreme = returns
            .iter()
            .filter(|r| r.abs() > self.extreme_return)
            .count();
        (100.0 - extreme as f64 / returns.len() as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Weighted score for one series. No bars means no health.
    pub fn symbol_score(&self, series: &Series, as_of: NaiveDateTime) -> f64 {
        if series.is_empty() {
            return 0.0;
        }
        self.factors(series, as_of).score()
    }

    /// Mean symbol score across the batch; 0.0 for an empty batch.
    pub fn system_score<'a>(
        &self,
        batch: impl IntoIterator<Item = &'a Series>,
        as_of: NaiveDateTime,
    ) -> f64 {
        let scores: Vec<f64> = batch
            .into_iter()
            .map(|s| self.symbol_score(s, as_of))
            .collect();
        mean_score(&scores)
    }
}

/// Mean of symbol scores; 0.0 when there are none.
pub fn mean_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Hours between the latest bar and `as_of`, or `None` for an empty series.
pub fn hours_since_latest(series: &Series, as_of: NaiveDateTime) -> Option<f64> {
    let latest = series.latest_timestamp()?;
    Some((as_of - latest).num_milliseconds() as f64 / 3_600_000.0)
}

pub fn freshness(series: &Series, as_of: NaiveDateTime) -> f64 {
    match hours_since_latest(series, as_of) {
        Some(hours) => (100.0 - hours * 100.0).clamp(0.0, 100.0),
        None => 0.0,
    }
}

pub fn completeness(series: &Series) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let complete = series
        .bars
        .iter()
        .filter(|b| b.is_complete(&series.columns))
        .count();
    complete as f64 / series.len() as f64 * 100.0
}
