//! Completeness validation: missing values per column and timestamp gaps.
//!
//! Metrics are percentages keyed by name:
//! - `<column>_missing_pct` = null count / rows * 100, for every carried column
//! - `timestamp_gaps_pct` = gaps / rows * 100, only for series of 2+ rows
//!
//! A gap is a consecutive timestamp difference larger than twice the
//! expected bar interval. An empty series reports 0.0 missing per column.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::breach::ThresholdBreach;
use crate::config::{ConfigError, QualityConfig};
use crate::domain::{Field, Series};

/// Metric key for timestamp gaps.
pub const TIMESTAMP_GAPS_PCT: &str = "timestamp_gaps_pct";

/// Metric key for a column's missing share.
pub fn missing_pct_key(field: Field) -> String {
    format!("{}_missing_pct", field.name())
}

/// Per-symbol completeness metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessMetrics {
    pub symbol: String,
    pub metrics: BTreeMap<String, f64>,
    pub gap_count: usize,
}

impl CompletenessMetrics {
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }

    pub fn missing_pct(&self, field: Field) -> Option<f64> {
        self.get(&missing_pct_key(field))
    }

    pub fn gap_pct(&self) -> Option<f64> {
        self.get(TIMESTAMP_GAPS_PCT)
    }
}

/// Metrics plus the limits they crossed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletenessReport {
    pub metrics: CompletenessMetrics,
    pub breaches: Vec<ThresholdBreach>,
}

#[derive(Debug, Clone)]
pub struct CompletenessValidator {
    max_missing_pct: f64,
    expected_interval: TimeDelta,
}

impl CompletenessValidator {
    pub fn new(config: &QualityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            max_missing_pct: config.thresholds.max_missing_pct,
            expected_interval: config.schedule.expected_interval(),
        })
    }

    pub fn validate(&self, series: &Series) -> CompletenessReport {
        let total = series.len();
        let mut metrics = BTreeMap::new();
        let mut breaches = Vec::new();

        for field in Field::ALL {
            if !series.has_column(field) {
                continue;
            }
            let missing_pct = if total == 0 {
                0.0
            } else {
                series.null_count(field) as f64 / total as f64 * 100.0
            };
            metrics.insert(missing_pct_key(field), missing_pct);

            if missing_pct > self.max_missing_pct {
                warn!(
                    symbol = %series.symbol,
                    %field,
                    missing_pct,
                    threshold = self.max_missing_pct,
                    "missing values above threshold"
                );
                breaches.push(ThresholdBreach {
                    symbol: series.symbol.clone(),
                    metric: missing_pct_key(field),
                    value: missing_pct,
                    limit: self.max_missing_pct,
                });
            }
        }

        let mut gap_count = 0;
        if total > 1 {
            let tolerance = self.expected_interval * 2;
            gap_count = series
                .bars
                .windows(2)
                .filter(|w| w[1].timestamp - w[0].timestamp > tolerance)
                .count();
            metrics.insert(
                TIMESTAMP_GAPS_PCT.to_string(),
                gap_count as f64 / total as f64 * 100.0,
            );
            if gap_count > 0 {
                warn!(symbol = %series.symbol, gap_count, "timestamp gaps found");
            }
        }

        CompletenessReport {
            metrics: CompletenessMetrics {
                symbol: series.symbol.clone(),
                metrics,
                gap_count,
            },
            breaches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::{NaiveDate, NaiveDateTime};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn hourly(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                Bar::new(
                    start() + TimeDelta::hours(i as i64),
                    1.0,
                    2.0,
                    0.5,
                    1.5,
                    100.0,
                )
            })
            .collect()
    }

    #[test]
    fn missing_close_above_threshold_is_a_breach() {
        let mut bars = hourly(100);
        for bar in bars.iter_mut().take(6) {
            bar.close = None;
        }
        let report = CompletenessValidator::new(&QualityConfig::default())
            .unwrap()
            .validate(&Series::new("AAPL", bars));

        assert_eq!(report.metrics.missing_pct(Field::Close), Some(6.0));
        assert_eq!(report.metrics.missing_pct(Field::Open), Some(0.0));
        assert_eq!(report.breaches.len(), 1);
        assert_eq!(report.breaches[0].metric, "close_missing_pct");
        assert_eq!(report.breaches[0].value, 6.0);
        assert_eq!(report.breaches[0].limit, 5.0);
    }

    #[test]
    fn missing_at_threshold_is_not_a_breach() {
        let mut bars = hourly(100);
        for bar in bars.iter_mut().take(5) {
            bar.volume = None;
        }
        let report = CompletenessValidator::new(&QualityConfig::default())
            .unwrap()
            .validate(&Series::new("AAPL", bars));
        assert_eq!(report.metrics.missing_pct(Field::Volume), Some(5.0));
        assert!(report.breaches.is_empty());
    }

    #[test]
    fn three_hour_jump_is_one_gap() {
        let mut bars = hourly(10);
        for bar in bars.iter_mut().skip(5) {
            bar.timestamp += TimeDelta::hours(2);
        }
        let report = CompletenessValidator::new(&QualityConfig::default())
            .unwrap()
            .validate(&Series::new("AAPL", bars));
        assert_eq!(report.metrics.gap_count, 1);
        assert_eq!(report.metrics.gap_pct(), Some(10.0));
    }

    #[test]
    fn two_interval_step_is_not_a_gap() {
        let mut bars = hourly(4);
        for bar in bars.iter_mut().skip(2) {
            bar.timestamp += TimeDelta::hours(1);
        }
        let report = CompletenessValidator::new(&QualityConfig::default())
            .unwrap()
            .validate(&Series::new("AAPL", bars));
        assert_eq!(report.metrics.gap_count, 0);
        assert_eq!(report.metrics.gap_pct(), Some(0.0));
    }

    #[test]
    fn degenerate_series_degrade_to_neutral_values() {
        let validator = CompletenessValidator::new(&QualityConfig::default()).unwrap();

        let empty = validator.validate(&Series::new("E", vec![]));
        assert_eq!(empty.metrics.missing_pct(Field::Close), Some(0.0));
        assert_eq!(empty.metrics.gap_pct(), None);
        assert!(empty.breaches.is_empty());

        let single = validator.validate(&Series::new("S", hourly(1)));
        assert_eq!(single.metrics.gap_pct(), None);
        assert_eq!(single.metrics.gap_count, 0);
    }

    #[test]
    fn absent_columns_are_not_reported() {
        let series = Series::with_columns("AAPL", Field::PRICES, hourly(3));
        let report = CompletenessValidator::new(&QualityConfig::default())
            .unwrap()
            .validate(&series);
        assert_eq!(report.metrics.missing_pct(Field::Volume), None);
        assert_eq!(report.metrics.metrics.len(), 5);
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let mut config = QualityConfig::default();
        config.thresholds.max_missing_pct = f64::NAN;
        assert!(matches!(
            CompletenessValidator::new(&config),
            Err(ConfigError::Invalid {
                field: "thresholds.max_missing_pct",
                ..
            })
        ));
    }
}
