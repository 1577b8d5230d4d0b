//! Price consistency: extreme close-to-close moves and thin volume.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::breach::ThresholdBreach;
use crate::config::{ConfigError, QualityConfig};
use crate::domain::Series;

/// Metric key for the largest absolute close-to-close move, in percent.
pub const MAX_ABS_RETURN_PCT: &str = "max_abs_return_pct";

/// Metric key for the smallest observed bar volume.
pub const MIN_BAR_VOLUME: &str = "min_bar_volume";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub symbol: String,
    /// Returns larger than the configured move limit.
    pub extreme_moves: usize,
    /// Bars with volume below the configured minimum.
    pub low_volume_bars: usize,
    pub breaches: Vec<ThresholdBreach>,
}

#[derive(Debug, Clone)]
pub struct PriceConsistencyValidator {
    max_price_change_pct: f64,
    min_volume: f64,
}

impl PriceConsistencyValidator {
    pub fn new(config: &QualityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            max_price_change_pct: config.thresholds.max_price_change_pct,
            min_volume: config.thresholds.min_volume,
        })
    }

    pub fn validate(&self, series: &Series) -> ConsistencyReport {
        let mut breaches = Vec::new();

        let moves: Vec<f64> = series
            .close_returns()
            .into_iter()
            .map(|r| r.abs() * 100.0)
            .collect();
        let extreme_moves = moves
            .iter()
            .filter(|m| **m > self.max_price_change_pct)
            .count();
        if extreme_moves > 0 {
            let largest = moves.iter().copied().fold(0.0, f64::max);
            warn!(
                symbol = %series.symbol,
                extreme_moves,
                largest_pct = largest,
                "extreme price moves"
            );
            breaches.push(ThresholdBreach {
                symbol: series.symbol.clone(),
                metric: MAX_ABS_RETURN_PCT.into(),
                value: largest,
                limit: self.max_price_change_pct,
            });
        }

        let thin: Vec<f64> = series
            .bars
            .iter()
            .filter_map(|b| b.volume)
            .filter(|v| *v < self.min_volume)
            .collect();
        if !thin.is_empty() {
            let smallest = thin.iter().copied().fold(f64::INFINITY, f64::min);
            warn!(
                symbol = %series.symbol,
                bars = thin.len(),
                min_volume = self.min_volume,
                "bars below minimum volume"
            );
            breaches.push(ThresholdBreach {
                symbol: series.symbol.clone(),
                metric: MIN_BAR_VOLUME.into(),
                value: smallest,
                limit: self.min_volume,
            });
        }

        ConsistencyReport {
            symbol: series.symbol.clone(),
            extreme_moves,
            low_volume_bars: thin.len(),
            breaches,
        }
    }
}
