//! Health monitoring: per-symbol scores, a system score and staleness alerts.

use std::collections::BTreeMap;
use std::sync::Arc;

use barwatch_core::health::{hours_since_latest, mean_score};
use barwatch_core::{ConfigError, HealthFactors, HealthScorer, QualityConfig, Series};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alert::{dispatch, AlertEvent, AlertKind, AlertSink};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolHealth {
    /// Age of the latest bar; `None` when the series has no bars.
    pub minutes_old: Option<f64>,
    pub factors: HealthFactors,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringResult {
    pub timestamp: NaiveDateTime,
    pub system_health_score: f64,
    pub per_symbol: BTreeMap<String, SymbolHealth>,
}

pub struct Monitor {
    scorer: HealthScorer,
    stale_after_minutes: f64,
    sink: Arc<dyn AlertSink>,
}

impl Monitor {
    pub fn new(config: &QualityConfig, sink: Arc<dyn AlertSink>) -> Result<Self, ConfigError> {
        Ok(Self {
            scorer: HealthScorer::new(config)?,
            stale_after_minutes: config.thresholds.stale_after_minutes,
            sink,
        })
    }

    /// Score every series at `as_of`. Stale symbols raise an alert.
    pub fn monitor(
        &self,
        data: &BTreeMap<String, Series>,
        as_of: NaiveDateTime,
    ) -> MonitoringResult {
        let mut per_symbol = BTreeMap::new();

        for (symbol, series) in data {
            let minutes_old = hours_since_latest(series, as_of).map(|h| h * 60.0);
            let health = SymbolHealth {
                minutes_old,
                factors: self.scorer.factors(series, as_of),
                score: self.scorer.symbol_score(series, as_of),
            };

            if let Some(minutes) = minutes_old.filter(|m| *m > self.stale_after_minutes) {
                dispatch(
                    self.sink.as_ref(),
                    &AlertEvent::new(
                        as_of,
                        AlertKind::StaleData {
                            symbol: symbol.clone(),
                            minutes_old: minutes,
                            limit: self.stale_after_minutes,
                        },
                    ),
                );
            }

            per_symbol.insert(symbol.clone(), health);
        }

        let scores: Vec<f64> = per_symbol.values().map(|h| h.score).collect();
        let system_health_score = mean_score(&scores);
        info!(
            symbols = per_symbol.len(),
            system_health_score, "health check complete"
        );

        MonitoringResult {
            timestamp: as_of,
            system_health_score,
            per_symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::MemorySink;
    use barwatch_core::Bar;
    use chrono::{NaiveDate, TimeDelta};

    fn ts(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn flat(symbol: &str, last: NaiveDateTime, n: i64) -> Series {
        let bars = (0..n)
            .map(|i| {
                let t = last - TimeDelta::minutes(5 * (n - 1 - i));
                Bar::new(t, 100.0, 100.5, 99.5, 100.0, 1_000.0)
            })
            .collect();
        Series::new(symbol, bars)
    }

    #[test]
    fn fresh_symbols_score_full_and_raise_nothing() {
        let sink = Arc::new(MemorySink::new());
        let monitor = Monitor::new(&QualityConfig::default(), sink.clone()).unwrap();
        let data: BTreeMap<_, _> = [("SPY", flat("SPY", ts(15, 55), 10))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let result = monitor.monitor(&data, ts(15, 55));
        assert!((result.system_health_score - 100.0).abs() < 1e-9);
        assert_eq!(result.per_symbol["SPY"].minutes_old, Some(0.0));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn stale_symbol_raises_alert() {
        let sink = Arc::new(MemorySink::new());
        let monitor = Monitor::new(&QualityConfig::default(), sink.clone()).unwrap();
        let data: BTreeMap<_, _> = [
            ("SPY", flat("SPY", ts(15, 55), 10)),
            ("QQQ", flat("QQQ", ts(15, 30), 10)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let result = monitor.monitor(&data, ts(15, 55));
        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0].kind {
            AlertKind::StaleData {
                symbol,
                minutes_old,
                limit,
            } => {
                assert_eq!(symbol, "QQQ");
                assert!((minutes_old - 25.0).abs() < 1e-9);
                assert_eq!(*limit, 10.0);
            }
            other => panic!("unexpected alert: {other:?}"),
        }
        assert!(result.per_symbol["QQQ"].score < result.per_symbol["SPY"].score);
    }

    #[test]
    fn empty_batch_scores_zero() {
        let monitor =
            Monitor::new(&QualityConfig::default(), Arc::new(MemorySink::new())).unwrap();
        let result = monitor.monitor(&BTreeMap::new(), ts(16, 0));
        assert_eq!(result.system_health_score, 0.0);
        assert!(result.per_symbol.is_empty());
    }

    #[test]
    fn empty_series_scores_zero_without_alert() {
        let sink = Arc::new(MemorySink::new());
        let monitor = Monitor::new(&QualityConfig::default(), sink.clone()).unwrap();
        let mut data = BTreeMap::new();
        data.insert("DIA".to_string(), Series::new("DIA", vec![]));

        let result = monitor.monitor(&data, ts(16, 0));
        assert_eq!(result.per_symbol["DIA"].score, 0.0);
        assert_eq!(result.per_symbol["DIA"].minutes_old, None);
        assert!(sink.events().is_empty());
    }
}
