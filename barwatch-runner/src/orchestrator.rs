//! Batch orchestration: clean, validate and monitor a set of symbols.
//!
//! Each symbol is an independent task that owns its series, run on a rayon
//! pool when one is configured. Nothing
//! is shared between tasks; per-symbol results are merged by key into
//! `BTreeMap`s after the join, so output order never depends on scheduling.
//! Alerts go out after the merge, in symbol order.

use std::collections::BTreeMap;
use std::sync::Arc;

use barwatch_core::validation::{CompletenessReport, ConsistencyReport};
use barwatch_core::{
    CleaningOutcome, CleaningPipeline, CleaningReport, CompletenessMetrics, CompletenessValidator,
    ConfigError, DataStage, PriceConsistencyValidator, QualityConfig, QualityError, Series,
    ThresholdBreach,
};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::alert::{dispatch, AlertEvent, AlertKind, AlertSink};
use crate::monitor::{Monitor, MonitoringResult};
use crate::source::{DataSource, SourceBatch};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("build worker pool: {0}")]
    ThreadPool(String),
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub as_of: NaiveDateTime,
    pub cleaned: BTreeMap<String, Series>,
    pub reports: BTreeMap<String, CleaningReport>,
    pub completeness: BTreeMap<String, CompletenessMetrics>,
    pub consistency: BTreeMap<String, ConsistencyReport>,
    pub breaches: Vec<ThresholdBreach>,
    /// Symbols that could not be fetched or cleaned, with the reason.
    pub failures: BTreeMap<String, String>,
    pub monitoring: MonitoringResult,
    /// BLAKE3 of the raw input, hex encoded.
    pub dataset_hash: String,
}

impl RunSummary {
    pub fn symbols_processed(&self) -> usize {
        self.cleaned.len()
    }
}

/// Result of one symbol's task.
struct SymbolOutcome {
    symbol: String,
    cleaning: Result<CleaningOutcome, QualityError>,
    /// The series validators and the monitor judged, per `validate_on`.
    judged: Option<Series>,
    completeness: Option<CompletenessReport>,
    consistency: Option<ConsistencyReport>,
}

pub struct Orchestrator {
    config: QualityConfig,
    pipeline: CleaningPipeline,
    completeness: CompletenessValidator,
    consistency: PriceConsistencyValidator,
    monitor: Monitor,
    sink: Arc<dyn AlertSink>,
    pool: Option<rayon::ThreadPool>,
}

impl Orchestrator {
    /// Every stage is built from the same config value and rejects it if
    /// it does not validate.
    pub fn new(config: QualityConfig, sink: Arc<dyn AlertSink>) -> Result<Self, RunError> {
        Ok(Self {
            pipeline: CleaningPipeline::new(&config)?,
            completeness: CompletenessValidator::new(&config)?,
            consistency: PriceConsistencyValidator::new(&config)?,
            monitor: Monitor::new(&config, Arc::clone(&sink))?,
            sink,
            config,
            pool: None,
        })
    }

    /// Run symbol tasks in parallel on a dedicated rayon pool of `threads`
    /// workers. Without this, or with `threads <= 1`, symbols run
    /// sequentially on the calling thread.
    pub fn with_threads(mut self, threads: usize) -> Result<Self, RunError> {
        self.pool = if threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| RunError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        Ok(self)
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Fetch `symbols` from `source` and run them.
    pub fn run_source(
        &self,
        source: &dyn DataSource,
        symbols: &[&str],
        as_of: NaiveDateTime,
    ) -> RunSummary {
        info!(source = source.name(), symbols = symbols.len(), "fetching");
        self.run(source.fetch(symbols), as_of)
    }

    pub fn run(&self, batch: SourceBatch, as_of: NaiveDateTime) -> RunSummary {
        let SourceBatch { series, failures } = batch;
        let dataset_hash = dataset_hash(&series);
        info!(
            symbols = series.len(),
            failed_fetches = failures.len(),
            %dataset_hash,
            "run started"
        );

        let outcomes: Vec<SymbolOutcome> = match &self.pool {
            Some(pool) => pool.install(|| {
                series
                    .into_par_iter()
                    .map(|(symbol, raw)| self.process(symbol, raw, as_of))
                    .collect()
            }),
            None => series
                .into_iter()
                .map(|(symbol, raw)| self.process(symbol, raw, as_of))
                .collect(),
        };

        let mut cleaned = BTreeMap::new();
        let mut reports = BTreeMap::new();
        let mut completeness = BTreeMap::new();
        let mut consistency = BTreeMap::new();
        let mut judged = BTreeMap::new();
        let mut breaches = Vec::new();
        let mut failed: BTreeMap<String, String> = failures
            .into_iter()
            .map(|(symbol, e)| (symbol, e.to_string()))
            .collect();

        for outcome in outcomes {
            let symbol = outcome.symbol;
            match outcome.cleaning {
                Ok(CleaningOutcome { series, report }) => {
                    cleaned.insert(symbol.clone(), series);
                    reports.insert(symbol.clone(), report);
                }
                Err(e) => {
                    warn!(%symbol, error = %e, "cleaning failed");
                    failed.insert(symbol.clone(), e.to_string());
                }
            }
            if let Some(report) = outcome.completeness {
                breaches.extend(report.breaches);
                completeness.insert(symbol.clone(), report.metrics);
            }
            if let Some(report) = outcome.consistency {
                breaches.extend(report.breaches.iter().cloned());
                consistency.insert(symbol.clone(), report);
            }
            if let Some(series) = outcome.judged {
                judged.insert(symbol, series);
            }
        }

        self.raise_alerts(&failed, &completeness, &breaches, as_of);
        let monitoring = self.monitor.monitor(&judged, as_of);

        info!(
            cleaned = cleaned.len(),
            failed = failed.len(),
            breaches = breaches.len(),
            system_health_score = monitoring.system_health_score,
            "run complete"
        );

        RunSummary {
            as_of,
            cleaned,
            reports,
            completeness,
            consistency,
            breaches,
            failures: failed,
            monitoring,
            dataset_hash,
        }
    }

    fn process(&self, symbol: String, raw: Series, as_of: NaiveDateTime) -> SymbolOutcome {
        let cleaning = self.pipeline.clean_at(&raw, as_of);
        let judged = match self.config.pipeline.validate_on {
            DataStage::Raw => Some(raw),
            DataStage::Cleaned => cleaning.as_ref().ok().map(|o| o.series.clone()),
        };
        let completeness = judged.as_ref().map(|s| self.completeness.validate(s));
        let consistency = judged.as_ref().map(|s| self.consistency.validate(s));
        SymbolOutcome {
            symbol,
            cleaning,
            judged,
            completeness,
            consistency,
        }
    }

    fn raise_alerts(
        &self,
        failures: &BTreeMap<String, String>,
        completeness: &BTreeMap<String, CompletenessMetrics>,
        breaches: &[ThresholdBreach],
        as_of: NaiveDateTime,
    ) {
        let sink = self.sink.as_ref();
        for (symbol, reason) in failures {
            let kind = AlertKind::SymbolFailed {
                symbol: symbol.clone(),
                reason: reason.clone(),
            };
            dispatch(sink, &AlertEvent::new(as_of, kind));
        }
        for breach in breaches {
            dispatch(
                sink,
                &AlertEvent::new(as_of, AlertKind::ThresholdExceeded(breach.clone())),
            );
        }
        for (symbol, metrics) in completeness {
            if metrics.gap_count == 0 {
                continue;
            }
            let kind = AlertKind::TimestampGaps {
                symbol: symbol.clone(),
                gap_count: metrics.gap_count,
                gap_pct: metrics.gap_pct().unwrap_or_default(),
            };
            dispatch(sink, &AlertEvent::new(as_of, kind));
        }
    }
}

/// BLAKE3 over every symbol's bars in key order. Missing values hash
/// differently from any number.
pub fn dataset_hash(data: &BTreeMap<String, Series>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (symbol, series) in data {
        hasher.update(symbol.as_bytes());
        for bar in &series.bars {
            hasher.update(bar.timestamp.to_string().as_bytes());
            for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                match value {
                    Some(v) => {
                        hasher.update(&[1]);
                        hasher.update(&v.to_le_bytes());
                    }
                    None => {
                        hasher.update(&[0]);
                    }
                }
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::MemorySink;
    use barwatch_core::{Bar, Field};
    use chrono::NaiveDate;

    fn ts(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn hourly(symbol: &str) -> Series {
        let bars = (10..16)
            .map(|h| Bar::new(ts(h, 0), 100.0, 101.0, 99.0, 100.5, 1_000.0))
            .collect();
        Series::new(symbol, bars)
    }

    fn batch(series: Vec<Series>) -> SourceBatch {
        SourceBatch {
            series: series.into_iter().map(|s| (s.symbol.clone(), s)).collect(),
            failures: BTreeMap::new(),
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = QualityConfig::default();
        config.thresholds.max_missing_pct = -1.0;
        let result = Orchestrator::new(config, Arc::new(MemorySink::new()));
        assert!(matches!(result, Err(RunError::Config(_))));
    }

    #[test]
    fn clean_batch_runs_without_alerts() {
        let sink = Arc::new(MemorySink::new());
        let orch = Orchestrator::new(QualityConfig::default(), sink.clone()).unwrap();
        let summary = orch.run(batch(vec![hourly("SPY"), hourly("QQQ")]), ts(15, 0));

        assert_eq!(summary.symbols_processed(), 2);
        assert!(summary.failures.is_empty());
        assert!(summary.breaches.is_empty());
        assert!(sink.events().is_empty());
        assert!((summary.monitoring.system_health_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn missing_column_fails_only_that_symbol() {
        let sink = Arc::new(MemorySink::new());
        let mut config = QualityConfig::default();
        config.pipeline.validate_on = DataStage::Cleaned;
        let orch = Orchestrator::new(config, sink.clone()).unwrap();

        let partial = Series::with_columns("IWM", Field::PRICES, hourly("IWM").bars);
        let summary = orch.run(batch(vec![hourly("SPY"), partial]), ts(15, 0));

        assert!(summary.cleaned.contains_key("SPY"));
        assert!(summary.failures["IWM"].contains("volume"));
        assert!(!summary.monitoring.per_symbol.contains_key("IWM"));
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(&e.kind, AlertKind::SymbolFailed { symbol, .. } if symbol == "IWM")));
    }

    #[test]
    fn threaded_run_matches_sequential() {
        let config = QualityConfig::default();
        let data = || batch(vec![hourly("SPY"), hourly("QQQ"), hourly("DIA")]);

        let seq = Orchestrator::new(config.clone(), Arc::new(MemorySink::new()))
            .unwrap()
            .run(data(), ts(15, 0));
        let par = Orchestrator::new(config, Arc::new(MemorySink::new()))
            .unwrap()
            .with_threads(3)
            .unwrap()
            .run(data(), ts(15, 0));

        assert_eq!(seq.cleaned, par.cleaned);
        assert_eq!(seq.completeness, par.completeness);
        assert_eq!(seq.dataset_hash, par.dataset_hash);
        assert_eq!(seq.monitoring, par.monitoring);
    }

    #[test]
    fn dataset_hash_tracks_content() {
        let mut a = BTreeMap::new();
        a.insert("SPY".to_string(), hourly("SPY"));
        let mut b = a.clone();
        assert_eq!(dataset_hash(&a), dataset_hash(&b));

        if let Some(s) = b.get_mut("SPY") {
            s.bars[0].close = None;
        }
        assert_ne!(dataset_hash(&a), dataset_hash(&b));
        assert_eq!(dataset_hash(&a).len(), 64);
    }
}
