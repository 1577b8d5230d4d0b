//! End-to-end checks of the cleaning, validation and scoring stages on
//! small hand-built series.

use barwatch_core::cleaning::outlier::{combine, detect_iqr, detect_zscore};
use barwatch_core::validation::completeness::CompletenessValidator;
use barwatch_core::{
    Bar, CleaningAction, CleaningPipeline, Field, HealthScorer, QualityConfig, Series,
};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

fn open_bell() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, 4)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn steady_bars(n: usize, step: TimeDelta) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let close = 50.0 + (i as f64 * 0.9).cos() * 0.5;
            Bar::new(
                open_bell() + step * i as i32,
                close - 0.1,
                close + 0.3,
                close - 0.4,
                close,
                5_000.0,
            )
        })
        .collect()
}

#[test]
fn clean_series_only_loses_out_of_session_rows() {
    // 30-minute bars from 09:30 run past the 16:00 close.
    let raw = Series::new("IBM", steady_bars(16, TimeDelta::minutes(30)));
    let outcome = CleaningPipeline::new(&QualityConfig::default())
        .unwrap()
        .clean_at(&raw, open_bell())
        .unwrap();

    assert_eq!(
        outcome.report.actions(),
        &[CleaningAction::RemovedOutsideSession { count: 2 }]
    );
    assert_eq!(outcome.series.bars[..], raw.bars[..14]);
    assert_eq!(
        outcome.report.descriptions(),
        vec!["Removed 2 records outside market hours".to_string()]
    );
}

#[test]
fn spike_series_masks_agree_on_the_spike() {
    let values: Vec<Option<f64>> = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0]
        .into_iter()
        .map(Some)
        .collect();
    let iqr = detect_iqr(&values, 1.5);
    let z = detect_zscore(&values, 2.0);
    assert_eq!(combine(&iqr, &z), vec![false, false, false, false, false, true]);
}

#[test]
fn completeness_then_health_on_gappy_data() {
    let mut bars = steady_bars(10, TimeDelta::hours(1));
    bars[4].close = None;
    for bar in bars.iter_mut().skip(7) {
        bar.timestamp += TimeDelta::hours(2);
    }
    let series = Series::new("IBM", bars);
    let config = QualityConfig::default();

    let report = CompletenessValidator::new(&config).unwrap().validate(&series);
    assert_eq!(report.metrics.missing_pct(Field::Close), Some(10.0));
    assert_eq!(report.metrics.gap_count, 1);
    assert_eq!(report.breaches.len(), 1);

    let as_of = series.latest_timestamp().unwrap();
    let factors = HealthScorer::new(&config).unwrap().factors(&series, as_of);
    assert_eq!(factors.freshness, 100.0);
    assert_eq!(factors.completeness, 90.0);
    assert_eq!(factors.consistency, 100.0);
}

#[test]
fn fresh_complete_batch_scores_hundred() {
    let a = Series::new("A", steady_bars(12, TimeDelta::minutes(5)));
    let b = Series::new("B", steady_bars(12, TimeDelta::minutes(5)));
    let as_of = a.latest_timestamp().unwrap();
    let score = HealthScorer::new(&QualityConfig::default())
        .unwrap()
        .system_score([&a, &b], as_of);
    assert!((score - 100.0).abs() < 1e-9, "score = {score}");
}
