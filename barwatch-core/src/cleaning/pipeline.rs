//! Per-symbol cleaning pipeline.
//!
//! Fixed stage order:
//! 1. clear negative prices, then fill missing OHLCV values
//! 2. detect outliers in each price column with enough samples
//! 3. replace flagged points by interpolation
//! 4. repair OHLC ordering
//! 5. drop bars outside the session window
//!
//! A stage that cannot act is skipped and logged, never recorded as an
//! action. A missing required column fails the symbol, not the batch.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::impute::{fill_missing, replace_outliers_in};
use super::outlier;
use super::repair::{clear_negative_prices, repair_ohlc};
use super::report::{CleaningAction, CleaningReport};
use super::session::SessionFilter;
use crate::config::{ConfigError, OutlierConfig, QualityConfig};
use crate::domain::{Field, Series};
use crate::error::{QualityError, StageSkip};

/// Cleaned series plus the report describing how it was produced.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub series: Series,
    pub report: CleaningReport,
}

/// Runs the cleaning stages for one symbol at a time.
#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    outliers: OutlierConfig,
    required: Vec<Field>,
    session: Option<SessionFilter>,
}

impl CleaningPipeline {
    /// Fails when `config` does not pass [`QualityConfig::validate`].
    pub fn new(config: &QualityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            outliers: config.outliers.clone(),
            required: config.pipeline.required_columns.clone(),
            session: config.session.map(SessionFilter::new),
        })
    }

    /// Clean a series, stamping the report with the current local time.
    pub fn clean(&self, raw: &Series) -> Result<CleaningOutcome, QualityError> {
        self.clean_at(raw, chrono::Local::now().naive_local())
    }

    /// Clean a series. The input is left untouched.
    pub fn clean_at(
        &self,
        raw: &Series,
        at: NaiveDateTime,
    ) -> Result<CleaningOutcome, QualityError> {
        if let Some(&column) = self.required.iter().find(|f| !raw.has_column(**f)) {
            return Err(QualityError::MissingColumn {
                symbol: raw.symbol.clone(),
                column,
            });
        }

        let mut series = raw.clone();
        let mut actions = Vec::new();

        // 1. missing values
        for (field, count) in clear_negative_prices(&mut series) {
            actions.push(CleaningAction::NegativePricesCleared { field, count });
        }
        actions.extend(fill_missing(&mut series));

        // 2-3. outliers
        for field in Field::PRICES {
            match outlier_mask(&series, field, &self.outliers) {
                Ok(mask) => {
                    let count = replace_outliers_in(&mut series, field, &mask);
                    if count > 0 {
                        debug!(symbol = %series.symbol, %field, count, "replaced outliers");
                        actions.push(CleaningAction::ReplacedOutliers { field, count });
                    }
                }
                Err(skip) => debug!(symbol = %series.symbol, ?skip, "outlier stage skipped"),
            }
        }

        // 4. OHLC ordering
        let fixes = repair_ohlc(&mut series);
        if fixes > 0 {
            actions.push(CleaningAction::FixedOhlc { count: fixes });
        }

        // 5. session window
        if let Some(filter) = &self.session {
            let removed = filter.apply(&mut series);
            if removed > 0 {
                actions.push(CleaningAction::RemovedOutsideSession { count: removed });
            }
        }

        info!(
            symbol = %series.symbol,
            actions = actions.len(),
            original_rows = raw.len(),
            cleaned_rows = series.len(),
            "cleaned series"
        );

        let report = CleaningReport::new(
            series.symbol.clone(),
            actions,
            raw.len(),
            series.len(),
            at,
        );
        Ok(CleaningOutcome { series, report })
    }
}

/// Outlier mask for one column, or the reason the test was not run.
pub fn outlier_mask(
    series: &Series,
    field: Field,
    config: &OutlierConfig,
) -> Result<Vec<bool>, StageSkip> {
    let values = series.column(field).ok_or(StageSkip::ColumnAbsent(field))?;
    let available = values.iter().flatten().count();
    if available <= config.min_samples {
        return Err(StageSkip::InsufficientData {
            field,
            available,
            required: config.min_samples + 1,
        });
    }
    Ok(outlier::detect(&values, config))
}
