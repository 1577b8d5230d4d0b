//! barwatch core — cleaning, validation and health scoring for OHLCV bars.
//!
//! This crate contains the data-quality engine:
//! - Domain types (bars, per-symbol series)
//! - Immutable quality configuration
//! - Cleaning pipeline: outlier detection, imputation, OHLC repair, session filter
//! - Completeness and price-consistency validation
//! - Health scoring (freshness, completeness, consistency)
//!
//! Everything here is synchronous and free of I/O. Data acquisition, alert
//! delivery and orchestration live in `barwatch-runner`.

pub mod cleaning;
pub mod config;
pub mod domain;
pub mod error;
pub mod health;
pub mod validation;

pub use cleaning::{CleaningAction, CleaningOutcome, CleaningPipeline, CleaningReport};
pub use config::{ConfigError, DataStage, OutlierMethod, QualityConfig, SessionWindow};
pub use domain::{Bar, Field, Series};
pub use error::{QualityError, StageSkip};
pub use health::{HealthFactors, HealthScorer};
pub use validation::{
    CompletenessMetrics, CompletenessValidator, PriceConsistencyValidator, ThresholdBreach,
};
