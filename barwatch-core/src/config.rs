//! Quality configuration.
//!
//! One immutable value, loaded once at startup and handed to every stage.
//! Threshold keys carry no serde defaults: a TOML file that omits one fails
//! to parse instead of silently running with a stand-in value.

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::Field;

/// Errors from loading or validating a [`QualityConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level quality configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityConfig {
    pub thresholds: Thresholds,
    pub outliers: OutlierConfig,
    /// Trading session; `None` disables session filtering.
    #[serde(default)]
    pub session: Option<SessionWindow>,
    pub schedule: ScheduleConfig,
    pub pipeline: PipelineConfig,
}

/// Limits that turn quality signals into breaches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    /// Maximum share of missing values per column, in percent.
    pub max_missing_pct: f64,
    /// Close-to-close move, in percent, above which a return is extreme.
    pub max_price_change_pct: f64,
    /// Bars trading less than this are flagged.
    pub min_volume: f64,
    /// Age of the latest bar, in minutes, above which a symbol is stale.
    pub stale_after_minutes: f64,
}

/// Which statistical tests must agree before a point is replaced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// IQR and z-score must both flag the point.
    Combined,
    /// IQR alone decides.
    IqrOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutlierConfig {
    pub method: OutlierMethod,
    pub iqr_multiplier: f64,
    pub zscore_threshold: f64,
    /// Columns need strictly more non-null points than this to be tested.
    pub min_samples: usize,
}

/// Inclusive time-of-day window bars must fall in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Regular US equity hours, 09:30-16:00.
    pub fn us_equities() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    /// Nominal spacing between consecutive bars.
    pub expected_interval_minutes: u32,
}

impl ScheduleConfig {
    pub fn expected_interval(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.expected_interval_minutes))
    }
}

/// Which version of the data the validators and health monitor look at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataStage {
    Raw,
    Cleaned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    pub validate_on: DataStage,
    /// Columns a series must carry to be cleaned at all.
    pub required_columns: Vec<Field>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds {
                max_missing_pct: 5.0,
                max_price_change_pct: 10.0,
                min_volume: 0.0,
                stale_after_minutes: 10.0,
            },
            outliers: OutlierConfig {
                method: OutlierMethod::Combined,
                iqr_multiplier: 1.5,
                zscore_threshold: 3.0,
                min_samples: 10,
            },
            session: Some(SessionWindow::us_equities()),
            schedule: ScheduleConfig {
                expected_interval_minutes: 60,
            },
            pipeline: PipelineConfig {
                validate_on: DataStage::Raw,
                required_columns: Field::ALL.to_vec(),
            },
        }
    }
}

impl QualityConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        check_range("thresholds.max_missing_pct", t.max_missing_pct, 0.0, 100.0)?;
        check_positive("thresholds.max_price_change_pct", t.max_price_change_pct)?;
        check_range("thresholds.min_volume", t.min_volume, 0.0, f64::MAX)?;
        check_positive("thresholds.stale_after_minutes", t.stale_after_minutes)?;

        check_positive("outliers.iqr_multiplier", self.outliers.iqr_multiplier)?;
        check_positive("outliers.zscore_threshold", self.outliers.zscore_threshold)?;

        if let Some(session) = &self.session {
            if session.start >= session.end {
                return Err(ConfigError::Invalid {
                    field: "session",
                    reason: format!(
                        "start {} must be before end {}",
                        session.start, session.end
                    ),
                });
            }
        }

        if self.schedule.expected_interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                field: "schedule.expected_interval_minutes",
                reason: "must be at least 1".into(),
            });
        }

        if self.pipeline.required_columns.is_empty() {
            return Err(ConfigError::Invalid {
                field: "pipeline.required_columns",
                reason: "at least one column is required".into(),
            });
        }

        Ok(())
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive finite number, got {value}"),
        });
    }
    Ok(())
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("must be within [{min}, {max}], got {value}"),
        });
    }
    Ok(())
}

/// `"HH:MM"` (or `"HH:MM:SS"`) time-of-day strings.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|e| de::Error::custom(format!("invalid time of day '{raw}': {e}")))
    }
}
