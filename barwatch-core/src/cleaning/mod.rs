//! Data cleaning: outlier detection, imputation, OHLC repair, session
//! filtering, and the pipeline that runs them in order.

pub mod impute;
pub mod outlier;
pub mod pipeline;
pub mod repair;
pub mod report;
pub mod session;

pub use pipeline::{CleaningOutcome, CleaningPipeline};
pub use report::{CleaningAction, CleaningReport};
pub use session::SessionFilter;
