//! Validation of (raw or cleaned) series against configured limits.

pub mod breach;
pub mod completeness;
pub mod consistency;

pub use breach::ThresholdBreach;
pub use completeness::{CompletenessMetrics, CompletenessReport, CompletenessValidator};
pub use consistency::{ConsistencyReport, PriceConsistencyValidator};
