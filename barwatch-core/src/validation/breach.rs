use serde::{Deserialize, Serialize};
use std::fmt;

/// A quality signal that crossed its configured limit.
///
/// Breaches are reported and alerted on; they never stop processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBreach {
    pub symbol: String,
    pub metric: String,
    pub value: f64,
    pub limit: f64,
}

impl fmt::Display for ThresholdBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} = {:.2} (limit {:.2})",
            self.symbol, self.metric, self.value, self.limit
        )
    }
}
