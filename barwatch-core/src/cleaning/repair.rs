//! Intra-bar invariant repair.
//!
//! For every bar with all four prices present:
//! - `high` is raised to `max(open, close)` when below it
//! - `low` is lowered to `min(open, close)` when above it
//!
//! Bars with a missing price are skipped, so imputation must run first.

use crate::domain::{Field, Series};

/// Repair OHLC ordering in place. Returns the number of fields changed.
pub fn repair_ohlc(series: &mut Series) -> usize {
    let mut fixes = 0;

    for bar in &mut series.bars {
        if !bar.has_all_prices() {
            continue;
        }
        let (Some(open), Some(high), Some(low), Some(close)) =
            (bar.open, bar.high, bar.low, bar.close)
        else {
            continue;
        };

        let max_oc = open.max(close);
        let min_oc = open.min(close);

        if high < max_oc {
            bar.high = Some(max_oc);
            fixes += 1;
        }
        if low > min_oc {
            bar.low = Some(min_oc);
            fixes += 1;
        }
    }

    fixes
}

/// Blank negative prices so imputation can replace them. Returns the count
/// per price column that had any.
pub fn clear_negative_prices(series: &mut Series) -> Vec<(Field, usize)> {
    let mut cleared = Vec::new();
    for field in Field::PRICES {
        if !series.has_column(field) {
            continue;
        }
        let mut count = 0;
        for bar in &mut series.bars {
            if bar.get(field).is_some_and(|v| v < 0.0) {
                bar.set(field, None);
                count += 1;
            }
        }
        if count > 0 {
            cleared.push((field, count));
        }
    }
    cleared
}
