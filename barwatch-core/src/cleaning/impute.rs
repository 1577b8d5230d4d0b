//! Missing-value imputation.
//!
//! Prices are carried forward from the last known value, then leading gaps
//! are back-filled from the first known value. Volume gaps take the column
//! median. Flagged outliers are blanked and linearly interpolated by
//! position between their nearest known neighbours.

use super::report::CleaningAction;
use crate::domain::{Field, Series};

/// Forward-fill, then back-fill any leading nulls.
///
/// An all-null column stays all-null. Returns the number of values filled.
pub fn fill_forward_backward(values: &mut [Option<f64>]) -> usize {
    let mut filled = 0;

    let mut last = None;
    for slot in values.iter_mut() {
        match slot {
            Some(v) => last = Some(*v),
            None => {
                if last.is_some() {
                    *slot = last;
                    filled += 1;
                }
            }
        }
    }

    if let Some(first) = values.iter().flatten().next().copied() {
        for slot in values.iter_mut().take_while(|v| v.is_none()) {
            *slot = Some(first);
            filled += 1;
        }
    }

    filled
}

/// Median of the non-null values (mean of the middle pair for even counts).
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Replace nulls with the column median. Returns the number of values filled.
pub fn fill_median(values: &mut [Option<f64>]) -> usize {
    let Some(median) = median(values) else {
        return 0;
    };
    let mut filled = 0;
    for slot in values.iter_mut().filter(|v| v.is_none()) {
        *slot = Some(median);
        filled += 1;
    }
    filled
}

/// Linearly interpolate interior nulls by position.
///
/// Nulls before the first or after the last known value have no neighbour
/// on one side and are left as they are.
pub fn interpolate_linear(values: &mut [Option<f64>]) {
    let mut prev: Option<(usize, f64)> = None;
    let mut i = 0;
    while i < values.len() {
        if let Some(v) = values[i] {
            if let Some((pi, pv)) = prev {
                let span = (i - pi) as f64;
                for (offset, slot) in values[pi + 1..i].iter_mut().enumerate() {
                    let t = (offset + 1) as f64 / span;
                    *slot = Some(pv + (v - pv) * t);
                }
            }
            prev = Some((i, v));
        }
        i += 1;
    }
}

/// Blank every flagged position, then interpolate.
///
/// Returns the number of positions blanked.
pub fn replace_outliers(values: &mut [Option<f64>], mask: &[bool]) -> usize {
    let mut replaced = 0;
    for (slot, flagged) in values.iter_mut().zip(mask) {
        if *flagged && slot.is_some() {
            *slot = None;
            replaced += 1;
        }
    }
    if replaced > 0 {
        interpolate_linear(values);
    }
    replaced
}

/// Fill gaps in every carried OHLCV column of a series.
///
/// Returns one action per column that had values filled.
pub fn fill_missing(series: &mut Series) -> Vec<CleaningAction> {
    let mut actions = Vec::new();

    for field in Field::PRICES {
        let Some(mut values) = series.column(field) else {
            continue;
        };
        let count = fill_forward_backward(&mut values);
        if count > 0 {
            series.set_column(field, &values);
            actions.push(CleaningAction::FilledMissing { field, count });
        }
    }

    if let Some(mut volume) = series.column(Field::Volume) {
        let count = fill_median(&mut volume);
        if count > 0 {
            series.set_column(Field::Volume, &volume);
            actions.push(CleaningAction::FilledVolumeMedian { count });
        }
    }

    actions
}

/// Replace the flagged values of one column by interpolation.
pub fn replace_outliers_in(series: &mut Series, field: Field, mask: &[bool]) -> usize {
    let Some(mut values) = series.column(field) else {
        return 0;
    };
    let replaced = replace_outliers(&mut values, mask);
    if replaced > 0 {
        series.set_column(field, &values);
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn series_with_gaps() -> Series {
        let day = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        let closes = [Some(10.0), None, None, Some(13.0)];
        let volumes = [Some(100.0), None, Some(300.0), Some(200.0)];
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (close, volume))| Bar {
                timestamp: day.and_hms_opt(10 + i as u32, 0, 0).unwrap(),
                open: Some(10.0),
                high: Some(14.0),
                low: Some(9.0),
                close: *close,
                volume,
            })
            .collect();
        Series::new("GAP", bars)
    }

    #[test]
    fn fill_missing_reports_per_column() {
        let mut series = series_with_gaps();
        let actions = fill_missing(&mut series);
        assert_eq!(
            actions,
            vec![
                CleaningAction::FilledMissing {
                    field: Field::Close,
                    count: 2
                },
                CleaningAction::FilledVolumeMedian { count: 1 },
            ]
        );
        assert_eq!(
            series.column(Field::Close).unwrap(),
            vec![Some(10.0), Some(10.0), Some(10.0), Some(13.0)]
        );
        assert_eq!(series.bars[1].volume, Some(200.0));
    }

    #[test]
    fn fill_missing_on_complete_series_is_silent() {
        let mut series = series_with_gaps();
        fill_missing(&mut series);
        assert!(fill_missing(&mut series).is_empty());
    }

    #[test]
    fn forward_fill_propagates() {
        let mut values = vec![Some(10.0), None, None, Some(13.0)];
        assert_eq!(fill_forward_backward(&mut values), 2);
        assert_eq!(values, vec![Some(10.0), Some(10.0), Some(10.0), Some(13.0)]);
    }

    #[test]
    fn backward_fill_covers_leading_nulls() {
        let mut values = vec![None, None, Some(5.0), None];
        assert_eq!(fill_forward_backward(&mut values), 3);
        assert_eq!(values, vec![Some(5.0), Some(5.0), Some(5.0), Some(5.0)]);
    }

    #[test]
    fn all_null_column_stays_null() {
        let mut values = vec![None, None, None];
        assert_eq!(fill_forward_backward(&mut values), 0);
        assert_eq!(fill_median(&mut values), 0);
        assert!(values.iter().all(|v| v.is_none()));
    }

    #[test]
    fn volume_takes_median() {
        let mut values = vec![Some(100.0), None, Some(300.0)];
        assert_eq!(fill_median(&mut values), 1);
        assert_eq!(values, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }

    #[test]
    fn median_of_odd_count() {
        assert_eq!(median(&[Some(3.0), Some(1.0), None, Some(2.0)]), Some(2.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn outlier_is_interpolated_between_neighbours() {
        let mut values = vec![Some(1.0), Some(2.0), Some(50.0), Some(4.0)];
        let replaced = replace_outliers(&mut values, &[false, false, true, false]);
        assert_eq!(replaced, 1);
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn consecutive_outliers_interpolate_evenly() {
        let mut values = vec![Some(0.0), Some(90.0), Some(90.0), Some(3.0)];
        replace_outliers(&mut values, &[false, true, true, false]);
        assert_eq!(values, vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn edge_outliers_stay_missing() {
        let mut values = vec![Some(99.0), Some(2.0), Some(3.0), Some(99.0)];
        replace_outliers(&mut values, &[true, false, false, true]);
        assert_eq!(values, vec![None, Some(2.0), Some(3.0), None]);
    }

    #[test]
    fn empty_mask_changes_nothing() {
        let mut values = vec![Some(1.0), None, Some(3.0)];
        assert_eq!(replace_outliers(&mut values, &[false, false, false]), 0);
        assert_eq!(values, vec![Some(1.0), None, Some(3.0)]);
    }
}
