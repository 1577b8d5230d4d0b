//! Trading-session filter.

use crate::config::SessionWindow;
use crate::domain::Series;

/// Drops bars whose time of day falls outside an inclusive session window.
#[derive(Debug, Clone, Copy)]
pub struct SessionFilter {
    window: SessionWindow,
}

impl SessionFilter {
    pub fn new(window: SessionWindow) -> Self {
        Self { window }
    }

    /// Filter in place, returning the number of bars removed.
    pub fn apply(&self, series: &mut Series) -> usize {
        let window = self.window;
        series.retain(|bar| window.contains(bar.timestamp.time()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::{NaiveDate, NaiveTime};

    fn at(h: u32, m: u32) -> Bar {
        let ts = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        Bar::new(ts, 1.0, 1.0, 1.0, 1.0, 1.0)
    }

    #[test]
    fn keeps_bars_on_session_bounds() {
        let mut series = Series::new(
            "T",
            vec![at(9, 0), at(9, 30), at(12, 0), at(16, 0), at(16, 30)],
        );
        let removed = SessionFilter::new(SessionWindow::us_equities()).apply(&mut series);
        assert_eq!(removed, 2);
        let kept: Vec<_> = series.bars.iter().map(|b| b.timestamp.time()).collect();
        assert_eq!(
            kept,
            vec![
                NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn custom_window() {
        let window = SessionWindow::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        );
        let mut series = Series::new("T", vec![at(3, 0), at(9, 30)]);
        assert_eq!(SessionFilter::new(window).apply(&mut series), 1);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn empty_series_removes_nothing() {
        let mut series = Series::new("T", vec![]);
        assert_eq!(
            SessionFilter::new(SessionWindow::us_equities()).apply(&mut series),
            0
        );
    }
}
