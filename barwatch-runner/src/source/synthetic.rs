//! Synthetic intraday bars for demos and development.
//!
//! Produces a random walk per symbol, seeded from a BLAKE3 hash of the
//! symbol and a run seed so every run is reproducible. Bars span 09:00 to
//! 16:30, wider than regular hours, and with defects enabled the feed
//! carries the faults the cleaning pipeline exists to repair: missing
//! values, price spikes, inverted highs/lows and skipped intervals.

use barwatch_core::{Bar, Series};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{DataSource, SourceError};

/// Per-bar probabilities of each injected fault.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefectRates {
    pub missing_price: f64,
    pub missing_volume: f64,
    pub spike: f64,
    pub inverted: f64,
    pub skipped: f64,
}

impl DefectRates {
    pub fn none() -> Self {
        Self {
            missing_price: 0.0,
            missing_volume: 0.0,
            spike: 0.0,
            inverted: 0.0,
            skipped: 0.0,
        }
    }
}

impl Default for DefectRates {
    fn default() -> Self {
        Self {
            missing_price: 0.02,
            missing_volume: 0.02,
            spike: 0.01,
            inverted: 0.03,
            skipped: 0.01,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    first_day: NaiveDate,
    days: u32,
    interval_minutes: u32,
    seed: u64,
    defects: DefectRates,
}

impl SyntheticSource {
    pub fn new(first_day: NaiveDate, days: u32, interval_minutes: u32, seed: u64) -> Self {
        Self {
            first_day,
            days: days.max(1),
            interval_minutes: interval_minutes.max(1),
            seed,
            defects: DefectRates::default(),
        }
    }

    pub fn with_defects(mut self, defects: DefectRates) -> Self {
        self.defects = defects;
        self
    }

    /// Timestamp of the last bar the generator can produce.
    pub fn last_timestamp(&self) -> NaiveDateTime {
        let last_day = self.first_day + TimeDelta::days(i64::from(self.days - 1));
        last_day.and_time(feed_close())
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(&self.seed.to_le_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    pub fn generate(&self, symbol: &str) -> Series {
        let mut rng = self.rng_for(symbol);
        let step = TimeDelta::minutes(i64::from(self.interval_minutes));
        let d = self.defects;

        let mut bars = Vec::new();
        let mut price = rng.gen_range(20.0..400.0_f64);

        for day in 0..self.days {
            let date = self.first_day + TimeDelta::days(i64::from(day));
            let mut ts = date.and_time(feed_open());
            let end = date.and_time(feed_close());

            while ts <= end {
                let open = price;
                let close = (price * (1.0 + rng.gen_range(-0.004..0.004))).max(0.01);
                let mut high = open.max(close) * (1.0 + rng.gen_range(0.0..0.002));
                let mut low = open.min(close) * (1.0 - rng.gen_range(0.0..0.002));
                let volume = rng.gen_range(1_000.0..50_000.0_f64).round();
                price = close;

                if rng.gen_bool(d.skipped) {
                    ts += step;
                    continue;
                }

                let mut bar = Bar::new(ts, open, high, low, close, volume);

                if rng.gen_bool(d.inverted) {
                    std::mem::swap(&mut high, &mut low);
                    bar.high = Some(high);
                    bar.low = Some(low);
                }
                if rng.gen_bool(d.spike) {
                    bar.close = Some(close * rng.gen_range(3.0..6.0));
                }
                if rng.gen_bool(d.missing_price) {
                    bar.close = None;
                }
                if rng.gen_bool(d.missing_volume) {
                    bar.volume = None;
                }

                bars.push(bar);
                ts += step;
            }
        }

        Series::new(symbol, bars)
    }
}

fn feed_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn feed_close() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 30, 0).unwrap_or(NaiveTime::MIN)
}

impl DataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_symbol(&self, symbol: &str) -> Result<Series, SourceError> {
        Ok(self.generate(symbol))
    }
}
