//! Donchian channel: highest high / lowest low over a rolling window.
//!
//! Exposed as two named series, `donchian_upper_{n}` and
//! `donchian_lower_{n}`. Lookback: period - 1.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    name: String,
}

impl Donchian {
    pub fn upper(period: usize) -> Self {
        Self::new(period, DonchianBand::Upper)
    }

    pub fn lower(period: usize) -> Self {
        Self::new(period, DonchianBand::Lower)
    }

    fn new(period: usize, band: DonchianBand) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            band,
            name: Self::key(period, band),
        }
    }

    pub fn key(period: usize, band: DonchianBand) -> String {
        match band {
            DonchianBand::Upper => format!("donchian_upper_{period}"),
            DonchianBand::Lower => format!("donchian_lower_{period}"),
        }
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &bars[i + 1 - self.period..=i];
            let extreme = match self.band {
                DonchianBand::Upper => window
                    .iter()
                    .map(|b| b.high)
                    .try_fold(f64::NEG_INFINITY, |acc, h| (!h.is_nan()).then(|| acc.max(h))),
                DonchianBand::Lower => window
                    .iter()
                    .map(|b| b.low)
                    .try_fold(f64::INFINITY, |acc, l| (!l.is_nan()).then(|| acc.min(l))),
            };
            result[i] = extreme.unwrap_or(f64::NAN);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn donchian_upper_lower() {
        // highs = max(open, close) + 1, lows = min(open, close) - 1
        let bars = make_bars(&[10.0, 12.0, 11.0, 15.0, 13.0]);
        let upper = Donchian::upper(3).compute(&bars);
        let lower = Donchian::lower(3).compute(&bars);
        assert!(upper[1].is_nan());
        assert_approx(upper[2], 13.0, DEFAULT_EPSILON);
        assert_approx(upper[4], 16.0, DEFAULT_EPSILON);
        assert_approx(lower[2], 9.0, DEFAULT_EPSILON);
        assert_approx(lower[4], 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn donchian_nan_in_window() {
        let mut bars = make_bars(&[10.0, 12.0, 11.0, 15.0]);
        bars[1].high = f64::NAN;
        let upper = Donchian::upper(2).compute(&bars);
        assert!(upper[1].is_nan());
        assert!(upper[2].is_nan());
        assert!(!upper[3].is_nan());
    }

    #[test]
    fn donchian_names() {
        assert_eq!(Donchian::upper(20).name(), "donchian_upper_20");
        assert_eq!(Donchian::lower(20).name(), "donchian_lower_20");
        assert_eq!(Donchian::upper(20).lookback(), 19);
    }
}
