//! Indicator trait, precomputed indicator values, and the lag-aware series view.
//!
//! Indicators are pure functions: bar history in, numeric series out.
//! They are precomputed once before the bar loop. Strategies never touch the
//! raw vectors; they read through an [`IndicatorSeries`] bound to the current
//! bar index, which cannot see later bars.

use crate::domain::Bar;
use std::collections::HashMap;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Key the series is stored under (e.g. "sma_20", "volume_sma_5").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Container for precomputed indicator values, keyed by indicator name.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Raw value at a bar index. NaN during warmup is returned as-is.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    /// View of a named series as seen from `bar_index`.
    pub fn at(&self, name: &str, bar_index: usize) -> Option<IndicatorSeries<'_>> {
        self.series
            .get_key_value(name)
            .map(|(key, values)| IndicatorSeries::new(key, values, bar_index))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Read-only view of one indicator series, anchored at a bar index.
///
/// `value(0)` is the anchored bar, `value(k)` the bar k steps earlier. Both
/// warmup NaN and lags reaching before bar 0 read as `None`; nothing after
/// the anchor is reachable.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorSeries<'a> {
    name: &'a str,
    values: &'a [f64],
    index: usize,
}

impl<'a> IndicatorSeries<'a> {
    pub fn new(name: &'a str, values: &'a [f64], index: usize) -> Self {
        Self {
            name,
            values,
            index,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<f64> {
        self.value(0)
    }

    pub fn previous(&self) -> Option<f64> {
        self.value(1)
    }

    pub fn value(&self, lag: usize) -> Option<f64> {
        let idx = self.index.checked_sub(lag)?;
        self.values.get(idx).copied().filter(|v| v.is_finite())
    }
}
