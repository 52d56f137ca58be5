//! Indicator precomputation.
//!
//! All indicators are computed once before the bar loop begins, and shared
//! read-only by every strategy instance running over the same bars.

use std::collections::HashSet;

use tracing::debug;

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;

/// Compute every indicator over `bars`. Indicators sharing a name are
/// computed once.
pub fn precompute_indicators(bars: &[Bar], indicators: &[Box<dyn Indicator>]) -> IndicatorValues {
    let mut seen = HashSet::new();
    let mut iv = IndicatorValues::new();

    for indicator in indicators {
        if !seen.insert(indicator.name()) {
            continue;
        }
        let series = indicator.compute(bars);
        debug_assert_eq!(
            series.len(),
            bars.len(),
            "indicator '{}' produced {} values for {} bars",
            indicator.name(),
            series.len(),
            bars.len()
        );
        debug!(indicator = indicator.name(), lookback = indicator.lookback(), "precomputed");
        iv.insert(indicator.name(), series);
    }

    iv
}

/// Longest lookback across `indicators`; no strategy can act before it.
pub fn compute_warmup(indicators: &[Box<dyn Indicator>]) -> usize {
    indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
}
