//! Per-bar evaluation context handed to strategy rules.

use thiserror::Error;

use crate::components::indicator::{IndicatorSeries, IndicatorValues};
use crate::domain::{Bar, PositionError};

/// Unexpected failures inside a single bar's evaluation.
///
/// These never abort a run: the driver logs them and treats the bar as hold.
/// Missing inputs during warmup are *not* errors, they are `Condition::Undefined`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("indicator series '{name}' was not precomputed")]
    MissingIndicator { name: String },

    #[error("bar index {index} out of range for {len} bars")]
    BarIndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Explicit inputs for one bar: the bar history up to `index` and the
/// precomputed indicator values.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    bars: &'a [Bar],
    index: usize,
    indicators: &'a IndicatorValues,
}

impl<'a> BarContext<'a> {
    pub fn new(bars: &'a [Bar], index: usize, indicators: &'a IndicatorValues) -> Self {
        Self {
            bars,
            index,
            indicators,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The bar being evaluated.
    pub fn bar(&self) -> Result<&'a Bar, EvalError> {
        self.bars.get(self.index).ok_or(EvalError::BarIndexOutOfRange {
            index: self.index,
            len: self.bars.len(),
        })
    }

    /// The bar `lag` steps back, or `None` before the first bar.
    pub fn lagged_bar(&self, lag: usize) -> Result<Option<&'a Bar>, EvalError> {
        self.bar()?;
        Ok(self.index.checked_sub(lag).and_then(|i| self.bars.get(i)))
    }

    /// Lag-aware view of a precomputed series at this bar.
    pub fn series(&self, name: &str) -> Result<IndicatorSeries<'a>, EvalError> {
        self.indicators
            .at(name, self.index)
            .ok_or_else(|| EvalError::MissingIndicator {
                name: name.to_string(),
            })
    }
}
