//! Building blocks shared by every strategy variant: the indicator adapter
//! and tri-state sub-condition evaluation.

pub mod condition;
pub mod indicator;

pub use condition::{defined, exceeds_multiple, gt, lt, pct_change, Condition};
pub use indicator::{Indicator, IndicatorSeries, IndicatorValues};
