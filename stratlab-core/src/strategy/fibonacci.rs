//! Fibonacci retracement rebound strategy.
//!
//! Levels come from the rolling swing high / swing low:
//! `level = high - (high - low) * ratio`. Entry when the close sits within
//! the tolerance band of the deep level (checked first) or the shallow level
//! and closes above the previous close. Exit at the target level; an ATR
//! trailing stop guards the position.

use tracing::debug;

use crate::components::condition::{defined, gt, Condition};
use crate::components::indicator::Indicator;
use crate::domain::{FibLevel, PositionState, Reason};
use crate::indicators::{Atr, Donchian, DonchianBand};

use super::config::FibonacciParams;
use super::context::{BarContext, EvalError};
use super::overlay::{AtrTrailing, RiskOverlay};
use super::{StrategyKind, StrategyRules};

/// Retracement prices for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetracementLevels {
    pub target: f64,
    pub shallow: f64,
    pub deep: f64,
}

#[derive(Debug, Clone)]
pub struct FibonacciRules {
    params: FibonacciParams,
    high_key: String,
    low_key: String,
    trailing: AtrTrailing,
}

const OVERLAYS: [RiskOverlay; 1] = [RiskOverlay::TrailingStop];

impl FibonacciRules {
    pub fn new(params: FibonacciParams) -> Self {
        Self {
            high_key: Donchian::key(params.period, DonchianBand::Upper),
            low_key: Donchian::key(params.period, DonchianBand::Lower),
            trailing: AtrTrailing::new(format!("atr_{}", params.atr_period), params.atr_multiplier),
            params,
        }
    }

    /// Levels at this bar, or `None` while the swing window is warming up.
    pub fn levels(&self, ctx: &BarContext<'_>) -> Result<Option<RetracementLevels>, EvalError> {
        let high = ctx.series(&self.high_key)?.current();
        let low = ctx.series(&self.low_key)?.current();
        Ok(high.zip(low).map(|(high, low)| {
            let range = high - low;
            RetracementLevels {
                target: high - range * self.params.target_ratio,
                shallow: high - range * self.params.shallow_ratio,
                deep: high - range * self.params.deep_ratio,
            }
        }))
    }

    fn within_band(&self, close: f64, level: f64) -> bool {
        let tol = self.params.tolerance_pct / 100.0;
        close >= level * (1.0 - tol) && close <= level * (1.0 + tol)
    }
}

impl StrategyRules for FibonacciRules {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fibonacci
    }

    fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(Donchian::upper(self.params.period)),
            Box::new(Donchian::lower(self.params.period)),
            Box::new(Atr::new(self.params.atr_period)),
        ]
    }

    fn entry(&self, ctx: &BarContext<'_>) -> Result<Option<Reason>, EvalError> {
        let Some(levels) = self.levels(ctx)? else {
            return Ok(None);
        };
        let Some(close) = defined(ctx.bar()?.close) else {
            return Ok(None);
        };
        let prev_close = ctx.lagged_bar(1)?.and_then(|b| defined(b.close));
        let rebound = gt(Some(close), prev_close);

        // The deep band takes precedence; a close inside it never falls
        // through to the shallow band.
        let (level, ratio) = if self.within_band(close, levels.deep) {
            (FibLevel::Deep, self.params.deep_ratio)
        } else if self.within_band(close, levels.shallow) {
            (FibLevel::Shallow, self.params.shallow_ratio)
        } else {
            return Ok(None);
        };
        debug!(bar = ctx.index(), ?level, %rebound, "fibonacci entry");

        Ok(rebound
            .holds()
            .then_some(Reason::FibonacciRebound { level, ratio }))
    }

    fn exit(
        &self,
        ctx: &BarContext<'_>,
        _position: &PositionState,
    ) -> Result<Option<Reason>, EvalError> {
        let Some(levels) = self.levels(ctx)? else {
            return Ok(None);
        };
        let close = defined(ctx.bar()?.close);
        Ok(Condition::from_option(close.map(|c| c >= levels.target))
            .holds()
            .then_some(Reason::FibonacciTarget))
    }

    fn risk_overlays(&self) -> &[RiskOverlay] {
        &OVERLAYS
    }

    fn on_open(
        &self,
        ctx: &BarContext<'_>,
        position: &mut PositionState,
    ) -> Result<(), EvalError> {
        self.trailing.initialise(ctx, position)
    }

    fn maintain(
        &self,
        ctx: &BarContext<'_>,
        position: &mut PositionState,
    ) -> Result<(), EvalError> {
        self.trailing.ratchet(ctx, position)
    }
}
