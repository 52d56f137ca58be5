//! Dual moving-average crossover strategy.
//!
//! Entry on a golden cross (fast crosses above slow), exit on a death
//! cross, guarded by a fixed stop-loss.

use tracing::debug;

use crate::components::condition::Condition;
use crate::components::indicator::{Indicator, IndicatorSeries};
use crate::domain::{PositionState, Reason};
use crate::indicators::{PriceSource, Sma};

use super::config::MaCrossoverParams;
use super::context::{BarContext, EvalError};
use super::overlay::RiskOverlay;
use super::{StrategyKind, StrategyRules};

/// Current bar: fast > slow. Previous bar: fast <= slow.
pub fn crossed_above(fast: &IndicatorSeries<'_>, slow: &IndicatorSeries<'_>) -> Condition {
    match (fast.current(), slow.current(), fast.previous(), slow.previous()) {
        (Some(fc), Some(sc), Some(fp), Some(sp)) => Condition::from_bool(fc > sc && fp <= sp),
        _ => Condition::Undefined,
    }
}

/// Current bar: fast < slow. Previous bar: fast >= slow.
pub fn crossed_below(fast: &IndicatorSeries<'_>, slow: &IndicatorSeries<'_>) -> Condition {
    match (fast.current(), slow.current(), fast.previous(), slow.previous()) {
        (Some(fc), Some(sc), Some(fp), Some(sp)) => Condition::from_bool(fc < sc && fp >= sp),
        _ => Condition::Undefined,
    }
}

#[derive(Debug, Clone)]
pub struct MaCrossoverRules {
    params: MaCrossoverParams,
    fast_key: String,
    slow_key: String,
    overlays: [RiskOverlay; 1],
}

impl MaCrossoverRules {
    pub fn new(params: MaCrossoverParams) -> Self {
        Self {
            fast_key: Sma::key(params.fast_period, PriceSource::Close),
            slow_key: Sma::key(params.slow_period, PriceSource::Close),
            overlays: [RiskOverlay::StopLoss {
                pct: params.stop_loss_pct,
            }],
            params,
        }
    }
}

impl StrategyRules for MaCrossoverRules {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MaCrossover
    }

    fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(Sma::new(self.params.fast_period)),
            Box::new(Sma::new(self.params.slow_period)),
        ]
    }

    fn entry(&self, ctx: &BarContext<'_>) -> Result<Option<Reason>, EvalError> {
        let fast = ctx.series(&self.fast_key)?;
        let slow = ctx.series(&self.slow_key)?;
        let golden = crossed_above(&fast, &slow);
        debug!(bar = ctx.index(), %golden, "ma_crossover entry");
        Ok(golden.holds().then_some(Reason::GoldenCross))
    }

    fn exit(
        &self,
        ctx: &BarContext<'_>,
        _position: &PositionState,
    ) -> Result<Option<Reason>, EvalError> {
        let fast = ctx.series(&self.fast_key)?;
        let slow = ctx.series(&self.slow_key)?;
        Ok(crossed_below(&fast, &slow)
            .holds()
            .then_some(Reason::DeathCross))
    }

    fn risk_overlays(&self) -> &[RiskOverlay] {
        &self.overlays
    }
}
