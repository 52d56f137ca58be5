//! Moving-average trend strategy.
//!
//! Entry: close above its SMA while the SMA is rising. Exit: close back
//! below the SMA. Guarded by a fixed stop-loss.

use tracing::debug;

use crate::components::condition::{defined, gt, lt, Condition};
use crate::components::indicator::Indicator;
use crate::domain::{PositionState, Reason};
use crate::indicators::{PriceSource, Sma};

use super::config::MovingAverageParams;
use super::context::{BarContext, EvalError};
use super::overlay::RiskOverlay;
use super::{StrategyKind, StrategyRules};

#[derive(Debug, Clone)]
pub struct MovingAverageRules {
    params: MovingAverageParams,
    sma_key: String,
    overlays: [RiskOverlay; 1],
}

impl MovingAverageRules {
    pub fn new(params: MovingAverageParams) -> Self {
        let sma_key = Sma::key(params.period, PriceSource::Close);
        let overlays = [RiskOverlay::StopLoss {
            pct: params.stop_loss_pct,
        }];
        Self {
            params,
            sma_key,
            overlays,
        }
    }
}

impl StrategyRules for MovingAverageRules {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MovingAverage
    }

    fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(Sma::new(self.params.period))]
    }

    fn entry(&self, ctx: &BarContext<'_>) -> Result<Option<Reason>, EvalError> {
        let close = defined(ctx.bar()?.close);
        let sma = ctx.series(&self.sma_key)?;

        let above = gt(close, sma.current());
        let rising = gt(sma.current(), sma.previous());
        debug!(bar = ctx.index(), %above, %rising, "moving_average entry");

        Ok(Condition::all(&[above, rising])
            .holds()
            .then_some(Reason::MaTrend))
    }

    fn exit(
        &self,
        ctx: &BarContext<'_>,
        _position: &PositionState,
    ) -> Result<Option<Reason>, EvalError> {
        let close = defined(ctx.bar()?.close);
        let sma = ctx.series(&self.sma_key)?;
        Ok(lt(close, sma.current())
            .holds()
            .then_some(Reason::PriceBelowMa))
    }

    fn risk_overlays(&self) -> &[RiskOverlay] {
        &self.overlays
    }
}
