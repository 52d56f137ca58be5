//! Multi-indicator confirmation strategy.
//!
//! Entry needs all of: fast SMA crossing above slow SMA on this bar, MACD
//! line and signal both above zero, RSI below the overbought level, and
//! volume above `volume_factor` times its average. An ATR trailing stop
//! protects the position; a death cross with negative MACD and RSI above the
//! oversold level closes it on the rules.

use tracing::debug;

use crate::components::condition::{exceeds_multiple, gt, lt, Condition};
use crate::components::indicator::Indicator;
use crate::domain::{PositionState, Reason};
use crate::indicators::{Atr, Macd, MacdBand, PriceSource, Rsi, Sma};

use super::config::EnhancedParams;
use super::context::{BarContext, EvalError};
use super::ma_crossover::{crossed_above, crossed_below};
use super::overlay::{AtrTrailing, RiskOverlay};
use super::{StrategyKind, StrategyRules};

#[derive(Debug, Clone)]
pub struct EnhancedRules {
    params: EnhancedParams,
    fast_key: String,
    slow_key: String,
    macd_key: String,
    signal_key: String,
    rsi_key: String,
    volume_key: String,
    trailing: AtrTrailing,
}

impl EnhancedRules {
    pub fn new(params: EnhancedParams) -> Self {
        let (f, s, g) = (params.macd_fast, params.macd_slow, params.macd_signal);
        Self {
            fast_key: Sma::key(params.fast_period, PriceSource::Close),
            slow_key: Sma::key(params.slow_period, PriceSource::Close),
            macd_key: Macd::key(f, s, g, MacdBand::Line),
            signal_key: Macd::key(f, s, g, MacdBand::Signal),
            rsi_key: format!("rsi_{}", params.rsi_period),
            volume_key: Sma::key(params.volume_period, PriceSource::Volume),
            trailing: AtrTrailing::new(format!("atr_{}", params.atr_period), params.atr_multiplier),
            params,
        }
    }
}

const OVERLAYS: [RiskOverlay; 1] = [RiskOverlay::TrailingStop];

impl StrategyRules for EnhancedRules {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Enhanced
    }

    fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        let p = &self.params;
        vec![
            Box::new(Sma::new(p.fast_period)),
            Box::new(Sma::new(p.slow_period)),
            Box::new(Macd::line(p.macd_fast, p.macd_slow, p.macd_signal)),
            Box::new(Macd::signal(p.macd_fast, p.macd_slow, p.macd_signal)),
            Box::new(Rsi::new(p.rsi_period)),
            Box::new(Atr::new(p.atr_period)),
            Box::new(Sma::of_volume(p.volume_period)),
        ]
    }

    fn entry(&self, ctx: &BarContext<'_>) -> Result<Option<Reason>, EvalError> {
        let bar = ctx.bar()?;
        let fast = ctx.series(&self.fast_key)?;
        let slow = ctx.series(&self.slow_key)?;
        let macd = ctx.series(&self.macd_key)?.current();
        let signal = ctx.series(&self.signal_key)?.current();
        let rsi = ctx.series(&self.rsi_key)?.current();
        let volume_avg = ctx.series(&self.volume_key)?.current();

        let cross = crossed_above(&fast, &slow);
        let momentum = Condition::all(&[gt(macd, Some(0.0)), gt(signal, Some(0.0))]);
        let not_overbought = lt(rsi, Some(self.params.rsi_upper));
        let volume = exceeds_multiple(bar.volume_f64(), volume_avg, self.params.volume_factor);
        debug!(
            bar = ctx.index(),
            %cross,
            %momentum,
            %not_overbought,
            %volume,
            "enhanced entry"
        );

        Ok(Condition::all(&[cross, momentum, not_overbought, volume])
            .holds()
            .then_some(Reason::MultiIndicatorConfirmed))
    }

    fn exit(
        &self,
        ctx: &BarContext<'_>,
        _position: &PositionState,
    ) -> Result<Option<Reason>, EvalError> {
        let fast = ctx.series(&self.fast_key)?;
        let slow = ctx.series(&self.slow_key)?;
        let macd = ctx.series(&self.macd_key)?.current();
        let rsi = ctx.series(&self.rsi_key)?.current();

        let exit = Condition::all(&[
            crossed_below(&fast, &slow),
            lt(macd, Some(0.0)),
            gt(rsi, Some(self.params.rsi_lower)),
        ]);
        Ok(exit.holds().then_some(Reason::DeathCross))
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
