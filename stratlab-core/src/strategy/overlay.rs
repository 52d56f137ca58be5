//! Risk overlays and the ATR trailing stop.
//!
//! Overlays are checked while a position is open, in the priority order a
//! variant declares. The first one that holds closes the position; the rest
//! are not evaluated for that bar.

use serde::{Deserialize, Serialize};

use crate::components::condition::Condition;
use crate::domain::{PositionState, Reason};

use super::context::{BarContext, EvalError};

/// One protective exit rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "overlay", rename_all = "snake_case")]
pub enum RiskOverlay {
    /// Loss relative to entry reaches `-pct` percent.
    StopLoss { pct: f64 },
    /// Profit relative to entry reaches `pct` percent.
    TakeProfit { pct: f64 },
    /// Position has been held for at least `bars` bars.
    MaxHold { bars: usize },
    /// Close falls below the current trailing stop.
    TrailingStop,
}

impl RiskOverlay {
    pub fn reason(&self) -> Reason {
        match self {
            RiskOverlay::StopLoss { .. } => Reason::StopLoss,
            RiskOverlay::TakeProfit { .. } => Reason::TakeProfit,
            RiskOverlay::MaxHold { .. } => Reason::MaxHoldingPeriod,
            RiskOverlay::TrailingStop => Reason::TrailingStop,
        }
    }

    /// Whether the overlay fires for an open position at `close`.
    ///
    /// Profit-based overlays are undefined without a positive entry price;
    /// the trailing stop is undefined until one has been set.
    pub fn check(&self, close: f64, position: &PositionState) -> Condition {
        if !position.is_open() {
            return Condition::NotMet;
        }
        match *self {
            RiskOverlay::StopLoss { pct } => {
                Condition::from_option(position.profit_pct(close).map(|p| p <= -pct))
            }
            RiskOverlay::TakeProfit { pct } => {
                Condition::from_option(position.profit_pct(close).map(|p| p >= pct))
            }
            RiskOverlay::MaxHold { bars } => Condition::from_bool(position.bars_held() >= bars),
            RiskOverlay::TrailingStop => {
                if close.is_nan() {
                    return Condition::Undefined;
                }
                Condition::from_option(position.trailing_stop().map(|stop| close < stop))
            }
        }
    }
}

/// First overlay in `overlays` that holds, in order.
pub fn first_triggered(
    overlays: &[RiskOverlay],
    close: f64,
    position: &PositionState,
) -> Option<RiskOverlay> {
    overlays
        .iter()
        .copied()
        .find(|o| o.check(close, position).holds())
}

/// ATR-based trailing stop: `close - ATR * multiplier`, ratcheted upward
/// only while the close is above the entry price.
#[derive(Debug, Clone)]
pub struct AtrTrailing {
    atr_key: String,
    multiplier: f64,
}

impl AtrTrailing {
    pub fn new(atr_key: impl Into<String>, multiplier: f64) -> Self {
        Self {
            atr_key: atr_key.into(),
            multiplier,
        }
    }

    pub fn atr_key(&self) -> &str {
        &self.atr_key
    }

    fn candidate(&self, ctx: &BarContext<'_>, price: f64) -> Result<Option<f64>, EvalError> {
        let atr = ctx.series(&self.atr_key)?.current();
        Ok(atr
            .map(|atr| price - atr * self.multiplier)
            .filter(|s| s.is_finite()))
    }

    /// Initial stop right after entry. Undefined ATR leaves the stop unset.
    pub fn initialise(
        &self,
        ctx: &BarContext<'_>,
        position: &mut PositionState,
    ) -> Result<(), EvalError> {
        let Some(entry) = position.entry_price() else {
            return Ok(());
        };
        if let Some(stop) = self.candidate(ctx, entry)? {
            position.raise_trailing_stop(stop)?;
        }
        Ok(())
    }

    /// Offer a new stop from the current close when price is above entry.
    pub fn ratchet(
        &self,
        ctx: &BarContext<'_>,
        position: &mut PositionState,
    ) -> Result<(), EvalError> {
        let close = ctx.bar()?.close;
        let Some(entry) = position.entry_price() else {
            return Ok(());
        };
        if close.is_nan() || close <= entry {
            return Ok(());
        }
        if let Some(stop) = self.candidate(ctx, close)? {
            position.raise_trailing_stop(stop)?;
        }
        Ok(())
    }
}
