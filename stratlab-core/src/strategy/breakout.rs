//! Limit-up breakout strategy.
//!
//! Entry needs all four: an open-to-close rise of at least `limit_up_pct`,
//! volume above `volume_ratio` times its average, a close-over-close rise of
//! at least `price_up_pct`, and a rising price SMA. No rule-based exit; the
//! position is closed by stop-loss, take-profit or the holding limit, in
//! that order.

use tracing::debug;

use crate::components::condition::{exceeds_multiple, gt, pct_change, Condition};
use crate::components::indicator::Indicator;
use crate::domain::{PositionState, Reason};
use crate::indicators::{PriceSource, Sma};

use super::config::BreakoutParams;
use super::context::{BarContext, EvalError};
use super::overlay::RiskOverlay;
use super::{StrategyKind, StrategyRules};

#[derive(Debug, Clone)]
pub struct BreakoutRules {
    params: BreakoutParams,
    volume_key: String,
    price_key: String,
    overlays: [RiskOverlay; 3],
}

impl BreakoutRules {
    pub fn new(params: BreakoutParams) -> Self {
        let overlays = [
            RiskOverlay::StopLoss {
                pct: params.stop_loss_pct,
            },
            RiskOverlay::TakeProfit {
                pct: params.take_profit_pct,
            },
            RiskOverlay::MaxHold {
                bars: params.max_hold_days,
            },
        ];
        Self {
            volume_key: Sma::key(params.volume_period, PriceSource::Volume),
            price_key: Sma::key(params.price_ma_period, PriceSource::Close),
            overlays,
            params,
        }
    }
}

impl StrategyRules for BreakoutRules {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Breakout
    }

    fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(Sma::of_volume(self.params.volume_period)),
            Box::new(Sma::new(self.params.price_ma_period)),
        ]
    }

    fn entry(&self, ctx: &BarContext<'_>) -> Result<Option<Reason>, EvalError> {
        let bar = ctx.bar()?;
        let prev = ctx.lagged_bar(1)?;
        let volume_avg = ctx.series(&self.volume_key)?.current();
        let price_ma = ctx.series(&self.price_key)?;

        let limit_up = Condition::from_option(
            pct_change(bar.open, bar.close).map(|rise| rise >= self.params.limit_up_pct),
        );
        let volume_surge =
            exceeds_multiple(bar.volume_f64(), volume_avg, self.params.volume_ratio);
        let price_break = Condition::from_option(
            prev.and_then(|p| pct_change(p.close, bar.close))
                .map(|rise| rise >= self.params.price_up_pct),
        );
        let ma_rising = gt(price_ma.current(), price_ma.previous());
        debug!(
            bar = ctx.index(),
            %limit_up,
            %volume_surge,
            %price_break,
            %ma_rising,
            "breakout entry"
        );

        Ok(
            Condition::all(&[limit_up, volume_surge, price_break, ma_rising])
                .holds()
                .then_some(Reason::LimitUpBreakout),
        )
    }

    fn exit(
        &self,
        _ctx: &BarContext<'_>,
        _position: &PositionState,
    ) -> Result<Option<Reason>, EvalError> {
        Ok(None)
    }

    fn risk_overlays(&self) -> &[RiskOverlay] {
        &self.overlays
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::indicator::IndicatorValues;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn bar(i: i64, open: f64, close: f64, volume: u64) -> Bar {
        Bar {
            symbol: "000001".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(i),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume,
        }
    }

    fn limit_up_day() -> (Vec<Bar>, IndicatorValues) {
        let bars = vec![bar(0, 103.0, 104.0, 100), bar(1, 100.0, 110.0, 300)];
        let mut iv = IndicatorValues::new();
        iv.insert("volume_sma_5", vec![100.0, 100.0]);
        iv.insert("sma_5", vec![101.0, 103.0]);
        (bars, iv)
    }

    #[test]
    fn limit_up_breakout_enters() {
        let rules = BreakoutRules::new(BreakoutParams::default());
        let (bars, iv) = limit_up_day();
        assert_eq!(
            rules.entry(&BarContext::new(&bars, 1, &iv)).unwrap(),
            Some(Reason::LimitUpBreakout)
        );
    }

    #[test]
    fn small_rise_does_not_enter() {
        let rules = BreakoutRules::new(BreakoutParams::default());
        let (mut bars, iv) = limit_up_day();
        bars[1].open = 101.0; // 8.9% rise
        assert_eq!(rules.entry(&BarContext::new(&bars, 1, &iv)).unwrap(), None);
    }

    #[test]
    fn zero_open_is_undefined_not_a_panic() {
        let rules = BreakoutRules::new(BreakoutParams::default());
        let (mut bars, iv) = limit_up_day();
        bars[1].open = 0.0;
        assert_eq!(rules.entry(&BarContext::new(&bars, 1, &iv)).unwrap(), None);
    }

    #[test]
    fn zero_previous_close_is_undefined() {
        let rules = BreakoutRules::new(BreakoutParams::default());
        let (mut bars, iv) = limit_up_day();
        bars[0].close = 0.0;
        assert_eq!(rules.entry(&BarContext::new(&bars, 1, &iv)).unwrap(), None);
    }

    #[test]
    fn flat_price_ma_does_not_enter() {
        let rules = BreakoutRules::new(BreakoutParams::default());
        let (bars, mut iv) = limit_up_day();
        iv.insert("sma_5", vec![103.0, 103.0]);
        assert_eq!(rules.entry(&BarContext::new(&bars, 1, &iv)).unwrap(), None);
    }

    #[test]
    fn overlay_priority_order() {
        let rules = BreakoutRules::new(BreakoutParams::default());
        assert_eq!(
            rules.risk_overlays(),
            &[
                RiskOverlay::StopLoss { pct: 5.0 },
                RiskOverlay::TakeProfit { pct: 7.0 },
                RiskOverlay::MaxHold { bars: 3 },
            ]
        );
    }
}
