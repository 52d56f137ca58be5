//! External driver loop: feeds bars to one strategy instance in order and
//! relays emitted actions to an action sink.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::components::indicator::IndicatorValues;
use crate::domain::{ActionRequest, Bar, PositionState};
use crate::strategy::BarContext;

use super::guard::Settlement;
use super::sink::ActionSink;
use super::strategy_engine::StrategyEngine;

/// What happened over one pass of a strategy across a bar sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub bar_count: usize,
    pub actions: Vec<ActionRequest>,
    pub filled: usize,
    pub rejected: usize,
    pub skipped_bars: usize,
    pub failed_bars: usize,
    pub final_position: PositionState,
    /// Action still outstanding when the bars ran out.
    pub pending_at_end: Option<ActionRequest>,
}

/// Run `engine` over `bars`. Before each bar the sink is polled for the
/// settlement of any outstanding action. An empty bar sequence emits nothing.
pub fn run_strategy(
    bars: &[Bar],
    indicators: &IndicatorValues,
    engine: &mut StrategyEngine,
    sink: &mut dyn ActionSink,
) -> RunSummary {
    let mut actions = Vec::new();
    let mut filled = 0;
    let mut rejected = 0;

    for index in 0..bars.len() {
        let settlement = engine
            .pending()
            .and_then(|request| sink.poll_settlement(request, index));
        if let Some(settlement) = settlement {
            match engine.settle(settlement) {
                Ok(_) if settlement == Settlement::Filled => filled += 1,
                Ok(_) => rejected += 1,
                Err(err) => warn!(strategy = engine.name(), bar = index, error = %err, "settlement ignored"),
            }
        }

        let ctx = BarContext::new(bars, index, indicators);
        let decision = engine.step(&ctx);
        if let Some(request) = decision.request {
            sink.submit(&request);
            actions.push(request);
        }
    }

    RunSummary {
        bar_count: bars.len(),
        actions,
        filled,
        rejected,
        skipped_bars: engine.skipped_bars(),
        failed_bars: engine.failed_bars(),
        final_position: *engine.position(),
        pending_at_end: engine.pending().cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Action;
    use crate::engine::sink::{RecordingSink, SettlementPolicy};
    use crate::indicators::make_bars;
    use crate::strategy::config::{MovingAverageParams, RulesConfig, StrategyConfig};

    fn engine() -> StrategyEngine {
        let rules = RulesConfig::MovingAverage(MovingAverageParams {
            period: 2,
            stop_loss_pct: 5.0,
        });
        StrategyEngine::new("TEST", StrategyConfig::new("ma", rules)).unwrap()
    }

    #[test]
    fn empty_bars_emit_nothing() {
        let mut engine = engine();
        let mut sink = RecordingSink::new(SettlementPolicy::NextBar);
        let summary = run_strategy(&[], &IndicatorValues::new(), &mut engine, &mut sink);
        assert_eq!(summary.bar_count, 0);
        assert!(summary.actions.is_empty());
        assert!(sink.submitted().is_empty());
    }

    #[test]
    fn buy_then_stop_loss_with_next_bar_settlement() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 11.0]);
        let mut iv = IndicatorValues::new();
        iv.insert("sma_2", vec![f64::NAN, 10.5, 11.5, 11.5]);
        let mut engine = engine();
        let mut sink = RecordingSink::new(SettlementPolicy::NextBar);
        let summary = run_strategy(&bars, &iv, &mut engine, &mut sink);

        // bar 1: sma undefined at bar 0 so not rising yet; bar 2 enters at 12
        // bar 3: 11 vs 12 is -8.3%, stop-loss
        let kinds: Vec<Action> = summary.actions.iter().map(|a| a.action).collect();
        assert_eq!(kinds, [Action::Buy, Action::Close]);
        assert_eq!(summary.actions[0].bar_index, 2);
        assert_eq!(summary.actions[1].bar_index, 3);
        assert_eq!(summary.filled, 1);
        assert!(summary.pending_at_end.is_some());
        assert_eq!(sink.submitted().len(), 2);
    }

    #[test]
    fn slower_settlement_skips_bars() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 11.0, 10.0]);
        let mut iv = IndicatorValues::new();
        iv.insert("sma_2", vec![f64::NAN, 10.5, 11.5, 11.5, 10.5]);
        let mut engine = engine();
        let mut sink = RecordingSink::new(SettlementPolicy::AfterBars(3));
        let summary = run_strategy(&bars, &iv, &mut engine, &mut sink);
        assert_eq!(summary.actions.len(), 1);
        assert_eq!(summary.skipped_bars, 2);
    }
}
