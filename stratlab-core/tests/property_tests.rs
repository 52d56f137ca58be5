//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Single flight: no action is emitted while another is outstanding
//! 2. Trailing-stop monotonicity: the stop never moves down
//! 3. Division safety: zero prices and volumes never panic or trigger entry
//! 4. Position lifecycle: `bars_held` counts observed bars from 0

use chrono::NaiveDate;
use proptest::prelude::*;
use stratlab_core::components::{Indicator, IndicatorValues};
use stratlab_core::domain::{Action, Bar, PositionState};
use stratlab_core::engine::{
    precompute_indicators, run_strategy, RecordingSink, SettlementPolicy, StrategyEngine,
};
use stratlab_core::strategy::{
    AtrTrailing, BarContext, MovingAverageParams, RulesConfig, StrategyConfig, StrategyKind,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn bars_from(closes: &[f64], volumes: &[u64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                symbol: "PROP".into(),
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume,
            }
        })
        .collect()
}

fn run_with(
    kind_config: StrategyConfig,
    bars: &[Bar],
    policy: SettlementPolicy,
) -> stratlab_core::engine::RunSummary {
    let mut engine = StrategyEngine::new("PROP", kind_config).unwrap();
    let indicators: Vec<Box<dyn Indicator>> = engine.required_indicators();
    let iv = precompute_indicators(bars, &indicators);
    let mut sink = RecordingSink::new(policy);
    run_strategy(bars, &iv, &mut engine, &mut sink)
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_path(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-6.0..6.0_f64, len).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|s| {
                price = (price * (1.0 + s / 100.0)).max(1.0);
                price
            })
            .collect()
    })
}

// ── 1. Single flight ─────────────────────────────────────────────────

proptest! {
    /// Actions alternate buy/close, and consecutive actions are at least the
    /// settlement delay apart.
    #[test]
    fn actions_never_overlap(
        closes in arb_path(20..120),
        delay in 1usize..4,
        period in 2usize..6,
    ) {
        let volumes = vec![1000; closes.len()];
        let bars = bars_from(&closes, &volumes);
        let config = StrategyConfig::new(
            "ma",
            RulesConfig::MovingAverage(MovingAverageParams { period, stop_loss_pct: 3.0 }),
        );
        let summary = run_with(config, &bars, SettlementPolicy::AfterBars(delay));

        for (i, action) in summary.actions.iter().enumerate() {
            let expected = if i % 2 == 0 { Action::Buy } else { Action::Close };
            prop_assert_eq!(action.action, expected);
        }
        for pair in summary.actions.windows(2) {
            prop_assert!(pair[1].bar_index >= pair[0].bar_index + delay);
        }
    }

    /// Every default variant, run over arbitrary paths, keeps single flight.
    #[test]
    fn every_variant_alternates(closes in arb_path(40..100), kind_idx in 0usize..5) {
        let volumes: Vec<u64> = (0..closes.len()).map(|i| 1000 + (i as u64 % 7) * 900).collect();
        let bars = bars_from(&closes, &volumes);
        let kind = StrategyKind::ALL[kind_idx];
        let summary = run_with(StrategyConfig::default_for(kind), &bars, SettlementPolicy::NextBar);
        prop_assert_eq!(summary.failed_bars, 0);
        for pair in summary.actions.windows(2) {
            prop_assert_ne!(pair[0].action, pair[1].action);
            prop_assert!(pair[1].bar_index > pair[0].bar_index);
        }
    }
}

// ── 2. Trailing stop monotonicity ────────────────────────────────────

proptest! {
    #[test]
    fn trailing_stop_never_decreases(
        closes in arb_path(2..60),
        atrs in prop::collection::vec(0.1..5.0_f64, 60),
    ) {
        let volumes = vec![1000; closes.len()];
        let bars = bars_from(&closes, &volumes);
        let mut iv = IndicatorValues::new();
        iv.insert("atr_14", atrs[..closes.len()].to_vec());
        let trail = AtrTrailing::new("atr_14", 2.0);

        let mut pos = PositionState::flat();
        pos.open(closes[0]).unwrap();
        trail.initialise(&BarContext::new(&bars, 0, &iv), &mut pos).unwrap();
        let initial = pos.trailing_stop();
        let mut last = initial;

        for i in 1..bars.len() {
            pos.tick().unwrap();
            trail.ratchet(&BarContext::new(&bars, i, &iv), &mut pos).unwrap();
            let now = pos.trailing_stop();
            if let (Some(prev), Some(cur)) = (last, now) {
                prop_assert!(cur >= prev);
            }
            if closes[i] <= closes[0] {
                // at or below entry the stop is never offered a new level
                prop_assert_eq!(now, last);
            }
            last = now;
        }
    }

    #[test]
    fn raise_trailing_stop_is_a_max(candidates in prop::collection::vec(-100.0..100.0_f64, 1..40)) {
        let mut pos = PositionState::flat();
        pos.open(50.0).unwrap();
        for &c in &candidates {
            pos.raise_trailing_stop(c).unwrap();
        }
        let max = candidates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(pos.trailing_stop(), Some(max));
    }
}

// ── 3. Division safety ───────────────────────────────────────────────

proptest! {
    /// Zero opens, closes and volumes never make an evaluation fail, and a
    /// zero open never yields a breakout entry.
    #[test]
    fn zero_denominators_are_safe(
        closes in prop::collection::vec(prop_oneof![Just(0.0), 1.0..200.0_f64], 10..60),
        volumes in prop::collection::vec(prop_oneof![Just(0u64), 1u64..10_000], 60),
    ) {
        let bars = bars_from(&closes, &volumes[..closes.len()]);
        for kind in StrategyKind::ALL {
            let summary = run_with(StrategyConfig::default_for(kind), &bars, SettlementPolicy::NextBar);
            prop_assert_eq!(summary.failed_bars, 0);
            if kind == StrategyKind::Breakout {
                for action in summary.actions.iter().filter(|a| a.action == Action::Buy) {
                    let bar = &bars[action.bar_index];
                    prop_assert!(bar.open > 0.0);
                    prop_assert!(action.bar_index > 0 && bars[action.bar_index - 1].close > 0.0);
                }
            }
        }
    }
}

// ── 4. Position lifecycle ────────────────────────────────────────────

proptest! {
    #[test]
    fn bars_held_counts_ticks_since_open(
        ops in prop::collection::vec(0u8..3, 1..80),
    ) {
        let mut pos = PositionState::flat();
        let mut expected = 0usize;
        for op in ops {
            match op {
                0 => {
                    if pos.open(10.0).is_ok() {
                        expected = 0;
                    }
                }
                1 => {
                    if pos.tick().is_ok() {
                        expected += 1;
                    }
                }
                _ => {
                    let _ = pos.close();
                }
            }
            if pos.is_open() {
                prop_assert_eq!(pos.bars_held(), expected);
                prop_assert!(pos.entry_price().is_some());
            } else {
                prop_assert_eq!(pos, PositionState::flat());
            }
        }
    }
}
