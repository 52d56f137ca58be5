//! Strategy variants and the rules interface they share.
//!
//! Every variant plugs the same hooks into the lifecycle driver
//! (`engine::StrategyEngine`): which indicators it needs, when to enter,
//! how to maintain an open position, which risk overlays guard it (in
//! priority order), and when its own rule-based exit fires. The driver owns
//! the position state and the pending-order guard; rules only read.

pub mod breakout;
pub mod config;
pub mod context;
pub mod enhanced;
pub mod factory;
pub mod fibonacci;
pub mod ma_crossover;
pub mod moving_average;
pub mod overlay;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::components::indicator::Indicator;
use crate::domain::{PositionState, Reason};

pub use breakout::BreakoutRules;
pub use config::{
    BreakoutParams, ConfigError, EnhancedParams, FibonacciParams, MaCrossoverParams,
    MovingAverageParams, RulesConfig, StrategyConfig,
};
pub use context::{BarContext, EvalError};
pub use enhanced::EnhancedRules;
pub use factory::{build_rules, required_indicators};
pub use fibonacci::FibonacciRules;
pub use ma_crossover::MaCrossoverRules;
pub use moving_average::MovingAverageRules;
pub use overlay::{AtrTrailing, RiskOverlay};

/// The five strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MovingAverage,
    MaCrossover,
    Enhanced,
    Fibonacci,
    Breakout,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::MovingAverage,
        StrategyKind::MaCrossover,
        StrategyKind::Enhanced,
        StrategyKind::Fibonacci,
        StrategyKind::Breakout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::MovingAverage => "moving_average",
            StrategyKind::MaCrossover => "ma_crossover",
            StrategyKind::Enhanced => "enhanced",
            StrategyKind::Fibonacci => "fibonacci",
            StrategyKind::Breakout => "breakout",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownKind(s.to_string()))
    }
}

/// Variant-specific decision rules.
///
/// # Architecture invariants
/// - Rules never mutate position state except through the `on_open` and
///   `maintain` hooks, and then only via `PositionState`'s own contract.
/// - Undefined inputs (warmup, zero denominators) make a sub-condition
///   undefined, which never triggers. `Err` is reserved for unexpected
///   failures such as a series that was never precomputed.
/// - A context never exposes bars after the one being evaluated.
pub trait StrategyRules: Send + Sync + fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// Indicators that must be precomputed before the bar loop.
    fn required_indicators(&self) -> Vec<Box<dyn Indicator>>;

    /// Entry check while flat. `Some` means buy at this bar's close.
    fn entry(&self, ctx: &BarContext<'_>) -> Result<Option<Reason>, EvalError>;

    /// Rule-based exit while open, checked after the risk overlays.
    fn exit(
        &self,
        ctx: &BarContext<'_>,
        position: &PositionState,
    ) -> Result<Option<Reason>, EvalError>;

    /// Protective exits in priority order.
    fn risk_overlays(&self) -> &[RiskOverlay];

    /// Called right after the position opens on an entry bar.
    fn on_open(
        &self,
        _ctx: &BarContext<'_>,
        _position: &mut PositionState,
    ) -> Result<(), EvalError> {
        Ok(())
    }

    /// Called on every open bar before the overlays are checked.
    fn maintain(
        &self,
        _ctx: &BarContext<'_>,
        _position: &mut PositionState,
    ) -> Result<(), EvalError> {
        Ok(())
    }
}
