//! Strategy engine: lifecycle driver, pending-order guard, action sink and
//! the driver loop that ties them to a bar sequence.

pub mod guard;
pub mod loop_runner;
pub mod precompute;
pub mod sink;
pub mod strategy_engine;

pub use guard::{GuardError, PendingAction, PendingOrderGuard, Settlement};
pub use loop_runner::{run_strategy, RunSummary};
pub use precompute::{compute_warmup, precompute_indicators};
pub use sink::{ActionSink, RecordingSink, SettlementPolicy};
pub use strategy_engine::StrategyEngine;
