//! StratLab Core: bar-by-bar strategy evaluation.
//!
//! This crate contains:
//! - Domain types (bars, actions, position tracker)
//! - Indicator trait, precomputed indicator values, lag-aware series view
//! - Concrete indicators (SMA, MACD, RSI, ATR, Donchian)
//! - Five strategy variants behind one rules trait
//! - The lifecycle driver with its pending-order guard and action sink
//! - The bar feed contract

pub mod components;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;

pub use domain::{Action, ActionRequest, Bar, Decision, PositionState, Reason};
pub use engine::{run_strategy, RecordingSink, RunSummary, SettlementPolicy, StrategyEngine};
pub use strategy::{StrategyConfig, StrategyKind};
