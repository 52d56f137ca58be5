//! Run orchestration: one independent engine instance per configured
//! strategy, all driven over the same bars.
//!
//! Bars and precomputed indicator values are shared read-only. Each instance
//! owns its position state, guard and sink, and instances run in parallel on
//! rayon workers. Within an instance bars are strictly sequential.

use std::time::Instant;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use stratlab_core::components::indicator::IndicatorValues;
use stratlab_core::data::DataError;
use stratlab_core::domain::{Action, ActionRequest, Bar, PositionState};
use stratlab_core::engine::{
    compute_warmup, precompute_indicators, run_strategy, RecordingSink, SettlementPolicy,
    StrategyEngine,
};
use stratlab_core::strategy::{required_indicators, ConfigError, StrategyKind};

use crate::config::RunConfig;
use crate::data_loader::{load_run_bars, LoadedBars};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("failed to parse run file: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("failed to render run file: {0}")]
    Render(#[source] toml::ser::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("run symbol must not be empty")]
    EmptySymbol,

    #[error("no data source: set `data` or `synthetic = true`")]
    NoDataSource,

    #[error("`data` and `synthetic` are mutually exclusive")]
    ConflictingDataSources,

    #[error("invalid run settings: {0}")]
    InvalidRun(String),

    #[error("no [[strategy]] tables configured")]
    NoStrategies,

    #[error("duplicate strategy name '{0}'")]
    DuplicateStrategy(String),
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Outcome of one strategy instance over the run's bars.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyRunResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub kind: StrategyKind,
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub settlement: SettlementPolicy,
    pub actions: Vec<ActionRequest>,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub filled: usize,
    pub rejected: usize,
    pub skipped_bars: usize,
    pub failed_bars: usize,
    pub final_position: PositionState,
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl StrategyRunResult {
    pub fn buys(&self) -> usize {
        self.count(Action::Buy)
    }

    pub fn closes(&self) -> usize {
        self.count(Action::Close)
    }

    fn count(&self, action: Action) -> usize {
        self.actions.iter().filter(|a| a.action == action).count()
    }
}

/// Load the configured bars, then run every strategy over them.
pub fn run_from_config(
    config: &RunConfig,
) -> Result<(LoadedBars, Vec<StrategyRunResult>), RunError> {
    config.validate()?;
    let loaded = load_run_bars(&config.run)?;
    let results = run_strategies(config, &loaded)?;
    Ok((loaded, results))
}

/// Run every configured strategy over `loaded`.
///
/// The union of required indicators is precomputed once. Results come back
/// in configuration order.
pub fn run_strategies(
    config: &RunConfig,
    loaded: &LoadedBars,
) -> Result<Vec<StrategyRunResult>, RunError> {
    let engines = config
        .strategies
        .iter()
        .map(|s| StrategyEngine::new(config.run.symbol.clone(), s.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let indicators = required_indicators(&config.rules())?;
    let indicator_values = precompute_indicators(&loaded.bars, &indicators);
    let warmup = compute_warmup(&indicators);

    info!(
        symbol = %config.run.symbol,
        bars = loaded.bars.len(),
        strategies = engines.len(),
        indicators = indicator_values.len(),
        "run started"
    );
    let started = Instant::now();

    let results: Vec<StrategyRunResult> = engines
        .into_par_iter()
        .map(|engine| {
            run_instance(
                engine,
                &loaded.bars,
                &indicator_values,
                warmup,
                config,
                loaded,
            )
        })
        .collect();

    info!(
        symbol = %config.run.symbol,
        actions = results.iter().map(|r| r.actions.len()).sum::<usize>(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(results)
}

fn run_instance(
    mut engine: StrategyEngine,
    bars: &[Bar],
    indicators: &IndicatorValues,
    warmup: usize,
    config: &RunConfig,
    loaded: &LoadedBars,
) -> StrategyRunResult {
    let settlement = config.run.settlement;
    let mut sink = RecordingSink::new(settlement);
    let summary = run_strategy(bars, indicators, &mut engine, &mut sink);

    info!(
        strategy = engine.name(),
        actions = summary.actions.len(),
        failed_bars = summary.failed_bars,
        "strategy finished"
    );

    StrategyRunResult {
        schema_version: SCHEMA_VERSION,
        name: engine.name().to_string(),
        kind: engine.kind(),
        symbol: engine.symbol().to_string(),
        start_date: bars.first().map(|b| b.date),
        end_date: bars.last().map(|b| b.date),
        settlement,
        actions: summary.actions,
        bar_count: summary.bar_count,
        warmup_bars: warmup.min(summary.bar_count),
        filled: summary.filled,
        rejected: summary.rejected,
        skipped_bars: summary.skipped_bars,
        failed_bars: summary.failed_bars,
        final_position: summary.final_position,
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
    }
}
