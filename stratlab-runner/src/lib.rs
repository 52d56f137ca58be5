//! StratLab Runner: run orchestration on top of `stratlab-core`.
//!
//! - TOML run files (`[run]` plus `[[strategy]]` tables)
//! - CSV bar loading with a seeded synthetic fallback for development
//! - Parallel runs of independent strategy instances over shared bars
//! - JSON and CSV export of emitted actions

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{RunConfig, RunSection};
pub use data_loader::{
    dataset_hash, load_csv_bars, load_run_bars, synthetic_bars, CsvFeed, LoadedBars,
};
pub use export::{
    export_actions_csv, export_json, export_summary_csv, import_json, load_artifacts,
    save_artifacts,
};
pub use runner::{run_from_config, run_strategies, RunError, StrategyRunResult, SCHEMA_VERSION};
