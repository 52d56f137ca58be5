//! Serializable run configuration.
//!
//! A run file has one `[run]` table and one or more `[[strategy]]` tables:
//!
//! ```toml
//! [run]
//! symbol = "600519"
//! data = "bars.csv"
//! start = "2023-01-01"
//! settlement = { after_bars = 2 }
//!
//! [[strategy]]
//! name = "ma15"
//! [strategy.rules]
//! type = "moving_average"
//! period = 15
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stratlab_core::engine::SettlementPolicy;
use stratlab_core::strategy::{RulesConfig, StrategyConfig};

use crate::runner::RunError;

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run: RunSection,

    #[serde(rename = "strategy", default)]
    pub strategies: Vec<StrategyConfig>,
}

/// The `[run]` table: what to run the strategies over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    pub symbol: String,

    /// CSV file of daily bars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,

    /// Generate a seeded random walk instead of reading bars.
    #[serde(default)]
    pub synthetic: bool,

    #[serde(default = "default_synthetic_bars")]
    pub synthetic_bars: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Inclusive date range; either bound optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,

    #[serde(default)]
    pub settlement: SettlementPolicy,
}

fn default_synthetic_bars() -> usize {
    500
}

fn default_seed() -> u64 {
    42
}

impl RunSection {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            data: None,
            synthetic: false,
            synthetic_bars: default_synthetic_bars(),
            seed: default_seed(),
            start: None,
            end: None,
            settlement: SettlementPolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn new(run: RunSection, strategies: Vec<StrategyConfig>) -> Self {
        Self { run, strategies }
    }

    pub fn from_toml(s: &str) -> Result<Self, RunError> {
        toml::from_str(s).map_err(RunError::Parse)
    }

    pub fn from_file(path: &Path) -> Result<Self, RunError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, RunError> {
        toml::to_string_pretty(self).map_err(RunError::Render)
    }

    /// Rules of every configured strategy, in file order.
    pub fn rules(&self) -> Vec<RulesConfig> {
        self.strategies.iter().map(|s| s.rules.clone()).collect()
    }

    /// Check the whole file before anything is loaded or run.
    pub fn validate(&self) -> Result<(), RunError> {
        let run = &self.run;
        if run.symbol.trim().is_empty() {
            return Err(RunError::EmptySymbol);
        }
        match (&run.data, run.synthetic) {
            (Some(_), true) => return Err(RunError::ConflictingDataSources),
            (None, false) => return Err(RunError::NoDataSource),
            (None, true) if run.synthetic_bars == 0 => {
                return Err(RunError::InvalidRun("synthetic_bars must be >= 1".into()))
            }
            _ => {}
        }
        if let (Some(start), Some(end)) = (run.start, run.end) {
            if start > end {
                return Err(RunError::InvalidRun(format!(
                    "start {start} is after end {end}"
                )));
            }
        }
        if let SettlementPolicy::AfterBars(0) = run.settlement {
            return Err(RunError::InvalidRun("settlement after_bars must be >= 1".into()));
        }

        if self.strategies.is_empty() {
            return Err(RunError::NoStrategies);
        }
        let mut names = HashSet::new();
        for strategy in &self.strategies {
            strategy.validate()?;
            if !names.insert(strategy.name.as_str()) {
                return Err(RunError::DuplicateStrategy(strategy.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratlab_core::strategy::StrategyKind;

    const SAMPLE: &str = r#"
[run]
symbol = "600519"
data = "bars.csv"
start = "2023-01-01"
end = "2023-12-31"
settlement = { after_bars = 2 }

[[strategy]]
name = "ma15"
[strategy.rules]
type = "moving_average"

[[strategy]]
name = "breakout"
log_actions = false
[strategy.rules]
type = "breakout"
max_hold_days = 5
"#;

    #[test]
    fn parses_run_file() {
        let config = RunConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.run.symbol, "600519");
        assert_eq!(config.run.data.as_deref(), Some(Path::new("bars.csv")));
        assert_eq!(config.run.settlement, SettlementPolicy::AfterBars(2));
        assert_eq!(config.run.start, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(config.strategies.len(), 2);
        assert_eq!(config.strategies[0].kind(), StrategyKind::MovingAverage);
        assert!(!config.strategies[1].log_actions);
        config.validate().unwrap();
    }

    #[test]
    fn defaults_apply() {
        let config = RunConfig::from_toml(
            "[run]\nsymbol = \"X\"\nsynthetic = true\n\n[[strategy]]\nname = \"a\"\n[strategy.rules]\ntype = \"enhanced\"\n",
        )
        .unwrap();
        assert_eq!(config.run.settlement, SettlementPolicy::NextBar);
        assert_eq!(config.run.synthetic_bars, 500);
        assert_eq!(config.run.seed, 42);
        assert!(config.strategies[0].log_actions);
        config.validate().unwrap();
    }

    #[test]
    fn toml_roundtrip() {
        let config = RunConfig::from_toml(SAMPLE).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(RunConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let text = SAMPLE.replace("symbol = \"600519\"", "symbol = \"600519\"\ncash = 10000");
        assert!(matches!(RunConfig::from_toml(&text), Err(RunError::Parse(_))));
    }

    #[test]
    fn data_source_must_be_unambiguous() {
        let mut config = RunConfig::from_toml(SAMPLE).unwrap();
        config.run.synthetic = true;
        assert!(matches!(config.validate(), Err(RunError::ConflictingDataSources)));
        config.run.synthetic = false;
        config.run.data = None;
        assert!(matches!(config.validate(), Err(RunError::NoDataSource)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut config = RunConfig::from_toml(SAMPLE).unwrap();
        config.strategies[1].name = "ma15".into();
        assert!(matches!(
            config.validate(),
            Err(RunError::DuplicateStrategy(name)) if name == "ma15"
        ));
    }

    #[test]
    fn invalid_rule_params_surface_as_config_error() {
        let text = SAMPLE.replace("max_hold_days = 5", "max_hold_days = 0");
        let config = RunConfig::from_toml(&text).unwrap();
        assert!(matches!(config.validate(), Err(RunError::Config(_))));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let mut config = RunConfig::from_toml(SAMPLE).unwrap();
        config.run.start = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(matches!(config.validate(), Err(RunError::InvalidRun(_))));
    }

    #[test]
    fn zero_settlement_delay_is_rejected() {
        let text = SAMPLE.replace("after_bars = 2", "after_bars = 0");
        let config = RunConfig::from_toml(&text).unwrap();
        assert!(matches!(config.validate(), Err(RunError::InvalidRun(_))));
    }

    #[test]
    fn empty_strategy_list_is_rejected() {
        let mut config = RunConfig::from_toml(SAMPLE).unwrap();
        config.strategies.clear();
        assert!(matches!(config.validate(), Err(RunError::NoStrategies)));
    }
}
