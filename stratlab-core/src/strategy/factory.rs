//! Factory: converts a `RulesConfig` into a runtime rules object, and
//! resolves which indicators a set of strategies needs precomputed.

use std::collections::HashSet;

use crate::components::indicator::Indicator;

use super::config::{ConfigError, RulesConfig};
use super::{
    BreakoutRules, EnhancedRules, FibonacciRules, MaCrossoverRules, MovingAverageRules,
    StrategyRules,
};

/// Validate `config` and build the matching rules object.
pub fn build_rules(config: &RulesConfig) -> Result<Box<dyn StrategyRules>, ConfigError> {
    config.validate()?;
    let rules: Box<dyn StrategyRules> = match config {
        RulesConfig::MovingAverage(p) => Box::new(MovingAverageRules::new(p.clone())),
        RulesConfig::MaCrossover(p) => Box::new(MaCrossoverRules::new(p.clone())),
        RulesConfig::Enhanced(p) => Box::new(EnhancedRules::new(p.clone())),
        RulesConfig::Fibonacci(p) => Box::new(FibonacciRules::new(p.clone())),
        RulesConfig::Breakout(p) => Box::new(BreakoutRules::new(p.clone())),
    };
    Ok(rules)
}

/// Union of the indicators every config needs, de-duplicated by name.
pub fn required_indicators(
    configs: &[RulesConfig],
) -> Result<Vec<Box<dyn Indicator>>, ConfigError> {
    let mut seen = HashSet::new();
    let mut out: Vec<Box<dyn Indicator>> = Vec::new();
    for config in configs {
        for indicator in build_rules(config)?.required_indicators() {
            if seen.insert(indicator.name().to_string()) {
                out.push(indicator);
            }
        }
    }
    Ok(out)
}
