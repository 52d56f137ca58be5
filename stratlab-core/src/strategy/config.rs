//! Strategy configuration: per-variant parameter sets with reference defaults.
//!
//! Parsed from TOML. Every key is optional and falls back to the default;
//! unknown keys are rejected. `validate()` checks each parameter's domain and
//! is called by `StrategyEngine::new`, so an engine never holds an invalid
//! configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::StrategyKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter `{param}`: {reason}")]
    InvalidParam { param: &'static str, reason: String },

    #[error("strategy name must not be empty")]
    EmptyName,

    #[error("unknown strategy kind '{0}'")]
    UnknownKind(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

fn invalid(param: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParam {
        param,
        reason: reason.into(),
    }
}

fn require_period(param: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(param, "must be >= 1"));
    }
    Ok(())
}

fn require_positive(param: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(param, format!("must be a finite number > 0, got {value}")));
    }
    Ok(())
}

fn require_fast_below_slow(fast: usize, slow: usize) -> Result<(), ConfigError> {
    if fast >= slow {
        return Err(invalid(
            "slow_period",
            format!("must be greater than fast period ({fast} >= {slow})"),
        ));
    }
    Ok(())
}

// ─── Top-level ───────────────────────────────────────────────────────

fn default_log_actions() -> bool {
    true
}

/// One named strategy instance: a variant plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    pub name: String,
    /// Emit an `info` event for every buy/close this strategy produces.
    #[serde(default = "default_log_actions")]
    pub log_actions: bool,
    pub rules: RulesConfig,
}

impl StrategyConfig {
    pub fn new(name: impl Into<String>, rules: RulesConfig) -> Self {
        Self {
            name: name.into(),
            log_actions: default_log_actions(),
            rules,
        }
    }

    /// Default configuration for a variant, named after it.
    pub fn default_for(kind: StrategyKind) -> Self {
        Self::new(kind.as_str(), RulesConfig::default_for(kind))
    }

    pub fn kind(&self) -> StrategyKind {
        self.rules.kind()
    }

    /// Parse a single strategy table (`name`, `log_actions`, `[rules]`).
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        self.rules.validate()
    }
}

/// Variant-specific parameters, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RulesConfig {
    MovingAverage(MovingAverageParams),
    MaCrossover(MaCrossoverParams),
    Enhanced(EnhancedParams),
    Fibonacci(FibonacciParams),
    Breakout(BreakoutParams),
}

impl RulesConfig {
    pub fn default_for(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::MovingAverage => RulesConfig::MovingAverage(Default::default()),
            StrategyKind::MaCrossover => RulesConfig::MaCrossover(Default::default()),
            StrategyKind::Enhanced => RulesConfig::Enhanced(Default::default()),
            StrategyKind::Fibonacci => RulesConfig::Fibonacci(Default::default()),
            StrategyKind::Breakout => RulesConfig::Breakout(Default::default()),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            RulesConfig::MovingAverage(_) => StrategyKind::MovingAverage,
            RulesConfig::MaCrossover(_) => StrategyKind::MaCrossover,
            RulesConfig::Enhanced(_) => StrategyKind::Enhanced,
            RulesConfig::Fibonacci(_) => StrategyKind::Fibonacci,
            RulesConfig::Breakout(_) => StrategyKind::Breakout,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            RulesConfig::MovingAverage(p) => p.validate(),
            RulesConfig::MaCrossover(p) => p.validate(),
            RulesConfig::Enhanced(p) => p.validate(),
            RulesConfig::Fibonacci(p) => p.validate(),
            RulesConfig::Breakout(p) => p.validate(),
        }
    }
}

// ─── Moving average ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovingAverageParams {
    pub period: usize,
    pub stop_loss_pct: f64,
}

impl Default for MovingAverageParams {
    fn default() -> Self {
        Self {
            period: 15,
            stop_loss_pct: 5.0,
        }
    }
}

impl MovingAverageParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_period("period", self.period)?;
        require_positive("stop_loss_pct", self.stop_loss_pct)
    }
}

// ─── MA crossover ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaCrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub stop_loss_pct: f64,
}

impl Default for MaCrossoverParams {
    fn default() -> Self {
        Self {
            fast_period: 5,
            slow_period: 20,
            stop_loss_pct: 5.0,
        }
    }
}

impl MaCrossoverParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_period("fast_period", self.fast_period)?;
        require_period("slow_period", self.slow_period)?;
        require_fast_below_slow(self.fast_period, self.slow_period)?;
        require_positive("stop_loss_pct", self.stop_loss_pct)
    }
}

// ─── Enhanced ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnhancedParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub rsi_upper: f64,
    pub rsi_lower: f64,
    pub atr_period: usize,
    pub atr_multiplier: f64,
    pub volume_factor: f64,
    pub volume_period: usize,
}

impl Default for EnhancedParams {
    fn default() -> Self {
        Self {
            fast_period: 5,
            slow_period: 20,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            rsi_upper: 70.0,
            rsi_lower: 30.0,
            atr_period: 14,
            atr_multiplier: 2.0,
            volume_factor: 2.0,
            volume_period: 20,
        }
    }
}

impl EnhancedParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_period("fast_period", self.fast_period)?;
        require_period("slow_period", self.slow_period)?;
        require_fast_below_slow(self.fast_period, self.slow_period)?;
        require_period("macd_fast", self.macd_fast)?;
        require_period("macd_signal", self.macd_signal)?;
        if self.macd_fast >= self.macd_slow {
            return Err(invalid("macd_slow", "must be greater than macd_fast"));
        }
        require_period("rsi_period", self.rsi_period)?;
        for (param, value) in [("rsi_upper", self.rsi_upper), ("rsi_lower", self.rsi_lower)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(param, format!("must be within 0..=100, got {value}")));
            }
        }
        if self.rsi_lower >= self.rsi_upper {
            return Err(invalid("rsi_lower", "must be below rsi_upper"));
        }
        require_period("atr_period", self.atr_period)?;
        require_positive("atr_multiplier", self.atr_multiplier)?;
        require_positive("volume_factor", self.volume_factor)?;
        require_period("volume_period", self.volume_period)
    }
}

// ─── Fibonacci ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FibonacciParams {
    /// Window for the swing high / swing low.
    pub period: usize,
    /// Profit-taking level.
    pub target_ratio: f64,
    pub shallow_ratio: f64,
    pub deep_ratio: f64,
    /// Half-width of the entry band around a level, in percent.
    pub tolerance_pct: f64,
    pub atr_period: usize,
    pub atr_multiplier: f64,
}

impl Default for FibonacciParams {
    fn default() -> Self {
        Self {
            period: 20,
            target_ratio: 0.236,
            shallow_ratio: 0.382,
            deep_ratio: 0.618,
            tolerance_pct: 1.0,
            atr_period: 14,
            atr_multiplier: 2.0,
        }
    }
}

impl FibonacciParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_period("period", self.period)?;
        let ratios = [
            ("target_ratio", self.target_ratio),
            ("shallow_ratio", self.shallow_ratio),
            ("deep_ratio", self.deep_ratio),
        ];
        for (param, value) in ratios {
            if !(value > 0.0 && value < 1.0) {
                return Err(invalid(param, format!("must be within (0, 1), got {value}")));
            }
        }
        if !(self.target_ratio < self.shallow_ratio && self.shallow_ratio < self.deep_ratio) {
            return Err(invalid(
                "deep_ratio",
                "ratios must be strictly ascending: target < shallow < deep",
            ));
        }
        if !self.tolerance_pct.is_finite() || self.tolerance_pct < 0.0 {
            return Err(invalid("tolerance_pct", "must be a finite number >= 0"));
        }
        require_period("atr_period", self.atr_period)?;
        require_positive("atr_multiplier", self.atr_multiplier)
    }
}

// ─── Breakout ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakoutParams {
    /// Minimum open-to-close rise, in percent, to count as limit-up.
    pub limit_up_pct: f64,
    pub volume_ratio: f64,
    pub volume_period: usize,
    /// Minimum close-over-close rise, in percent.
    pub price_up_pct: f64,
    pub price_ma_period: usize,
    pub max_hold_days: usize,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl Default for BreakoutParams {
    fn default() -> Self {
        Self {
            limit_up_pct: 9.8,
            volume_ratio: 2.0,
            volume_period: 5,
            price_up_pct: 5.0,
            price_ma_period: 5,
            max_hold_days: 3,
            stop_loss_pct: 5.0,
            take_profit_pct: 7.0,
        }
    }
}

impl BreakoutParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("limit_up_pct", self.limit_up_pct)?;
        require_positive("volume_ratio", self.volume_ratio)?;
        require_period("volume_period", self.volume_period)?;
        require_positive("price_up_pct", self.price_up_pct)?;
        require_period("price_ma_period", self.price_ma_period)?;
        require_period("max_hold_days", self.max_hold_days)?;
        require_positive("stop_loss_pct", self.stop_loss_pct)?;
        require_positive("take_profit_pct", self.take_profit_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_for_every_kind() {
        for kind in StrategyKind::ALL {
            let config = StrategyConfig::default_for(kind);
            config.validate().unwrap();
            assert_eq!(config.kind(), kind);
        }
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = StrategyConfig::from_toml(
            r#"
            name = "breakout-a"
            [rules]
            type = "breakout"
            max_hold_days = 5
            "#,
        )
        .unwrap();
        let RulesConfig::Breakout(p) = &config.rules else {
            panic!("expected breakout rules");
        };
        assert_eq!(p.max_hold_days, 5);
        assert_eq!(p.stop_loss_pct, 5.0);
        assert_eq!(p.limit_up_pct, 9.8);
        assert!(config.log_actions);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = StrategyConfig::from_toml(
            r#"
            name = "ma"
            [rules]
            type = "moving_average"
            perod = 10
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn negative_max_hold_fails_at_parse() {
        let err = StrategyConfig::from_toml(
            r#"
            name = "b"
            [rules]
            type = "breakout"
            max_hold_days = -1
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_max_hold_fails_validation() {
        let rules = RulesConfig::Breakout(BreakoutParams {
            max_hold_days: 0,
            ..Default::default()
        });
        let err = StrategyConfig::new("b", rules).validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParam {
                param: "max_hold_days",
                ..
            }
        ));
    }

    #[test]
    fn fast_must_be_below_slow() {
        let p = MaCrossoverParams {
            fast_period: 20,
            slow_period: 20,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn fibonacci_ratios_must_ascend() {
        let p = FibonacciParams {
            shallow_ratio: 0.7,
            ..Default::default()
        };
        assert!(p.validate().is_err());
        let p = FibonacciParams {
            deep_ratio: 1.2,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn enhanced_rsi_bounds() {
        let p = EnhancedParams {
            rsi_lower: 80.0,
            ..Default::default()
        };
        assert!(p.validate().is_err());
        let p = EnhancedParams {
            atr_multiplier: f64::NAN,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn empty_name_rejected() {
        let config = StrategyConfig::new("  ", RulesConfig::default_for(StrategyKind::Enhanced));
        assert!(matches!(config.validate(), Err(ConfigError::EmptyName)));
    }

    #[test]
    fn rendered_defaults_parse_back() {
        for kind in StrategyKind::ALL {
            let config = StrategyConfig::default_for(kind);
            let text = config.to_toml().unwrap();
            assert_eq!(StrategyConfig::from_toml(&text).unwrap(), config);
        }
    }
}
