//! Tri-state sub-condition results and division-safe percentage helpers.
//!
//! A sub-condition whose inputs are missing (warmup, zero denominator) is
//! `Undefined` rather than an error. `Undefined` never triggers an action.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Met,
    NotMet,
    Undefined,
}

impl Condition {
    pub fn from_bool(b: bool) -> Self {
        if b {
            Condition::Met
        } else {
            Condition::NotMet
        }
    }

    /// `None` → `Undefined`.
    pub fn from_option(value: Option<bool>) -> Self {
        value.map_or(Condition::Undefined, Condition::from_bool)
    }

    /// Conjunction. Any `NotMet` wins, then any `Undefined`.
    pub fn all(conditions: &[Condition]) -> Self {
        if conditions.contains(&Condition::NotMet) {
            Condition::NotMet
        } else if conditions.contains(&Condition::Undefined) {
            Condition::Undefined
        } else {
            Condition::Met
        }
    }

    /// Collapse to a trigger decision: only `Met` holds.
    pub fn holds(self) -> bool {
        self == Condition::Met
    }
}

impl From<Option<bool>> for Condition {
    fn from(value: Option<bool>) -> Self {
        Condition::from_option(value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Met => write!(f, "met"),
            Condition::NotMet => write!(f, "not_met"),
            Condition::Undefined => write!(f, "undefined"),
        }
    }
}

/// `(value - base) / base * 100`.
///
/// `None` unless `base > 0` and both inputs are finite.
pub fn pct_change(base: f64, value: f64) -> Option<f64> {
    if !base.is_finite() || !value.is_finite() || base <= 0.0 {
        return None;
    }
    Some((value - base) / base * 100.0)
}

/// A finite price or volume as `Some`, anything else as `None`.
pub fn defined(value: f64) -> Option<f64> {
    Some(value).filter(|v| v.is_finite())
}

/// `value > base * factor`, undefined unless `base > 0`.
pub fn exceeds_multiple(value: f64, base: Option<f64>, factor: f64) -> Condition {
    match (defined(value), base) {
        (Some(v), Some(b)) if b > 0.0 => Condition::from_bool(v > b * factor),
        _ => Condition::Undefined,
    }
}

/// `a > b` when both are defined.
pub fn gt(a: Option<f64>, b: Option<f64>) -> Condition {
    Condition::from_option(a.zip(b).map(|(a, b)| a > b))
}

/// `a < b` when both are defined.
pub fn lt(a: Option<f64>, b: Option<f64>) -> Condition {
    Condition::from_option(a.zip(b).map(|(a, b)| a < b))
}
