//! Actions emitted by a strategy and the requests handed to the action sink.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-bar decision of a strategy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Close,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "buy"),
            Action::Close => write!(f, "close"),
            Action::Hold => write!(f, "hold"),
        }
    }
}

/// Retracement level that confirmed a Fibonacci entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FibLevel {
    Deep,
    Shallow,
}

/// Why an action was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Reason {
    // Entries
    MaTrend,
    GoldenCross,
    MultiIndicatorConfirmed,
    FibonacciRebound { level: FibLevel, ratio: f64 },
    LimitUpBreakout,
    // Exits
    StopLoss,
    TakeProfit,
    MaxHoldingPeriod,
    TrailingStop,
    DeathCross,
    PriceBelowMa,
    FibonacciTarget,
}

impl Reason {
    pub fn is_entry(&self) -> bool {
        matches!(
            self,
            Reason::MaTrend
                | Reason::GoldenCross
                | Reason::MultiIndicatorConfirmed
                | Reason::FibonacciRebound { .. }
                | Reason::LimitUpBreakout
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Reason::MaTrend => "ma_trend",
            Reason::GoldenCross => "golden_cross",
            Reason::MultiIndicatorConfirmed => "multi_indicator_confirmed",
            Reason::FibonacciRebound { .. } => "fibonacci_rebound",
            Reason::LimitUpBreakout => "limit_up_breakout",
            Reason::StopLoss => "stop_loss",
            Reason::TakeProfit => "take_profit",
            Reason::MaxHoldingPeriod => "max_holding_period",
            Reason::TrailingStop => "trailing_stop",
            Reason::DeathCross => "death_cross",
            Reason::PriceBelowMa => "price_below_ma",
            Reason::FibonacciTarget => "fibonacci_target",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::FibonacciRebound { ratio, .. } => write!(f, "fibonacci_rebound({ratio})"),
            other => f.write_str(other.label()),
        }
    }
}

/// A buy or close request handed to the action sink.
///
/// Never carries `Action::Hold`; construct through [`ActionRequest::buy`] or
/// [`ActionRequest::close`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub symbol: String,
    pub action: Action,
    pub reference_price: f64,
    pub reason: Reason,
}

impl ActionRequest {
    pub fn buy(
        bar_index: usize,
        date: NaiveDate,
        symbol: impl Into<String>,
        reference_price: f64,
        reason: Reason,
    ) -> Self {
        Self {
            bar_index,
            date,
            symbol: symbol.into(),
            action: Action::Buy,
            reference_price,
            reason,
        }
    }

    pub fn close(
        bar_index: usize,
        date: NaiveDate,
        symbol: impl Into<String>,
        reference_price: f64,
        reason: Reason,
    ) -> Self {
        Self {
            bar_index,
            date,
            symbol: symbol.into(),
            action: Action::Close,
            reference_price,
            reason,
        }
    }
}

/// Outcome of one `StrategyEngine::step`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    /// Present exactly when `action` is Buy or Close.
    pub request: Option<ActionRequest>,
}

impl Decision {
    pub fn hold() -> Self {
        Self {
            action: Action::Hold,
            request: None,
        }
    }

    pub fn emit(request: ActionRequest) -> Self {
        Self {
            action: request.action,
            request: Some(request),
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }
}
