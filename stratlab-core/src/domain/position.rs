//! Position tracker: per-strategy state carried across bars.
//!
//! Invariants:
//! - `entry_price` and `trailing_stop` are only defined while open.
//! - `bars_held` is 0 right after `open()` and grows by exactly one per
//!   `tick()`.
//! - The trailing stop ratchets: it may rise, never fall.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Contract violations on the position tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("position is already open")]
    AlreadyOpen,
    #[error("position is not open")]
    NotOpen,
    #[error("entry price must be finite, got {0}")]
    InvalidEntryPrice(String),
}

/// Long-only position state owned by exactly one strategy instance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionState {
    is_open: bool,
    entry_price: Option<f64>,
    bars_held: usize,
    trailing_stop: Option<f64>,
}

impl PositionState {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.entry_price
    }

    pub fn bars_held(&self) -> usize {
        self.bars_held
    }

    pub fn trailing_stop(&self) -> Option<f64> {
        self.trailing_stop
    }

    /// Flat → open at `entry_price`.
    pub fn open(&mut self, entry_price: f64) -> Result<(), PositionError> {
        if self.is_open {
            return Err(PositionError::AlreadyOpen);
        }
        if !entry_price.is_finite() {
            return Err(PositionError::InvalidEntryPrice(entry_price.to_string()));
        }
        *self = Self {
            is_open: true,
            entry_price: Some(entry_price),
            bars_held: 0,
            trailing_stop: None,
        };
        Ok(())
    }

    /// Open → flat; every field back to its flat default.
    pub fn close(&mut self) -> Result<(), PositionError> {
        if !self.is_open {
            return Err(PositionError::NotOpen);
        }
        *self = Self::flat();
        Ok(())
    }

    /// Count one observed bar while open.
    pub fn tick(&mut self) -> Result<(), PositionError> {
        if !self.is_open {
            return Err(PositionError::NotOpen);
        }
        self.bars_held += 1;
        Ok(())
    }

    /// Offer a new trailing-stop level. Returns true if the stop moved.
    ///
    /// The stop becomes `max(current, candidate)`; a non-finite candidate is
    /// ignored.
    pub fn raise_trailing_stop(&mut self, candidate: f64) -> Result<bool, PositionError> {
        if !self.is_open {
            return Err(PositionError::NotOpen);
        }
        if !candidate.is_finite() {
            return Ok(false);
        }
        match self.trailing_stop {
            Some(current) if candidate <= current => Ok(false),
            _ => {
                self.trailing_stop = Some(candidate);
                Ok(true)
            }
        }
    }

    /// `(close - entry) / entry * 100`, or `None` without a positive entry.
    pub fn profit_pct(&self, close: f64) -> Option<f64> {
        crate::components::condition::pct_change(self.entry_price?, close)
    }
}
