//! MACD: EMA(fast) - EMA(slow) of close, plus an EMA(signal) of that line.
//!
//! Exposed as two named series: `macd_line_{f}_{s}_{g}` and
//! `macd_signal_{f}_{s}_{g}`.

use super::ema::ema_of_series;
use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdBand {
    Line,
    Signal,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    band: MacdBand,
    name: String,
}

impl Macd {
    pub fn line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdBand::Line)
    }

    pub fn signal(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdBand::Signal)
    }

    fn new(fast: usize, slow: usize, signal: usize, band: MacdBand) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be < slow period");
        Self {
            fast,
            slow,
            signal,
            band,
            name: Self::key(fast, slow, signal, band),
        }
    }

    pub fn key(fast: usize, slow: usize, signal: usize, band: MacdBand) -> String {
        match band {
            MacdBand::Line => format!("macd_line_{fast}_{slow}_{signal}"),
            MacdBand::Signal => format!("macd_signal_{fast}_{slow}_{signal}"),
        }
    }

    fn macd_line(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.band {
            MacdBand::Line => self.slow - 1,
            MacdBand::Signal => self.slow + self.signal - 2,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let line = self.macd_line(bars);
        match self.band {
            MacdBand::Line => line,
            MacdBand::Signal => ema_of_series(&line, self.signal),
        }
    }
}
