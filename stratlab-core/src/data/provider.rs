//! Bar feed trait and structured data errors.
//!
//! The feed abstracts over data sources (CSV files, in-memory fixtures) so
//! the driver can be handed any of them. An empty result is valid: the feed
//! had nothing for that symbol and range, and the engine emits no actions.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::domain::{first_out_of_order, Bar};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("bars for {symbol} are not strictly increasing in date at row {index}")]
    OutOfOrder { symbol: String, index: usize },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed bar data: {0}")]
    Malformed(String),
}

/// Source of ordered daily bars.
pub trait BarFeed: Send + Sync {
    fn name(&self) -> &str;

    /// Bars for `symbol` with `start <= date <= end` (either bound optional),
    /// strictly increasing in date.
    fn bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, DataError>;
}

/// Keep bars inside an optional inclusive date range.
pub fn filter_range(
    bars: impl IntoIterator<Item = Bar>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<Bar>, DataError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(DataError::InvalidRange { start, end });
        }
    }
    Ok(bars
        .into_iter()
        .filter(|b| start.map_or(true, |s| b.date >= s) && end.map_or(true, |e| b.date <= e))
        .collect())
}

/// Feed over bars already held in memory, one series per symbol.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeed {
    series: Vec<(String, Vec<Bar>)>,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series. Rejects bars that are not strictly date-ordered.
    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Result<(), DataError> {
        let symbol = symbol.into();
        if let Some(index) = first_out_of_order(&bars) {
            return Err(DataError::OutOfOrder { symbol, index });
        }
        self.series.retain(|(s, _)| *s != symbol);
        self.series.push((symbol, bars));
        Ok(())
    }
}

impl BarFeed for InMemoryFeed {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, DataError> {
        let bars = match self.series.iter().find(|(s, _)| s == symbol) {
            Some((_, bars)) => bars.as_slice(),
            None => {
                warn!(feed = self.name(), symbol, "no bars for symbol");
                &[]
            }
        };
        filter_range(bars.iter().cloned(), start, end)
    }
}
