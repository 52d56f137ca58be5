//! Bar feeds.

pub mod provider;

pub use provider::{filter_range, BarFeed, DataError, InMemoryFeed};
