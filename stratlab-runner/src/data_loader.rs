//! Bar loading for the runner.
//!
//! Two sources:
//! 1. A CSV file with header `date,open,high,low,close,volume` and an
//!    optional `symbol` column
//! 2. A seeded random walk (`--synthetic`), a developer-only mode whose
//!    results are tagged as synthetic
//!
//! Either way the returned bars are strictly increasing in date and limited
//! to the configured range.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{info, warn};

use stratlab_core::data::{filter_range, BarFeed, DataError, InMemoryFeed};
use stratlab_core::domain::{first_out_of_order, Bar};

use crate::config::RunSection;

/// Bars ready for a run, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    /// BLAKE3 over every bar field, in order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

impl LoadedBars {
    pub fn new(bars: Vec<Bar>, has_synthetic: bool) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            bars,
            dataset_hash,
            has_synthetic,
        }
    }
}

/// Resolve the `[run]` table's data source through a [`BarFeed`].
pub fn load_run_bars(run: &RunSection) -> Result<LoadedBars, DataError> {
    if let Some(path) = &run.data {
        let feed = CsvFeed::new(path);
        let bars = feed.bars(&run.symbol, run.start, run.end)?;
        info!(symbol = %run.symbol, path = %path.display(), bars = bars.len(), "loaded bars");
        return Ok(LoadedBars::new(bars, false));
    }
    warn!(symbol = %run.symbol, "generating synthetic bars; results will be tagged as synthetic");
    let mut feed = InMemoryFeed::new();
    feed.insert(
        run.symbol.clone(),
        synthetic_bars(&run.symbol, run.synthetic_bars, run.seed),
    )?;
    let bars = feed.bars(&run.symbol, run.start, run.end)?;
    Ok(LoadedBars::new(bars, true))
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    symbol: Option<String>,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Read daily bars for `symbol` from a CSV file.
///
/// Rows for other symbols are skipped when the file has a `symbol` column;
/// a file with no rows for `symbol` yields no bars. Rows must be strictly
/// increasing in date and have a consistent OHLC range (void rows with NaN
/// prices pass through). Rows outside `start..=end` are dropped.
pub fn load_csv_bars(
    path: &Path,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<Bar>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut bars = Vec::new();
    let mut saw_symbol_column = false;
    for (row_no, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = record.map_err(|e| DataError::Malformed(format!("row {}: {e}", row_no + 1)))?;
        if let Some(row_symbol) = &row.symbol {
            saw_symbol_column = true;
            if row_symbol != symbol {
                continue;
            }
        }
        if !(row.volume.is_finite() && row.volume >= 0.0) {
            return Err(DataError::Malformed(format!(
                "row {}: volume {} is not a non-negative number",
                row_no + 1,
                row.volume
            )));
        }
        let bar = Bar {
            symbol: symbol.to_string(),
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.round() as u64,
        };
        if !bar.is_void() && !bar.is_sane() {
            return Err(DataError::Malformed(format!(
                "row {}: inconsistent prices (open {}, high {}, low {}, close {})",
                row_no + 1,
                bar.open,
                bar.high,
                bar.low,
                bar.close
            )));
        }
        bars.push(bar);
    }

    if saw_symbol_column && bars.is_empty() {
        warn!(symbol, path = %path.display(), "no rows for symbol");
    }
    if let Some(index) = first_out_of_order(&bars) {
        return Err(DataError::OutOfOrder {
            symbol: symbol.to_string(),
            index,
        });
    }
    filter_range(bars, start, end)
}

/// [`BarFeed`] over a single CSV file.
#[derive(Debug, Clone)]
pub struct CsvFeed {
    path: PathBuf,
}

impl CsvFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BarFeed for CsvFeed {
    fn name(&self) -> &str {
        "csv"
    }

    fn bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, DataError> {
        load_csv_bars(&self.path, symbol, start, end)
    }
}

/// Deterministic BLAKE3 hash over all bar data.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.symbol.as_bytes());
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// `n` weekday bars of a seeded random walk starting 2020-01-02 at 100.0.
///
/// Roughly one bar in forty is a limit-up day on heavy volume so every
/// strategy variant has something to react to.
pub fn synthetic_bars(symbol: &str, n: usize, seed: u64) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0_f64;
    let mut current = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default();

    while bars.len() < n {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let surge = rng.gen_bool(0.025);
        let open = price;
        let (daily_return, volume) = if surge {
            (0.10, rng.gen_range(6_000_000..12_000_000u64))
        } else {
            (rng.gen_range(-0.03..0.03), rng.gen_range(500_000..3_000_000u64))
        };
        let close = (price * (1.0 + daily_return)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));

        bars.push(Bar {
            symbol: symbol.to_string(),
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const PLAIN: &str = "date,open,high,low,close,volume
2024-01-02,10.0,10.5,9.8,10.2,1000
2024-01-03,10.2,10.9,10.1,10.8,1500
2024-01-04,10.8,11.0,10.4,10.5,900
";

    #[test]
    fn loads_plain_csv() {
        let file = write_csv(PLAIN);
        let bars = load_csv_bars(file.path(), "TEST", None, None).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].symbol, "TEST");
        assert_eq!(bars[1].date, date(2024, 1, 3));
        assert_eq!(bars[1].close, 10.8);
        assert_eq!(bars[2].volume, 900);
    }

    #[test]
    fn range_drops_rows() {
        let file = write_csv(PLAIN);
        let bars =
            load_csv_bars(file.path(), "TEST", Some(date(2024, 1, 3)), Some(date(2024, 1, 3)))
                .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date(2024, 1, 3));
    }

    #[test]
    fn symbol_column_filters() {
        let file = write_csv(
            "symbol,date,open,high,low,close,volume
AAA,2024-01-02,1,1,1,1,10
BBB,2024-01-02,2,2,2,2,20
AAA,2024-01-03,1,1,1,1,10
",
        );
        let bars = load_csv_bars(file.path(), "BBB", None, None).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 2.0);

        let missing = load_csv_bars(file.path(), "CCC", None, None).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn out_of_order_rows_are_rejected() {
        let file = write_csv(
            "date,open,high,low,close,volume
2024-01-03,1,1,1,1,10
2024-01-02,1,1,1,1,10
",
        );
        let result = load_csv_bars(file.path(), "X", None, None);
        assert!(matches!(result, Err(DataError::OutOfOrder { index: 1, .. })));
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let file = write_csv(
            "date,open,high,low,close,volume
2024-01-02,1,1,1,1,10
2024-01-02,1,1,1,1,10
",
        );
        let result = load_csv_bars(file.path(), "X", None, None);
        assert!(matches!(result, Err(DataError::OutOfOrder { .. })));
    }

    #[test]
    fn malformed_row_reports_row_number() {
        let file = write_csv("date,open,high,low,close,volume\n2024-01-02,abc,1,1,1,10\n");
        match load_csv_bars(file.path(), "X", None, None) {
            Err(DataError::Malformed(msg)) => assert!(msg.starts_with("row 1")),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn negative_volume_is_rejected() {
        let file = write_csv("date,open,high,low,close,volume\n2024-01-02,1,1,1,1,-5\n");
        assert!(matches!(
            load_csv_bars(file.path(), "X", None, None),
            Err(DataError::Malformed(_))
        ));
    }

    #[test]
    fn inverted_high_low_is_rejected() {
        let file = write_csv("date,open,high,low,close,volume\n2024-01-02,10,9,11,10,100\n");
        match load_csv_bars(file.path(), "X", None, None) {
            Err(DataError::Malformed(msg)) => assert!(msg.starts_with("row 1")),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_close_is_rejected() {
        let file = write_csv(
            "date,open,high,low,close,volume
2024-01-02,1,1,1,1,10
2024-01-03,1,1,0,0,10
",
        );
        match load_csv_bars(file.path(), "X", None, None) {
            Err(DataError::Malformed(msg)) => assert!(msg.starts_with("row 2")),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn void_rows_pass_through() {
        let file = write_csv(
            "date,open,high,low,close,volume
2024-01-02,1,1,1,1,10
2024-01-03,NaN,NaN,NaN,NaN,0
",
        );
        let bars = load_csv_bars(file.path(), "X", None, None).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[1].is_void());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_csv_bars(Path::new("/nonexistent/bars.csv"), "X", None, None);
        assert!(matches!(result, Err(DataError::Io { .. })));
    }

    #[test]
    fn header_only_file_is_empty() {
        let file = write_csv("date,open,high,low,close,volume\n");
        assert!(load_csv_bars(file.path(), "X", None, None).unwrap().is_empty());
    }

    #[test]
    fn csv_feed_delegates() {
        let file = write_csv(PLAIN);
        let feed = CsvFeed::new(file.path());
        assert_eq!(feed.name(), "csv");
        assert_eq!(feed.bars("TEST", None, None).unwrap().len(), 3);
    }

    #[test]
    fn synthetic_is_deterministic_and_ordered() {
        let a = synthetic_bars("SYN", 300, 7);
        let b = synthetic_bars("SYN", 300, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 300);
        assert!(first_out_of_order(&a).is_none());
        assert!(a.iter().all(|bar| bar.is_sane()));
        assert!(a
            .iter()
            .all(|bar| !matches!(bar.date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)));
        assert_ne!(a, synthetic_bars("SYN", 300, 8));
    }

    #[test]
    fn dataset_hash_tracks_content() {
        let bars = synthetic_bars("SYN", 50, 1);
        let mut changed = bars.clone();
        changed[10].close += 0.01;
        assert_eq!(dataset_hash(&bars), dataset_hash(&bars.clone()));
        assert_ne!(dataset_hash(&bars), dataset_hash(&changed));
        assert_eq!(dataset_hash(&bars).len(), 64);
    }

    proptest::proptest! {
        #[test]
        fn synthetic_bars_are_always_usable(n in 1usize..400, seed in proptest::prelude::any::<u64>()) {
            let bars = synthetic_bars("SYN", n, seed);
            proptest::prop_assert_eq!(bars.len(), n);
            proptest::prop_assert!(first_out_of_order(&bars).is_none());
            proptest::prop_assert!(bars.iter().all(|b| b.is_sane()));
        }
    }

    #[test]
    fn run_section_resolves_synthetic() {
        let mut run = RunSection::new("SYN");
        run.synthetic = true;
        run.synthetic_bars = 120;
        let loaded = load_run_bars(&run).unwrap();
        assert!(loaded.has_synthetic);
        assert_eq!(loaded.bars.len(), 120);
        assert_eq!(loaded.dataset_hash, dataset_hash(&loaded.bars));
    }

    #[test]
    fn run_section_resolves_csv_for_absent_symbol() {
        let file = write_csv(
            "symbol,date,open,high,low,close,volume
000001,2024-01-02,1,1,1,1,10
",
        );
        let mut run = RunSection::new("600519");
        run.data = Some(file.path().to_path_buf());
        let loaded = load_run_bars(&run).unwrap();
        assert!(loaded.bars.is_empty());
        assert!(!loaded.has_synthetic);
    }
}
