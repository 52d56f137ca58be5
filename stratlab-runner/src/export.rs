//! Export of run results: JSON manifest and CSV action tape.
//!
//! Persisted JSON carries a `schema_version` per result. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::runner::{StrategyRunResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize run results to pretty JSON.
pub fn export_json(results: &[StrategyRunResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("failed to serialize run results to JSON")
}

/// Deserialize run results, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<Vec<StrategyRunResult>> {
    let results: Vec<StrategyRunResult> =
        serde_json::from_str(json).context("failed to deserialize run results from JSON")?;
    if let Some(newer) = results.iter().find(|r| r.schema_version > SCHEMA_VERSION) {
        bail!(
            "unsupported schema version {} (max supported: {})",
            newer.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(results)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per emitted action across all results, in result order.
///
/// Columns: strategy, kind, symbol, bar_index, date, action, reason,
/// reference_price
pub fn export_actions_csv(results: &[StrategyRunResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "strategy",
        "kind",
        "symbol",
        "bar_index",
        "date",
        "action",
        "reason",
        "reference_price",
    ])?;

    for result in results {
        for a in &result.actions {
            let row: [&str; 8] = [
                &result.name,
                result.kind.as_str(),
                &a.symbol,
                &a.bar_index.to_string(),
                &a.date.to_string(),
                &a.action.to_string(),
                &a.reason.to_string(),
                &format!("{:.4}", a.reference_price),
            ];
            wtr.write_record(row)?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Per-strategy summary table.
pub fn export_summary_csv(results: &[StrategyRunResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "strategy",
        "kind",
        "bars",
        "buys",
        "closes",
        "rejected",
        "failed_bars",
        "open_at_end",
    ])?;
    for r in results {
        let row: [&str; 8] = [
            &r.name,
            r.kind.as_str(),
            &r.bar_count.to_string(),
            &r.buys().to_string(),
            &r.closes().to_string(),
            &r.rejected.to_string(),
            &r.failed_bars.to_string(),
            &r.final_position.is_open().to_string(),
        ];
        wtr.write_record(row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one run.
///
/// Creates `{symbol}_{timestamp}/` under `output_dir` containing:
/// - `results.json`: every `StrategyRunResult`
/// - `actions.csv`: the emitted action tape
/// - `summary.csv`: one row per strategy
///
/// Returns the path to the created directory.
pub fn save_artifacts(results: &[StrategyRunResult], output_dir: &Path) -> Result<PathBuf> {
    let symbol = results.first().map_or("run", |r| r.symbol.as_str());
    let dirname = format!(
        "{}_{}",
        symbol,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("results.json"), export_json(results)?)?;
    std::fs::write(run_dir.join("actions.csv"), export_actions_csv(results)?)?;
    std::fs::write(run_dir.join("summary.csv"), export_summary_csv(results)?)?;

    Ok(run_dir)
}

/// Load results from an artifact directory's `results.json`.
pub fn load_artifacts(dir: &Path) -> Result<Vec<StrategyRunResult>> {
    let path = dir.join("results.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
