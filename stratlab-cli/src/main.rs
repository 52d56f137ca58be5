//! StratLab CLI: run, validate and defaults commands.
//!
//! Commands:
//! - `run`: run every strategy in a TOML run file over CSV or synthetic bars
//! - `validate`: parse and validate a run file without loading data
//! - `defaults`: print default parameters for one or all strategy variants

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use stratlab_core::strategy::{StrategyConfig, StrategyKind};
use stratlab_runner::{run_from_config, save_artifacts, RunConfig, StrategyRunResult};

#[derive(Parser)]
#[command(
    name = "stratlab",
    about = "StratLab CLI: bar-by-bar trading strategy engine"
)]
struct Cli {
    /// Log per-bar decisions (debug level). RUST_LOG overrides.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every strategy in a run file.
    Run {
        /// Path to a TOML run file.
        #[arg(long)]
        config: PathBuf,

        /// CSV bars, overriding the run file's data source.
        #[arg(long, conflicts_with = "synthetic")]
        data: Option<PathBuf>,

        /// Use a seeded synthetic random walk instead of real bars.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Symbol, overriding the run file.
        #[arg(long)]
        symbol: Option<String>,

        /// Start date (YYYY-MM-DD), overriding the run file.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), overriding the run file.
        #[arg(long)]
        end: Option<String>,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Parse and validate a run file.
    Validate {
        /// Path to a TOML run file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Print default parameters as `[[strategy]]` TOML.
    Defaults {
        /// moving_average, ma_crossover, enhanced, fibonacci or breakout. All when omitted.
        kind: Option<String>,
    },
}

#[derive(Serialize)]
struct StrategyTables {
    strategy: Vec<StrategyConfig>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            data,
            synthetic,
            symbol,
            start,
            end,
            output_dir,
            no_save,
        } => {
            let mut run_config = RunConfig::from_file(&config)
                .with_context(|| format!("failed to load {}", config.display()))?;
            apply_overrides(&mut run_config, data, synthetic, symbol, start, end)?;
            run_cmd(&run_config, output_dir, no_save)
        }
        Commands::Validate { config } => validate_cmd(config),
        Commands::Defaults { kind } => defaults_cmd(kind.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_target(false)
        .init();
}

fn apply_overrides(
    config: &mut RunConfig,
    data: Option<PathBuf>,
    synthetic: bool,
    symbol: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<()> {
    if let Some(path) = data {
        config.run.data = Some(path);
        config.run.synthetic = false;
    }
    if synthetic {
        config.run.data = None;
        config.run.synthetic = true;
    }
    if let Some(symbol) = symbol {
        config.run.symbol = symbol;
    }
    if let Some(start) = start.as_deref() {
        config.run.start = Some(parse_date(start)?);
    }
    if let Some(end) = end.as_deref() {
        config.run.end = Some(parse_date(end)?);
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_cmd(config: &RunConfig, output_dir: PathBuf, no_save: bool) -> Result<()> {
    let (loaded, results) = run_from_config(config)?;
    if loaded.bars.is_empty() {
        println!("No bars for {} in the selected range; nothing to do.", config.run.symbol);
    }

    print_summary(&results);

    if !no_save {
        let run_dir = save_artifacts(&results, &output_dir)?;
        info!(dir = %run_dir.display(), "artifacts saved");
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn validate_cmd(path: PathBuf) -> Result<()> {
    let config = RunConfig::from_file(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    config.validate()?;
    println!(
        "{}: ok ({} strategies on {})",
        path.display(),
        config.strategies.len(),
        config.run.symbol
    );
    for s in &config.strategies {
        println!("  {:<24} {}", s.name, s.kind());
    }
    Ok(())
}

fn defaults_cmd(kind: Option<&str>) -> Result<()> {
    let kinds: Vec<StrategyKind> = match kind {
        Some(name) => vec![name.parse()?],
        None => StrategyKind::ALL.to_vec(),
    };
    let tables = StrategyTables {
        strategy: kinds.into_iter().map(StrategyConfig::default_for).collect(),
    };
    if tables.strategy.is_empty() {
        bail!("no strategy kinds selected");
    }
    print!("{}", toml::to_string_pretty(&tables)?);
    Ok(())
}

fn print_summary(results: &[StrategyRunResult]) {
    let Some(first) = results.first() else {
        return;
    };
    println!();
    println!("=== Run Result ===");
    println!("Symbol:   {}", first.symbol);
    match (first.start_date, first.end_date) {
        (Some(start), Some(end)) => println!("Period:   {start} to {end}"),
        _ => println!("Period:   (no bars)"),
    }
    println!("Bars:     {} ({} warmup)", first.bar_count, first.warmup_bars);
    println!("Dataset:  {}", first.dataset_hash);
    println!();
    println!(
        "{:<24} {:<15} {:>5} {:>6} {:>8} {:>7} {:>5}",
        "strategy", "kind", "buys", "closes", "rejected", "failed", "open"
    );
    for r in results {
        println!(
            "{:<24} {:<15} {:>5} {:>6} {:>8} {:>7} {:>5}",
            r.name,
            r.kind.as_str(),
            r.buys(),
            r.closes(),
            r.rejected,
            r.failed_bars,
            if r.final_position.is_open() { "yes" } else { "no" },
        );
    }
    if first.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
