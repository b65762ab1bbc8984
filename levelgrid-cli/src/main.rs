//! LevelGrid CLI: analyze, preview and paper-trade grid configurations.
//!
//! Commands:
//! - `analyze`: detect support/resistance and print the composed grid
//! - `preview`: dry-run one or more configs in parallel and print their plans
//! - `paper`: start then stop a bot against the in-memory paper venue
//!
//! Candles come from a CSV file (`--csv`) or a deterministic synthetic walk
//! (`--synthetic`).

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use levelgrid_bot::{
    load_candles, preview_all, BotConfig, GridBot, LoadOptions, Preview, StartReport, StopReport,
};
use levelgrid_core::analysis::LevelAnalysis;
use levelgrid_core::domain::{GridLevelSet, PriceLevel};
use levelgrid_core::exchange::PaperExchange;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "levelgrid",
    about = "LevelGrid CLI: support/resistance aware grid trading"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// CSV file with timestamp,open,high,low,close,volume rows.
    #[arg(long, conflicts_with = "synthetic")]
    csv: Option<PathBuf>,

    /// Generate deterministic synthetic candles instead of reading a file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Number of synthetic candles.
    #[arg(long, default_value_t = 288)]
    count: usize,

    /// Free balance credited to the paper account, in the config's currency.
    #[arg(long, default_value_t = 10_000.0)]
    balance: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect levels and print the composed grid for one config.
    Analyze {
        /// Path to a TOML bot config.
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Dry-run several configs in parallel.
    Preview {
        /// TOML bot configs (repeatable).
        #[arg(long = "config", required = true)]
        configs: Vec<PathBuf>,

        #[command(flatten)]
        data: DataArgs,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Place the grid on the paper venue, then cancel it.
    Paper {
        /// Path to a TOML bot config.
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        data: DataArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze { config, data, json } => run_analyze(config, &data, json),
        Commands::Preview {
            configs,
            data,
            json,
        } => run_preview(configs, &data, json),
        Commands::Paper { config, data } => run_paper(config, &data),
    }
}

fn load_config(path: &PathBuf) -> Result<BotConfig> {
    BotConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

/// Paper venue stocked with candles for every symbol and a balance per currency.
fn build_venue(configs: &[BotConfig], data: &DataArgs) -> Result<PaperExchange> {
    let symbols: BTreeSet<&str> = configs.iter().map(|c| c.symbol.as_str()).collect();
    if data.csv.is_some() && symbols.len() > 1 {
        bail!("--csv serves a single symbol, but configs name {}", symbols.len());
    }
    if data.csv.is_none() && !data.synthetic {
        bail!("one of --csv or --synthetic is required");
    }

    let mut loaded_symbols = BTreeSet::new();
    let mut venue = PaperExchange::new();
    for config in configs {
        if loaded_symbols.insert(config.symbol.clone()) {
            let timeframe = config.analysis.timeframe;
            let opts = LoadOptions {
                csv: data.csv.clone(),
                synthetic: data.synthetic,
                timeframe,
                count: data.count,
                start: Utc::now() - timeframe.duration() * data.count as i32,
            };
            let loaded = load_candles(&config.symbol, &opts)?;
            tracing::debug!(symbol = %config.symbol, dataset = %loaded.dataset_hash, "candles ready");
            venue = venue.with_candles(config.symbol.clone(), loaded.series);
        }
        venue = venue.with_balance(config.investment.currency.clone(), data.balance);
    }
    Ok(venue)
}

fn run_analyze(config_path: PathBuf, data: &DataArgs, json: bool) -> Result<()> {
    let config = load_config(&config_path)?;
    let venue = build_venue(std::slice::from_ref(&config), data)?;
    let mut bot = GridBot::new(config, Arc::new(venue))?;

    let analysis = bot.analyze_market()?;
    let grid = bot.compose_grid()?;

    if json {
        let out = serde_json::json!({ "analysis": &*analysis, "grid": &*grid });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_analysis(bot.symbol(), &analysis);
        print_grid(&grid);
    }
    Ok(())
}

fn run_preview(config_paths: Vec<PathBuf>, data: &DataArgs, json: bool) -> Result<()> {
    let configs = config_paths
        .iter()
        .map(load_config)
        .collect::<Result<Vec<_>>>()?;
    let venue = build_venue(&configs, data)?;

    let results = preview_all(&configs, Arc::new(venue));
    let mut failures = 0;
    for entry in &results {
        match &entry.result {
            Ok(preview) if json => println!("{}", serde_json::to_string_pretty(preview)?),
            Ok(preview) => print_preview(preview),
            Err(e) => {
                failures += 1;
                eprintln!("Error for {}: {e}", entry.symbol);
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} previews failed", results.len());
    }
    Ok(())
}

fn run_paper(config_path: PathBuf, data: &DataArgs) -> Result<()> {
    let config = load_config(&config_path)?;
    let venue = Arc::new(build_venue(std::slice::from_ref(&config), data)?);
    let mut bot = GridBot::new(config, venue.clone())?;

    let started = bot.try_start()?;
    print_start(&started);
    println!("Open orders on paper venue: {}", venue.open_orders().len());

    let stopped = bot.stop_with_report();
    print_stop(&stopped);
    if !stopped.all_cancelled() {
        bail!("{} cancellations were not acknowledged", stopped.failed.len());
    }
    Ok(())
}

// ── Output ───────────────────────────────────────────────────────────

fn print_analysis(symbol: &str, analysis: &LevelAnalysis) {
    println!("Symbol:      {symbol}");
    println!("Price:       {:.6}", analysis.reference_price);
    println!("Supports:    {}", format_levels(&analysis.supports));
    println!("Resistances: {}", format_levels(&analysis.resistances));
    for warning in &analysis.warnings {
        println!("Warning:     {warning}");
    }
}

fn print_grid(grid: &GridLevelSet) {
    println!();
    println!(
        "Grid: {} levels, {:.6} – {:.6}, {:?} spacing, from {:?}",
        grid.prices().len(),
        grid.lower_bound(),
        grid.upper_bound(),
        grid.spacing(),
        grid.source()
    );
    println!("Fingerprint: {}", grid.fingerprint());
    for (i, price) in grid.prices().iter().enumerate() {
        println!("  {i:>3}  {price:.6}");
    }
}

fn print_preview(preview: &Preview) {
    let short_id = preview.run_id.get(..12).unwrap_or(&preview.run_id);
    println!("=== {} ({short_id}) ===", preview.symbol);
    print_analysis(&preview.symbol, &preview.analysis);
    print_grid(&preview.grid);
    println!();
    println!(
        "Plan: {:?}, invest {:.2}, {:.2} per grid, {} orders",
        preview.plan.direction,
        preview.plan.investment_amount,
        preview.plan.per_grid_size,
        preview.plan.instructions.len()
    );
    println!("{:>5} {:<5} {:>14} {:>16}", "Level", "Side", "Price", "Quantity");
    println!("{}", "-".repeat(43));
    for o in &preview.plan.instructions {
        println!(
            "{:>5} {:<5} {:>14.6} {:>16.8}",
            o.level_index,
            o.side.to_string(),
            o.price,
            o.quantity
        );
    }
    println!();
}

fn print_start(report: &StartReport) {
    println!("Started {}", report.symbol);
    println!("  Levels:    {}", report.levels);
    println!("  Range:     {:.6} – {:.6}", report.lower, report.upper);
    println!("  Grid type: {:?}", report.spacing);
    println!("  Direction: {:?}", report.direction);
    println!("  Placed:    {}", report.placed);
    println!("  Rejected:  {}", report.rejected);
}

fn print_stop(report: &StopReport) {
    println!("Stopped");
    println!("  Cancelled: {}", report.cancelled);
    println!("  Failed:    {}", report.failed.len());
}

/// Nearest first, each with its strength: `95.000000 (x4)`.
fn format_levels(levels: &[PriceLevel]) -> String {
    if levels.is_empty() {
        return "(none)".into();
    }
    levels
        .iter()
        .map(|l| format!("{:.6} (x{})", l.price, l.strength))
        .collect::<Vec<_>>()
        .join(", ")
}
