//! Crossmarket CLI: extract, load, and query commands.
//!
//! Commands:
//! - `extract`: fetch every source and write the staging CSVs
//! - `load`: replace the four SQLite tables from staging
//! - `run`: extract then load
//! - `catalog`: list the named analysis queries
//! - `query <key>`: run one catalog query
//! - `summary` / `snapshot` / `coin <id>`: date-range templates
//! - `top-coins`: coin selector choices
//! - `staging status`: staged files, row counts, hash checks

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use crossmarket_core::config::PipelineConfig;
use crossmarket_core::data::{
    extract_to_staging, ExtractProgress, ExtractSummary, HashCheck, HttpClient, StagingDir,
    StdoutProgress, TracingProgress,
};
use crossmarket_runner::catalog::{self, QueryGroup};
use crossmarket_runner::export::{self, ExportFormat};
use crossmarket_runner::{load_all, DateRange, LoadReport, QueryResult, QueryRunner, Store};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "crossmarket",
    about = "Crossmarket CLI: crypto, oil, and equity index data pipeline"
)]
struct Cli {
    /// TOML config file. Defaults apply to every key it leaves out.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the staging directory.
    #[arg(long, global = true)]
    staging_dir: Option<PathBuf>,

    /// Override the SQLite database path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Report extract progress as log events instead of console lines.
    #[arg(long, global = true)]
    log_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all sources and write the staging files.
    Extract,
    /// Load the staging files into the database, replacing each table.
    Load,
    /// Extract, then load.
    Run,
    /// List the catalog queries by group.
    Catalog,
    /// Run a catalog query by key (see `catalog`).
    Query {
        key: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Average BTC, oil, S&P 500 and NIFTY 50 over a date range.
    Summary {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Daily BTC with oil, S&P 500 and NIFTY 50 on the same dates.
    Snapshot {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// One coin's daily prices over a date range.
    Coin {
        /// Coin id, e.g. bitcoin.
        id: String,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Top coins by market cap, as offered by the coin selector.
    TopCoins {
        #[arg(long, default_value_t = 3)]
        n: usize,
    },
    /// Staging file management.
    Staging {
        #[command(subcommand)]
        action: StagingAction,
    },
}

#[derive(Subcommand)]
enum StagingAction {
    /// Report staged files, row counts, and hash checks.
    Status,
}

#[derive(Args)]
struct RangeArgs {
    /// Start date (YYYY-MM-DD), inclusive. Defaults to 2025-02-01.
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), inclusive. Defaults to 2026-02-18.
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,
}

impl RangeArgs {
    fn resolve(&self) -> Result<DateRange> {
        let default = DateRange::default();
        let range = DateRange::new(
            self.start.unwrap_or(default.start),
            self.end.unwrap_or(default.end),
        );
        if range.start > range.end {
            bail!("start {} is after end {}", range.start, range.end);
        }
        Ok(range)
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Print as CSV.
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Print as JSON.
    #[arg(long)]
    json: bool,

    /// Write to a file instead; the extension picks the format.
    #[arg(long)]
    out: Option<PathBuf>,
}

impl OutputArgs {
    fn format(&self) -> ExportFormat {
        if self.csv {
            ExportFormat::Csv
        } else if self.json {
            ExportFormat::Json
        } else {
            ExportFormat::Table
        }
    }

    fn emit(&self, result: &QueryResult) -> Result<()> {
        match &self.out {
            Some(path) => {
                export::save(result, path)?;
                println!("Wrote {} row(s) to {}", result.rows.len(), path.display());
            }
            None => print!("{}", export::render(result, self.format())?),
        }
        Ok(())
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("'{s}': {e}"))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match &cli.command {
        Commands::Extract => run_extract(&config, cli.log_progress).map(|_| ()),
        Commands::Load => run_load(&config),
        Commands::Run => {
            run_extract(&config, cli.log_progress)?;
            run_load(&config)
        }
        Commands::Catalog => {
            print_catalog();
            Ok(())
        }
        Commands::Query { key, output } => {
            let store = open_store(&config)?;
            let (entry, result) = QueryRunner::new(&store)
                .run_catalog(key)
                .with_context(|| format!("query '{key}' failed"))?;
            if output.out.is_none() && output.format() == ExportFormat::Table {
                println!("{}\n", entry.title);
            }
            output.emit(&result)
        }
        Commands::Summary { range, output } => run_summary(&config, range.resolve()?, output),
        Commands::Snapshot { range, output } => {
            let store = open_store(&config)?;
            let result = QueryRunner::new(&store).daily_snapshot(range.resolve()?)?;
            output.emit(&result)
        }
        Commands::Coin { id, range, output } => {
            let store = open_store(&config)?;
            let result = QueryRunner::new(&store).coin_series(id, range.resolve()?)?;
            if result.is_empty() {
                eprintln!("No data for '{id}' in this range.");
            }
            output.emit(&result)
        }
        Commands::TopCoins { n } => {
            let store = open_store(&config)?;
            let top = QueryRunner::new(&store).top_coins(*n);
            if let Some(reason) = &top.reason {
                println!("Fallback list, not ranked from the store ({reason})");
            }
            for coin in &top.coins {
                println!("{:<20} {}", coin.id, coin.name);
            }
            Ok(())
        }
        Commands::Staging { action } => match action {
            StagingAction::Status => run_staging_status(&config),
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.staging_dir {
        config.paths.staging_dir = dir.clone();
    }
    if let Some(db) = &cli.db {
        config.paths.database = db.clone();
    }
    Ok(config)
}

fn open_store(config: &PipelineConfig) -> Result<Store> {
    Store::open(&config.paths.database)
        .with_context(|| format!("cannot open {}", config.paths.database.display()))
}

fn run_extract(config: &PipelineConfig, log_progress: bool) -> Result<ExtractSummary> {
    let http = HttpClient::new(&config.http)?;
    let staging = StagingDir::new(&config.paths.staging_dir);
    let progress: &dyn ExtractProgress = if log_progress {
        &TracingProgress
    } else {
        &StdoutProgress
    };
    let summary = extract_to_staging(&http, config, &staging, progress)?;
    print_extract_summary(&summary, &staging);
    Ok(summary)
}

fn print_extract_summary(summary: &ExtractSummary, staging: &StagingDir) {
    println!("=== Extract Summary ===");
    println!("Staging: {}", staging.root().display());
    println!();
    println!("{:<18} {:>6} {:>8} {:>10}  {}", "Dataset", "OK", "Failed", "Rows", "Staged");
    println!("{}", "-".repeat(54));
    for step in &summary.steps {
        println!(
            "{:<18} {:>6} {:>8} {:>10}  {}",
            step.dataset.table_name(),
            step.units_ok,
            step.units_failed,
            step.rows,
            if step.staged { "yes" } else { "no (kept previous)" }
        );
    }
    if !summary.top_coins.is_empty() {
        println!();
        println!("Top coins: {}", summary.top_coins.join(", "));
    }
    if !summary.skipped.is_empty() {
        println!();
        println!("Skipped {} unit(s):", summary.skipped.len());
        for (unit, err) in &summary.skipped {
            println!("  {unit}: {err}");
        }
    }
    println!();
}

fn run_load(config: &PipelineConfig) -> Result<()> {
    let staging = StagingDir::new(&config.paths.staging_dir);
    let mut store = open_store(config)?;
    let report = load_all(&mut store, &staging);
    print_load_report(&report);

    if !report.all_succeeded() {
        for failure in report.failures() {
            eprintln!("Error: {failure}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn print_load_report(report: &LoadReport) {
    println!("=== Load Report ===");
    for table in &report.tables {
        let hash = match &table.hash {
            HashCheck::Match => "hash ok",
            HashCheck::Mismatch { .. } => "HASH MISMATCH",
            HashCheck::Unrecorded => "no manifest entry",
        };
        match &table.result {
            Ok(rows) => println!("{:<18} {:>10} rows  ({hash})", table.dataset.table_name(), rows),
            Err(e) => println!("{:<18} FAILED: {}", table.dataset.table_name(), e.reason),
        }
    }
    println!();
}

fn print_catalog() {
    for group in QueryGroup::ALL {
        println!("{}", group.label());
        for entry in catalog::by_group(group) {
            println!("  {:<24} {}", entry.key, entry.title);
        }
        println!();
    }
}

fn run_summary(config: &PipelineConfig, range: DateRange, output: &OutputArgs) -> Result<()> {
    let store = open_store(config)?;
    let summary = QueryRunner::new(&store).average_summary(range)?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if output.csv || output.out.is_some() {
        let result = QueryResult {
            columns: vec!["metric".into(), "average".into()],
            rows: summary
                .labeled()
                .into_iter()
                .map(|(label, value)| {
                    vec![
                        crossmarket_runner::Cell::Text(label.into()),
                        crossmarket_runner::Cell::Text(value),
                    ]
                })
                .collect(),
        };
        return output.emit(&result);
    }

    println!("Averages {} to {}", range.start, range.end);
    println!("{}", "-".repeat(36));
    for (label, value) in summary.labeled() {
        println!("{label:<16} {value:>18}");
    }
    Ok(())
}

fn run_staging_status(config: &PipelineConfig) -> Result<()> {
    let staging = StagingDir::new(&config.paths.staging_dir);
    println!("Staging: {}", staging.root().display());
    println!();
    println!(
        "{:<18} {:<24} {:>10} {:<20} {}",
        "Dataset", "File", "Rows", "Written", "Hash"
    );
    println!("{}", "-".repeat(86));
    for status in staging.status()? {
        let file = status
            .path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !status.exists {
            println!("{:<18} {:<24} {:>10}", status.dataset.table_name(), file, "missing");
            continue;
        }
        let (rows, written) = match &status.entry {
            Some(entry) => (
                entry.rows.to_string(),
                entry.written_at.format("%Y-%m-%d %H:%M").to_string(),
            ),
            None => ("?".into(), "-".into()),
        };
        let check = match &status.check {
            HashCheck::Match => "ok".to_string(),
            HashCheck::Mismatch { expected, actual } => {
                format!("MISMATCH (manifest {}, file {})", short_hash(expected), short_hash(actual))
            }
            HashCheck::Unrecorded => "unrecorded".to_string(),
        };
        println!(
            "{:<18} {:<24} {:>10} {:<20} {}",
            status.dataset.table_name(),
            file,
            rows,
            written,
            check
        );
    }
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
