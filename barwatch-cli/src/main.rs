//! barwatch CLI — clean, validate and health-check OHLCV bar data.
//!
//! Commands:
//! - `run` — process CSV files (one per symbol) from a data directory
//! - `demo` — process the synthetic feed, defects included
//! - `check-config` — load and validate a quality config TOML

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use barwatch_core::QualityConfig;
use barwatch_runner::{
    AlertSink, CsvSource, JsonlSink, LogSink, Orchestrator, RunSummary, SyntheticSource,
};

#[derive(Parser)]
#[command(
    name = "barwatch",
    about = "barwatch — OHLCV cleaning, validation and health scoring",
    version
)]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, validate and score CSV data, one `<SYMBOL>.csv` per symbol.
    Run {
        /// Symbols to process (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Quality config TOML. Built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory holding the CSV files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Append alerts as JSON lines to this file instead of logging them.
        #[arg(long)]
        alerts: Option<PathBuf>,

        /// Judge freshness at this time (YYYY-MM-DD HH:MM:SS). Defaults to now.
        #[arg(long)]
        as_of: Option<String>,

        /// Worker threads for per-symbol tasks.
        #[arg(long, default_value_t = 1)]
        threads: usize,

        /// Print the full summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the pipeline over synthetic intraday bars.
    Demo {
        /// Symbols to generate.
        #[arg(long, num_args = 1.., default_values = ["SPY", "QQQ", "IWM"])]
        symbols: Vec<String>,

        /// Generator seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Trading days to generate.
        #[arg(long, default_value_t = 5)]
        days: u32,

        /// Print the full summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load and validate a quality config TOML.
    CheckConfig {
        /// Path to the config file.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let level = &cli.log_level;
                format!("barwatch={level},barwatch_core={level},barwatch_runner={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Run {
            symbols,
            config,
            data_dir,
            alerts,
            as_of,
            threads,
            json,
        } => run_cmd(
            &symbols,
            config.as_deref(),
            data_dir,
            alerts.as_deref(),
            as_of.as_deref(),
            threads,
            json,
        ),
        Commands::Demo {
            symbols,
            seed,
            days,
            json,
        } => demo_cmd(&symbols, seed, days, json),
        Commands::CheckConfig { path } => check_config_cmd(&path),
    }
}

fn load_config(path: Option<&Path>) -> Result<QualityConfig> {
    match path {
        Some(path) => QualityConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(QualityConfig::default()),
    }
}

fn build_sink(alerts: Option<&Path>) -> Result<Arc<dyn AlertSink>> {
    let sink: Arc<dyn AlertSink> = match alerts {
        Some(path) => Arc::new(JsonlSink::open(path)?),
        None => Arc::new(LogSink),
    };
    Ok(sink)
}

fn parse_as_of(as_of: Option<&str>) -> Result<NaiveDateTime> {
    match as_of {
        Some(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
            .with_context(|| format!("invalid --as-of '{s}', expected YYYY-MM-DD HH:MM:SS")),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

fn run_cmd(
    symbols: &[String],
    config_path: Option<&Path>,
    data_dir: PathBuf,
    alerts: Option<&Path>,
    as_of: Option<&str>,
    threads: usize,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let as_of = parse_as_of(as_of)?;
    let source = CsvSource::new(data_dir, &config.pipeline.required_columns);
    let orch = Orchestrator::new(config, build_sink(alerts)?)?.with_threads(threads)?;

    tracing::info!(data_dir = %source.dir().display(), %as_of, "starting run");
    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let summary = orch.run_source(&source, &sym_refs, as_of);
    emit(&summary, json)?;

    if !summary.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn demo_cmd(symbols: &[String], seed: u64, days: u32, json: bool) -> Result<()> {
    let config = QualityConfig::default();
    let first_day = NaiveDate::from_ymd_opt(2024, 1, 8).context("invalid demo start date")?;
    let source = SyntheticSource::new(
        first_day,
        days,
        config.schedule.expected_interval_minutes,
        seed,
    );
    let as_of = source.last_timestamp();
    let orch = Orchestrator::new(config, Arc::new(LogSink))?;

    tracing::info!(seed, days, %as_of, "starting demo");
    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let summary = orch.run_source(&source, &sym_refs, as_of);
    emit(&summary, json)
}

fn check_config_cmd(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    println!("{}: OK", path.display());
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

fn emit(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print_summary(summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("=== Data Quality Summary ===");
    println!("As of:          {}", summary.as_of);
    println!(
        "Dataset hash:   {}",
        summary.dataset_hash.get(..16).unwrap_or(&summary.dataset_hash)
    );
    println!(
        "System health:  {:.1}",
        summary.monitoring.system_health_score
    );
    println!();

    println!(
        "{:<8} {:>6} {:>6} {:>8} {:>8} {:>8} {:>8}",
        "Symbol", "Rows", "Clean", "Fresh", "Compl", "Consist", "Score"
    );
    println!("{}", "-".repeat(58));
    for (symbol, health) in &summary.monitoring.per_symbol {
        let (rows, clean) = summary
            .reports
            .get(symbol)
            .map(|r| (r.original_rows(), r.cleaned_rows()))
            .unwrap_or_default();
        println!(
            "{:<8} {:>6} {:>6} {:>8.1} {:>8.1} {:>8.1} {:>8.1}",
            symbol,
            rows,
            clean,
            health.factors.freshness,
            health.factors.completeness,
            health.factors.consistency,
            health.score
        );
    }

    let actions: Vec<(&String, String)> = summary
        .reports
        .iter()
        .flat_map(|(symbol, report)| report.descriptions().into_iter().map(move |d| (symbol, d)))
        .collect();
    if !actions.is_empty() {
        println!();
        println!("Cleaning actions:");
        for (symbol, action) in actions {
            println!("  {symbol:<8} {action}");
        }
    }

    if !summary.breaches.is_empty() {
        println!();
        println!("Threshold breaches:");
        for breach in &summary.breaches {
            println!("  {breach}");
        }
    }

    if !summary.failures.is_empty() {
        println!();
        println!("Failed symbols:");
        for (symbol, reason) in &summary.failures {
            println!("  {symbol:<8} {reason}");
        }
    }
}
