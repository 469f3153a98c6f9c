pub mod config;
pub mod table;
pub mod yahoo;

use anyhow::{bail, Context};
use bullish_scanner::api::ScanBuilder;
use bullish_scanner::models::{FilterRule, ScanReport};
use bullish_scanner::services::{CsvDirectoryProvider, CsvService, HistoryProvider};
use bullish_scanner::utils::{normalize_symbols, split_symbol_list};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::yahoo::YahooClient;

const DEFAULT_LOG_FILTER: &str = "bullish_scanner=info,bullish_scan=info";

#[derive(Parser)]
#[command(name = "bullish-scan")]
#[command(about = "Daily bullish stock scanner: EMA crossover, RSI band and volume confirmation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the symbol list and print ranked bullish candidates
    Scan(ScanArgs),
    /// Print the symbols that would be scanned
    Symbols(SymbolArgs),
}

#[derive(Args)]
struct SymbolArgs {
    /// CSV file with a Symbol column (defaults to the configured file)
    #[arg(short, long)]
    symbols: Option<PathBuf>,

    /// Comma or newline separated symbols, used instead of the file
    #[arg(short, long)]
    tickers: Option<String>,

    /// Exchange suffix for bare symbols; pass "" to disable
    #[arg(long)]
    suffix: Option<String>,
}

#[derive(Args)]
struct ScanArgs {
    #[command(flatten)]
    symbols: SymbolArgs,

    /// Read histories from <DIR>/<SYMBOL>.csv instead of the network
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Write the ranked result as CSV
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Write the full-precision result as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    #[arg(long)]
    max_results: Option<usize>,

    /// Maximum in-flight history requests
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Use the weighted-points rule instead of the four-condition filter
    #[arg(long)]
    scored: bool,

    #[arg(long, requires = "scored")]
    min_score: Option<u8>,
}

fn load_symbols(args: &SymbolArgs, app_config: &AppConfig) -> anyhow::Result<Vec<String>> {
    let suffix = match args.suffix.as_deref() {
        Some("") => None,
        Some(suffix) => Some(suffix),
        None => app_config.suffix(),
    };

    if let Some(tickers) = &args.tickers {
        let (symbols, rejected) = normalize_symbols(split_symbol_list(tickers), suffix);
        for symbol in rejected {
            tracing::warn!(%symbol, "Ignoring invalid ticker");
        }
        return Ok(symbols);
    }

    let path = args.symbols.as_ref().unwrap_or(&app_config.symbols_file);
    CsvService::new()
        .load_symbols(path, suffix)
        .with_context(|| format!("Failed to load symbol list {}", path.display()))
}

fn report_summary(report: &ScanReport) {
    tracing::info!(
        run_id = %report.run_id,
        total = report.total,
        passed = report.passed,
        rejected = report.rejected,
        skipped = report.skipped_count(),
        "Scan summary"
    );
    for (symbol, reason) in report.faults() {
        tracing::warn!(%symbol, %reason, "Skipped symbol with invalid data");
    }
}

async fn run_scan(args: ScanArgs, app_config: AppConfig) -> anyhow::Result<()> {
    let symbols = load_symbols(&args.symbols, &app_config)?;
    if symbols.is_empty() {
        bail!("No symbols to scan");
    }

    let data_dir = args.data_dir.or(app_config.data_dir.clone());
    let provider: Arc<dyn HistoryProvider> = match data_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Reading histories from directory");
            Arc::new(CsvDirectoryProvider::new(dir))
        }
        None => Arc::new(
            YahooClient::new(&app_config.history, true).context("Failed to build HTTP client")?,
        ),
    };

    let rule = if args.scored {
        FilterRule::Scored {
            min_score: args.min_score.unwrap_or(FilterRule::DEFAULT_MIN_SCORE),
        }
    } else {
        app_config.rule.clone()
    };

    let service = ScanBuilder::from_shared(provider)
        .with_rule(rule)
        .with_max_results(args.max_results.unwrap_or(app_config.max_results))
        .with_concurrency(args.concurrency.unwrap_or(app_config.concurrency))
        .log_progress(true)
        .build_for(symbols.len());

    let abort = service.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight symbols");
            abort.store(true, Ordering::Relaxed);
        }
    });

    let report = service.run(&symbols).await?;
    report_summary(&report);

    if report.result.is_empty() {
        println!("No bullish candidates found");
    } else {
        println!("Found {} bullish candidates:\n", report.result.len());
        println!("{}", table::render(&report.result));
    }

    let csv = CsvService::new();
    if let Some(path) = &args.export {
        csv.export_to_path(&report.result, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "Exported CSV");
    }
    if let Some(path) = &args.json {
        csv.export_json_to_path(&report.result, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "Exported JSON");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app_config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(false)
        .init();

    tracing::info!(
        symbols_file = %app_config.symbols_file.display(),
        concurrency = app_config.concurrency,
        rule = app_config.rule.name(),
        "Loaded configuration"
    );

    match cli.command {
        Commands::Scan(args) => run_scan(args, app_config).await,
        Commands::Symbols(args) => {
            let symbols = load_symbols(&args, &app_config)?;
            for symbol in &symbols {
                println!("{}", symbol);
            }
            tracing::info!(count = symbols.len(), "Listed symbols");
            Ok(())
        }
    }
}
