use crate::{
    models::{FilterRule, PriceBar, ScanProgress, ScanReport, ScanResult, SkipReason, SymbolOutcome},
    services::{FetchError, HistoryProvider},
    utils::{classify_with, compute_indicators, rank_candidates, Logger, Timer},
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use rayon::prelude::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("symbol list is empty")]
    NoSymbols,
}

/// Scan-level settings
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub rule: FilterRule,
    pub max_results: usize,
    /// Maximum in-flight history fetches
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rule: FilterRule::default(),
            max_results: ScanResult::DEFAULT_MAX_RESULTS,
            concurrency: 4,
        }
    }
}

/// Notified after each symbol finishes; has no influence on outcomes
pub trait ScanObserver: Send + Sync {
    fn on_symbol_done(&self, progress: &ScanProgress, outcome: &SymbolOutcome);
}

/// Observer that logs progress at a fixed percentage step
pub struct LoggingObserver {
    logger: Logger,
    step: usize,
}

impl LoggingObserver {
    pub fn new(total: usize) -> Self {
        Self {
            logger: Logger::new("SCAN"),
            step: (total / 20).max(1),
        }
    }
}

impl ScanObserver for LoggingObserver {
    fn on_symbol_done(&self, progress: &ScanProgress, outcome: &SymbolOutcome) {
        if let SymbolOutcome::Skipped(reason) = outcome {
            self.logger.debug(&format!("{} skipped: {}", progress.symbol, reason));
        }
        if progress.processed % self.step == 0 || progress.processed == progress.total {
            self.logger.info(&format!(
                "📊 Progress {}/{} ({:.0}%), {} passed",
                progress.processed,
                progress.total,
                progress.fraction() * 100.0,
                progress.passed
            ));
        }
    }
}

/// Checks the core relies on: positive finite closes, strictly ascending dates
fn validate_history(history: &[PriceBar]) -> Result<(), SkipReason> {
    if let Some(bar) = history.iter().find(|bar| !bar.has_valid_close()) {
        return Err(SkipReason::InvalidData(format!(
            "close {} on {}",
            bar.close, bar.date
        )));
    }
    if let Some(pair) = history.windows(2).find(|w| w[0].date >= w[1].date) {
        return Err(SkipReason::InvalidData(format!(
            "dates out of order at {}",
            pair[1].date
        )));
    }
    Ok(())
}

/// Evaluate one symbol's history end to end
pub fn evaluate_history(symbol: &str, history: &[PriceBar], rule: &FilterRule) -> SymbolOutcome {
    if history.is_empty() {
        return SymbolOutcome::Skipped(SkipReason::EmptyHistory);
    }
    if let Err(reason) = validate_history(history) {
        return SymbolOutcome::Skipped(reason);
    }

    let rows = compute_indicators(history);
    if rows.is_empty() {
        return SymbolOutcome::Skipped(SkipReason::InsufficientHistory { bars: history.len() });
    }

    match classify_with(symbol, &rows, rule) {
        Some(candidate) => SymbolOutcome::Candidate(candidate),
        None => SymbolOutcome::Rejected,
    }
}

/// Rank candidates and tally outcomes into a report
fn build_report(
    run_id: Uuid,
    started_at: chrono::DateTime<Utc>,
    outcomes: Vec<(String, SymbolOutcome)>,
    max_results: usize,
    elapsed_ms: f64,
) -> ScanReport {
    let total = outcomes.len();
    let mut candidates = Vec::new();
    let mut rejected = 0;
    let mut skipped = Vec::new();

    for (symbol, outcome) in outcomes {
        match outcome {
            SymbolOutcome::Candidate(candidate) => candidates.push(candidate),
            SymbolOutcome::Rejected => rejected += 1,
            SymbolOutcome::Skipped(reason) => skipped.push((symbol, reason)),
        }
    }
    skipped.sort_by(|a, b| a.0.cmp(&b.0));

    let passed = candidates.len();
    ScanReport {
        run_id,
        started_at,
        result: rank_candidates(candidates, max_results),
        total,
        passed,
        rejected,
        skipped,
        elapsed_ms,
    }
}

/// Evaluate already materialized histories in parallel
pub fn scan_histories(histories: &[(String, Vec<PriceBar>)], config: &ScanConfig) -> ScanReport {
    let timer = Timer::start("history scan");
    let started_at = Utc::now();

    let outcomes: Vec<(String, SymbolOutcome)> = histories
        .par_iter()
        .map(|(symbol, history)| (symbol.clone(), evaluate_history(symbol, history, &config.rule)))
        .collect();

    timer.log_elapsed("SCAN");
    build_report(Uuid::new_v4(), started_at, outcomes, config.max_results, timer.elapsed_ms())
}

/// Fetches histories through a provider and runs the pipeline per symbol
pub struct ScanService {
    provider: Arc<dyn HistoryProvider>,
    config: ScanConfig,
    observer: Option<Arc<dyn ScanObserver>>,
    abort: Arc<AtomicBool>,
}

impl ScanService {
    pub fn new(provider: Arc<dyn HistoryProvider>, config: ScanConfig) -> Self {
        Self {
            provider,
            config,
            observer: None,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Setting the flag abandons symbols that have not started yet
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    async fn evaluate_symbol(&self, symbol: &str) -> SymbolOutcome {
        if self.abort.load(Ordering::Relaxed) {
            return SymbolOutcome::Skipped(SkipReason::Aborted);
        }

        match self.provider.fetch(symbol).await {
            Ok(history) => evaluate_history(symbol, &history, &self.config.rule),
            Err(FetchError::InvalidData(detail)) => {
                debug!(symbol, %detail, "History rows are malformed");
                SymbolOutcome::Skipped(SkipReason::InvalidData(detail))
            }
            Err(e) => {
                debug!(symbol, error = %e, "History fetch failed");
                SymbolOutcome::Skipped(SkipReason::FetchFailed(e.to_string()))
            }
        }
    }

    /// Scan every symbol; individual failures never abort the batch
    pub async fn run(&self, symbols: &[String]) -> Result<ScanReport, ScanError> {
        if symbols.is_empty() {
            return Err(ScanError::NoSymbols);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("scan", run_id = %run_id, provider = self.provider.name());

        async move {
            let timer = Timer::start("scan");
            let started_at = Utc::now();
            let total = symbols.len();
            let concurrency = self.config.concurrency.max(1);

            info!(
                total,
                concurrency,
                rule = self.config.rule.name(),
                "🚀 Starting bullish scan"
            );

            let mut processed = 0;
            let mut passed = 0;

            let outcomes: Vec<(String, SymbolOutcome)> = stream::iter(symbols.iter())
                .map(|symbol| async move { (symbol.clone(), self.evaluate_symbol(symbol).await) })
                .buffer_unordered(concurrency)
                .inspect(|(symbol, outcome)| {
                    processed += 1;
                    if outcome.is_candidate() {
                        passed += 1;
                    }
                    if let Some(observer) = &self.observer {
                        let progress = ScanProgress {
                            symbol: symbol.clone(),
                            processed,
                            total,
                            passed,
                        };
                        observer.on_symbol_done(&progress, outcome);
                    }
                })
                .collect()
                .await;

            timer.log_elapsed("SCAN");
            let report = build_report(run_id, started_at, outcomes, self.config.max_results, timer.elapsed_ms());

            let faults = report.faults().count();
            if faults > 0 {
                warn!(faults, "Some symbols had malformed history");
            }
            info!(
                passed = report.passed,
                rejected = report.rejected,
                skipped = report.skipped_count(),
                kept = report.result.len(),
                elapsed_ms = report.elapsed_ms,
                "✅ Scan complete"
            );

            Ok(report)
        }
        .instrument(span)
        .await
    }
}
