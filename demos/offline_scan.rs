//! Offline scan over synthetic histories
//!
//! Writes a few generated daily histories as `<SYMBOL>.csv`, scans them through the
//! directory provider and exports the ranked result.

use bullish_scanner::prelude::*;
use bullish_scanner::services::scan_histories;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::Write as _;

fn synthetic_history(days: usize, up: f64, down: f64, volume: u64) -> Vec<PriceBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let mut close = 100.0;
    (0..days)
        .map(|i| {
            if i > 0 {
                close += if i % 2 == 1 { up } else { -down };
            }
            PriceBar::new(
                start + chrono::Duration::days(i as i64),
                close - 0.2,
                close + 0.6,
                close - 0.6,
                close,
                volume,
            )
        })
        .collect()
}

fn to_csv(bars: &[PriceBar]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for bar in bars {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        );
    }
    out
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    bullish_scanner::init_logger()?;

    println!("🚀 Offline Bullish Scan");
    println!("{}", "=".repeat(60));

    let histories = vec![
        ("STEADY.NS".to_string(), synthetic_history(90, 1.0, 0.8, 250_000)),
        ("FAST.NS".to_string(), synthetic_history(90, 1.3, 0.8, 300_000)),
        ("FLAT.NS".to_string(), synthetic_history(90, 0.8, 0.8, 200_000)),
        ("FALLING.NS".to_string(), synthetic_history(90, 0.5, 1.2, 150_000)),
        ("NEW.NS".to_string(), synthetic_history(20, 1.0, 0.8, 100_000)),
    ];

    let dir = tempfile::tempdir()?;
    for (symbol, bars) in &histories {
        std::fs::write(dir.path().join(format!("{}.csv", symbol)), to_csv(bars))?;
    }

    // Example 1: async scan through the directory provider
    println!("\n📂 Example 1: Directory provider");
    let symbols: Vec<String> = histories.iter().map(|(s, _)| s.clone()).collect();
    let service = ScanBuilder::new(CsvDirectoryProvider::new(dir.path()))
        .with_concurrency(2)
        .log_progress(true)
        .build_for(symbols.len());
    let report = service.run(&symbols).await?;

    println!(
        "✅ {} passed, {} rejected, {} skipped",
        report.passed,
        report.rejected,
        report.skipped_count()
    );
    for (symbol, reason) in &report.skipped {
        println!("   ⏭️  {}: {}", symbol, reason);
    }
    for c in &report.result {
        let rr = c
            .reward_risk_ratio
            .map(|rr| format!("{:.2}", rr))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {:<12} close {:>8.2}  rsi {:>5.1}  trend {:>5.2}%  R/R {}",
            c.symbol, c.close, c.rsi, c.trend_pct, rr
        );
    }

    // Example 2: same histories, evaluated in parallel with the weighted-points rule
    println!("\n🧮 Example 2: Scored rule over pre-fetched histories");
    let config = ScanConfig {
        rule: FilterRule::scored(),
        ..ScanConfig::default()
    };
    let scored = scan_histories(&histories, &config);
    println!("✅ Scored rule selected: {:?}", scored.result.symbols());

    // Example 3: CSV export
    let export_path = dir.path().join("bullish_candidates.csv");
    CsvService::new().export_to_path(&report.result, &export_path)?;
    println!("\n💾 Exported CSV:\n{}", std::fs::read_to_string(&export_path)?);

    Ok(())
}
