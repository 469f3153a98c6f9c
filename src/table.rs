use bullish_scanner::models::ScanResult;
use bullish_scanner::services::{CsvExportRow, EXPORT_HEADERS};

fn cells(row: &CsvExportRow) -> [String; 11] {
    [
        row.symbol.clone(),
        format!("{:.2}", row.close),
        format!("{:.1}", row.rsi),
        format!("{:.2}", row.ema20),
        format!("{:.2}", row.ema50),
        format!("{:.2}", row.trend_pct),
        format!("{:.2}", row.vol_ratio),
        format!("{:.2}", row.entry),
        format!("{:.2}", row.target),
        format!("{:.2}", row.stop_loss),
        row.reward_risk
            .map(|rr| format!("{:.2}", rr))
            .unwrap_or_else(|| "-".to_string()),
    ]
}

/// Render the ranked candidates as an aligned plain-text table
pub fn render(result: &ScanResult) -> String {
    let rows: Vec<[String; 11]> = result
        .iter()
        .map(|c| cells(&CsvExportRow::from(c)))
        .collect();

    let mut widths: Vec<usize> = EXPORT_HEADERS.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let format_line = |cells: &mut dyn Iterator<Item = &str>| -> String {
        cells
            .zip(widths.iter())
            .enumerate()
            .map(|(i, (cell, &w))| {
                // symbol column left-aligned, numbers right-aligned
                if i == 0 {
                    format!("{:<w$}", cell, w = w)
                } else {
                    format!("{:>w$}", cell, w = w)
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_line(&mut EXPORT_HEADERS.iter().copied()));
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &rows {
        lines.push(format_line(&mut row.iter().map(String::as_str)));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bullish_scanner::models::CandidateRecord;

    fn candidate(symbol: &str, rr: Option<f64>) -> CandidateRecord {
        CandidateRecord {
            symbol: symbol.to_string(),
            close: 1523.456,
            rsi: 61.27,
            ema20: 1490.111,
            ema50: 1450.0,
            trend_pct: 2.7663,
            price_position_pct: 102.24,
            vol_ratio: 1.234,
            entry: 1531.07,
            target: 1577.0,
            stop_loss: 1490.111,
            reward_risk_ratio: rr,
        }
    }

    #[test]
    fn table_has_header_and_rounded_rows() {
        let result = ScanResult::new(vec![candidate("INFY.NS", Some(1.1234)), candidate("TCS.NS", None)]);
        let text = render(&result);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Symbol"));
        assert!(lines[0].ends_with("R/R"));
        assert!(lines[2].starts_with("INFY.NS"));
        assert!(lines[2].contains("1523.46"));
        assert!(lines[2].contains("61.3"));
        assert!(lines[2].ends_with("1.12"));
        assert!(lines[3].ends_with('-'));
    }

    #[test]
    fn empty_result_renders_header_only() {
        let text = render(&ScanResult::default());
        assert_eq!(text.lines().count(), 2);
    }
}
