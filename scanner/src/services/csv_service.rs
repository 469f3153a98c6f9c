use crate::{
    models::{CandidateRecord, ScanResult},
    utils::{normalize_symbols, Logger},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};
use thiserror::Error;

/// Column order shared by the table display and the CSV export
pub const EXPORT_HEADERS: [&str; 11] = [
    "Symbol", "Close", "RSI", "EMA20", "EMA50", "Trend_%", "VolRatio", "Entry", "Target", "StopLoss", "R/R",
];

#[derive(Debug, Error)]
pub enum CsvServiceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("symbol list has no 'Symbol' column")]
    MissingSymbolColumn,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// One exported row; values rounded for presentation (RSI 1 dp, others 2 dp)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvExportRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "RSI")]
    pub rsi: f64,
    #[serde(rename = "EMA20")]
    pub ema20: f64,
    #[serde(rename = "EMA50")]
    pub ema50: f64,
    #[serde(rename = "Trend_%")]
    pub trend_pct: f64,
    #[serde(rename = "VolRatio")]
    pub vol_ratio: f64,
    #[serde(rename = "Entry")]
    pub entry: f64,
    #[serde(rename = "Target")]
    pub target: f64,
    #[serde(rename = "StopLoss")]
    pub stop_loss: f64,
    #[serde(rename = "R/R", serialize_with = "serialize_dash", deserialize_with = "deserialize_dash")]
    pub reward_risk: Option<f64>,
}

impl From<&CandidateRecord> for CsvExportRow {
    fn from(c: &CandidateRecord) -> Self {
        Self {
            symbol: c.symbol.clone(),
            close: round_to(c.close, 2),
            rsi: round_to(c.rsi, 1),
            ema20: round_to(c.ema20, 2),
            ema50: round_to(c.ema50, 2),
            trend_pct: round_to(c.trend_pct, 2),
            vol_ratio: round_to(c.vol_ratio, 2),
            entry: round_to(c.entry, 2),
            target: round_to(c.target, 2),
            stop_loss: round_to(c.stop_loss, 2),
            reward_risk: c.reward_risk_ratio.map(|rr| round_to(rr, 2)),
        }
    }
}

// "-" stands in for an undefined reward/risk ratio
fn serialize_dash<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_str("-"),
    }
}

fn deserialize_dash<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "" | "-" => Ok(None),
        value => value.parse::<f64>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Symbol list loading and scan result export
pub struct CsvService {
    logger: Logger,
}

impl CsvService {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("CSV_SERVICE"),
        }
    }

    /// Load symbols from a CSV file with a `Symbol` column (case-insensitive)
    pub fn load_symbols(&self, path: &Path, suffix: Option<&str>) -> Result<Vec<String>, CsvServiceError> {
        let file = File::open(path)?;
        let symbols = self.read_symbols(file, suffix)?;
        self.logger.info(&format!(
            "📂 Loaded {} symbols from {}",
            symbols.len(),
            path.display()
        ));
        Ok(symbols)
    }

    pub fn read_symbols<R: Read>(&self, reader: R, suffix: Option<&str>) -> Result<Vec<String>, CsvServiceError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let column = reader
            .headers()?
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case("symbol"))
            .ok_or(CsvServiceError::MissingSymbolColumn)?;

        let mut raw = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(value) = record.get(column) {
                raw.push(value.to_string());
            }
        }

        let (symbols, rejected) = normalize_symbols(&raw, suffix);
        if !rejected.is_empty() {
            self.logger.warn(&format!(
                "Ignored {} invalid symbols: {:?}",
                rejected.len(),
                rejected
            ));
        }

        Ok(symbols)
    }

    /// Write the result as CSV; an empty result still gets the header row
    pub fn export_csv<W: Write>(&self, result: &ScanResult, writer: W) -> Result<(), CsvServiceError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        writer.write_record(EXPORT_HEADERS)?;
        for candidate in result {
            writer.serialize(CsvExportRow::from(candidate))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn export_to_path(&self, result: &ScanResult, path: &Path) -> Result<(), CsvServiceError> {
        let file = BufWriter::new(File::create(path)?);
        self.export_csv(result, file)?;
        self.logger.info(&format!(
            "💾 Exported {} candidates to {}",
            result.len(),
            path.display()
        ));
        Ok(())
    }

    /// Parse a previously exported CSV back into rows
    pub fn read_export<R: Read>(&self, reader: R) -> Result<Vec<CsvExportRow>, CsvServiceError> {
        let mut reader = csv::Reader::from_reader(reader);
        let rows = reader
            .deserialize::<CsvExportRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Full-precision JSON snapshot of the result
    pub fn export_json_to_path(&self, result: &ScanResult, path: &Path) -> Result<(), CsvServiceError> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, result)?;
        self.logger.info(&format!("💾 Exported JSON snapshot to {}", path.display()));
        Ok(())
    }
}

impl Default for CsvService {
    fn default() -> Self {
        Self::new()
    }
}
