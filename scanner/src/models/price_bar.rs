use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of price/volume history for a single symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Close is usable for ratio computations
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// A price bar extended with every indicator the classifier needs.
///
/// Rows only exist once all indicators have warmed up, so the fields are plain
/// values rather than options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub ema20: f64,
    pub ema50: f64,
    pub rsi14: f64,
    pub avg_vol20: f64,
}

impl IndicatorRow {
    pub fn from_bar(bar: &PriceBar, ema20: f64, ema50: f64, rsi14: f64, avg_vol20: f64) -> Self {
        Self {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            ema20,
            ema50,
            rsi14,
            avg_vol20,
        }
    }
}

/// Raw history row as found in CSV files on disk.
///
/// Accepts both lowercase headers and the capitalised `Date,Open,High,Low,Close,Volume`
/// layout written by most market-data downloaders.
#[derive(Debug, Deserialize)]
pub struct RawPriceBar {
    #[serde(alias = "Date")]
    pub date: String,
    #[serde(alias = "Open")]
    pub open: f64,
    #[serde(alias = "High")]
    pub high: f64,
    #[serde(alias = "Low")]
    pub low: f64,
    #[serde(alias = "Close")]
    pub close: f64,
    #[serde(alias = "Volume")]
    pub volume: f64,
}

impl RawPriceBar {
    /// Convert to PriceBar, accepting `YYYY-MM-DD` optionally followed by a time part
    pub fn to_price_bar(&self) -> anyhow::Result<PriceBar> {
        let day = self.date.trim().get(..10).unwrap_or(self.date.trim());
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")?;

        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(anyhow::anyhow!("Invalid volume {} on {}", self.volume, day));
        }

        Ok(PriceBar::new(
            date,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume.round() as u64,
        ))
    }
}
