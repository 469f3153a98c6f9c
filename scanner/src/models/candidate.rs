use serde::{Deserialize, Serialize};

/// One row of scan output: a symbol whose latest snapshot passed the bullish filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub symbol: String,
    pub close: f64,
    pub rsi: f64,
    pub ema20: f64,
    pub ema50: f64,
    /// (EMA20 - EMA50) / EMA50 * 100
    pub trend_pct: f64,
    /// Close / EMA20 * 100
    pub price_position_pct: f64,
    /// Volume / AvgVol20
    pub vol_ratio: f64,
    pub entry: f64,
    pub target: f64,
    pub stop_loss: f64,
    /// None when entry does not exceed the stop loss
    pub reward_risk_ratio: Option<f64>,
}

/// Ranked, truncated candidates of a single scan run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub candidates: Vec<CandidateRecord>,
}

impl ScanResult {
    pub const DEFAULT_MAX_RESULTS: usize = 12;

    pub fn new(candidates: Vec<CandidateRecord>) -> Self {
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidateRecord> {
        self.candidates.iter()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.symbol.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ScanResult {
    type Item = &'a CandidateRecord;
    type IntoIter = std::slice::Iter<'a, CandidateRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}
