use crate::models::{CandidateRecord, ScanResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Why a symbol never reached classification
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum SkipReason {
    #[error("fetch failed: {0}")]
    FetchFailed(String),
    #[error("empty history")]
    EmptyHistory,
    #[error("insufficient history ({bars} bars)")]
    InsufficientHistory { bars: usize },
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("scan aborted")]
    Aborted,
}

/// Result of evaluating one symbol
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Candidate(CandidateRecord),
    /// Filter conditions did not hold
    Rejected,
    Skipped(SkipReason),
}

impl SymbolOutcome {
    pub fn is_candidate(&self) -> bool {
        matches!(self, SymbolOutcome::Candidate(_))
    }
}

/// Progress snapshot handed to observers after each symbol completes
#[derive(Debug, Clone, PartialEq)]
pub struct ScanProgress {
    pub symbol: String,
    pub processed: usize,
    pub total: usize,
    pub passed: usize,
}

impl ScanProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }
}

/// Everything a scan run produced
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub result: ScanResult,
    pub total: usize,
    /// Candidates before truncation
    pub passed: usize,
    pub rejected: usize,
    pub skipped: Vec<(String, SkipReason)>,
    pub elapsed_ms: f64,
}

impl ScanReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Skips caused by malformed history rather than missing data
    pub fn faults(&self) -> impl Iterator<Item = &(String, SkipReason)> {
        self.skipped
            .iter()
            .filter(|(_, reason)| matches!(reason, SkipReason::InvalidData(_)))
    }
}
