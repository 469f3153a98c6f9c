//! # bullish-scanner - Daily Bullish Stock Scanner Library
//!
//! Computes EMA20, EMA50, RSI14 and the 20-day average volume from daily price
//! history, flags symbols whose latest snapshot looks bullish and ranks them:
//! - Indicator engine with warm-up trimming
//! - Four-condition (or weighted-points) bullish filter with trade planning
//! - Bounded-concurrency scan over any [`services::HistoryProvider`]
//! - CSV/JSON export of the ranked result
//!
//! ## Quick Start
//!
//! ```rust
//! use bullish_scanner::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = InMemoryProvider::new();
//!     let service = ScanBuilder::new(provider).build();
//!     let report = service.run(&["INFY.NS".to_string()]).await?;
//!     println!("{} candidates, {} skipped", report.result.len(), report.skipped_count());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod models;
pub mod services;
pub mod utils;

// Pipeline entry points
pub mod analysis {
    //! Indicator computation and bullish classification

    pub use crate::utils::classifier::{
        bullish_score, classify, classify_with, rank_candidates, SnapshotMetrics, TradePlan,
    };
    pub use crate::utils::indicators::{compute_indicators, ema_series, rolling_mean, rsi_series};
}

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! ```rust
    //! use bullish_scanner::prelude::*;
    //! ```

    pub use crate::analysis::{classify, classify_with, compute_indicators, rank_candidates};
    pub use crate::api::ScanBuilder;
    pub use crate::models::{
        CandidateRecord, FilterRule, FilterThresholds, IndicatorRow, PriceBar, ScanReport, ScanResult,
        SkipReason, SymbolOutcome,
    };
    pub use crate::services::{
        CsvDirectoryProvider, CsvService, FetchError, HistoryProvider, InMemoryProvider, ScanConfig,
        ScanService,
    };
}

pub use utils::{init_logger, Logger, Timer};
