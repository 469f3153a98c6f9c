//! Bullish classification of a symbol's latest indicator snapshot and
//! ranking of the resulting candidates.

use crate::models::{CandidateRecord, FilterRule, FilterThresholds, IndicatorRow, ScanResult};
use std::cmp::Ordering;

/// Entry is placed this factor above the last close
pub const ENTRY_PREMIUM: f64 = 1.005;
/// Target is this factor above the entry
pub const TARGET_GAIN: f64 = 1.03;

/// Ratios computed from the last row before any filtering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotMetrics {
    pub volume_ratio: f64,
    pub trend_strength_pct: f64,
    pub price_position_pct: f64,
}

impl SnapshotMetrics {
    pub fn from_row(row: &IndicatorRow) -> Self {
        let volume_ratio = if row.avg_vol20 != 0.0 && row.avg_vol20.is_finite() {
            row.volume as f64 / row.avg_vol20
        } else {
            1.0
        };

        Self {
            volume_ratio,
            trend_strength_pct: (row.ema20 - row.ema50) / row.ema50 * 100.0,
            price_position_pct: row.close / row.ema20 * 100.0,
        }
    }
}

/// Entry, target and stop for a passing symbol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradePlan {
    pub entry: f64,
    pub target: f64,
    pub stop_loss: f64,
    pub reward_risk_ratio: Option<f64>,
}

impl TradePlan {
    pub fn new(close: f64, ema20: f64) -> Self {
        let entry = close * ENTRY_PREMIUM;
        let target = entry * TARGET_GAIN;
        let stop_loss = ema20;
        // entry > stop_loss  <=>  close / ema20 > 1 / 1.005 (price position above ~99.5025%)
        let reward_risk_ratio = (entry > stop_loss).then(|| (target - entry) / (entry - stop_loss));

        Self {
            entry,
            target,
            stop_loss,
            reward_risk_ratio,
        }
    }
}

impl FilterThresholds {
    /// All four conditions hold
    pub fn passes(&self, row: &IndicatorRow, metrics: &SnapshotMetrics) -> bool {
        let trend_ok = row.ema20 >= row.ema50 * self.ema_crossover_margin;
        let momentum_ok = row.rsi14 > self.rsi_min && row.rsi14 < self.rsi_max;
        let position_ok = metrics.price_position_pct >= self.price_position_min
            && metrics.price_position_pct <= self.price_position_max;
        let volume_ok = metrics.volume_ratio > self.volume_ratio_min;

        trend_ok && momentum_ok && position_ok && volume_ok
    }
}

/// Weighted points of the scored rule set, 0..=6
pub fn bullish_score(row: &IndicatorRow, metrics: &SnapshotMetrics) -> u8 {
    let mut score = 0;

    if row.ema20 > row.ema50 {
        score += 2;
    } else if row.ema20 >= row.ema50 * 0.99 {
        score += 1;
    }

    if (55.0..=65.0).contains(&row.rsi14) {
        score += 1;
    } else if row.rsi14 > 65.0 {
        score += 2;
    }

    if row.close > row.ema20 {
        score += 1;
    }
    if metrics.volume_ratio > 1.2 {
        score += 1;
    }

    score
}

impl FilterRule {
    pub fn accepts(&self, row: &IndicatorRow, metrics: &SnapshotMetrics) -> bool {
        match self {
            FilterRule::Conditions(thresholds) => thresholds.passes(row, metrics),
            FilterRule::Scored { min_score } => bullish_score(row, metrics) >= *min_score,
        }
    }
}

/// Classify with the default four-condition filter
pub fn classify(symbol: &str, rows: &[IndicatorRow]) -> Option<CandidateRecord> {
    classify_with(symbol, rows, &FilterRule::default())
}

/// Evaluate the last row of `rows` against `rule`.
///
/// Returns `None` for empty input or when the rule rejects the snapshot.
pub fn classify_with(symbol: &str, rows: &[IndicatorRow], rule: &FilterRule) -> Option<CandidateRecord> {
    let last = rows.last()?;
    let metrics = SnapshotMetrics::from_row(last);

    if !rule.accepts(last, &metrics) {
        return None;
    }

    let plan = TradePlan::new(last.close, last.ema20);

    Some(CandidateRecord {
        symbol: symbol.to_string(),
        close: last.close,
        rsi: last.rsi14,
        ema20: last.ema20,
        ema50: last.ema50,
        trend_pct: metrics.trend_strength_pct,
        price_position_pct: metrics.price_position_pct,
        vol_ratio: metrics.volume_ratio,
        entry: plan.entry,
        target: plan.target,
        stop_loss: plan.stop_loss,
        reward_risk_ratio: plan.reward_risk_ratio,
    })
}

/// Descending by (trend, rsi, volume ratio); symbol ascending breaks exact ties
fn rank_order(a: &CandidateRecord, b: &CandidateRecord) -> Ordering {
    b.trend_pct
        .total_cmp(&a.trend_pct)
        .then_with(|| b.rsi.total_cmp(&a.rsi))
        .then_with(|| b.vol_ratio.total_cmp(&a.vol_ratio))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Sort candidates by the composite ranking key and keep the first `max_results`
pub fn rank_candidates(mut candidates: Vec<CandidateRecord>, max_results: usize) -> ScanResult {
    candidates.sort_by(rank_order);
    candidates.truncate(max_results);
    ScanResult::new(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(close: f64, ema20: f64, ema50: f64, rsi14: f64, volume: u64, avg_vol20: f64) -> IndicatorRow {
        IndicatorRow {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
            ema20,
            ema50,
            rsi14,
            avg_vol20,
        }
    }

    fn bullish_row() -> IndicatorRow {
        row(103.0, 101.0, 99.0, 60.0, 120_000, 100_000.0)
    }

    fn candidate(symbol: &str, trend_pct: f64, rsi: f64, vol_ratio: f64) -> CandidateRecord {
        CandidateRecord {
            symbol: symbol.to_string(),
            close: 100.0,
            rsi,
            ema20: 99.0,
            ema50: 98.0,
            trend_pct,
            price_position_pct: 101.0,
            vol_ratio,
            entry: 100.5,
            target: 103.515,
            stop_loss: 99.0,
            reward_risk_ratio: Some(2.01),
        }
    }

    #[test]
    fn empty_rows_yield_no_candidate() {
        assert!(classify("EMPTY.NS", &[]).is_none());
    }

    #[test]
    fn bullish_snapshot_passes_with_trade_plan() {
        let c = classify("GOOD.NS", &[bullish_row()]).unwrap();
        assert_eq!(c.symbol, "GOOD.NS");
        assert!((c.vol_ratio - 1.2).abs() < 1e-12);
        assert!((c.trend_pct - (2.0 / 99.0 * 100.0)).abs() < 1e-9);
        assert!((c.price_position_pct - (103.0 / 101.0 * 100.0)).abs() < 1e-9);
        assert!((c.entry - 103.515).abs() < 1e-9);
        assert!((c.target - 103.515 * 1.03).abs() < 1e-9);
        assert_eq!(c.stop_loss, 101.0);
        let expected_rr = (c.target - c.entry) / (c.entry - c.stop_loss);
        assert!((c.reward_risk_ratio.unwrap() - expected_rr).abs() < 1e-12);
    }

    #[test]
    fn only_last_row_is_examined() {
        let stale = row(50.0, 80.0, 120.0, 20.0, 10, 100_000.0);
        assert!(classify("X.NS", &[stale.clone(), bullish_row()]).is_some());
        assert!(classify("X.NS", &[bullish_row(), stale]).is_none());
    }

    #[test]
    fn each_condition_can_reject() {
        let mut trend = bullish_row();
        trend.ema50 = trend.ema20 / 0.98;
        assert!(classify("T", &[trend]).is_none());

        let mut overbought = bullish_row();
        overbought.rsi14 = 70.0;
        assert!(classify("R", &[overbought]).is_none());

        let mut weak = bullish_row();
        weak.rsi14 = 50.0;
        assert!(classify("R", &[weak]).is_none());

        let mut extended = bullish_row();
        extended.close = extended.ema20 * 1.09;
        assert!(classify("P", &[extended]).is_none());

        let mut quiet = bullish_row();
        quiet.volume = 90_000;
        assert!(classify("V", &[quiet]).is_none());
    }

    #[test]
    fn near_crossover_is_accepted() {
        // ema20 slightly below ema50 but within the 1% margin
        let r = row(101.0, 100.0, 100.5, 58.0, 100_000, 100_000.0);
        let c = classify("NEAR", &[r]).unwrap();
        assert!(c.trend_pct < 0.0);
    }

    #[test]
    fn zero_average_volume_counts_as_typical() {
        let r = row(103.0, 101.0, 99.0, 60.0, 0, 0.0);
        let metrics = SnapshotMetrics::from_row(&r);
        assert_eq!(metrics.volume_ratio, 1.0);
        assert!(classify("ZERO", &[r]).is_some());
    }

    #[test]
    fn lower_price_position_boundary_has_no_reward_risk() {
        // close / ema20 * 100 == 98 exactly: entry = 0.9849 * ema20 < stop loss
        let r = row(98.0, 100.0, 99.0, 60.0, 100_000, 100_000.0);
        let metrics = SnapshotMetrics::from_row(&r);
        assert_eq!(metrics.price_position_pct, 98.0);

        let c = classify("EDGE", &[r]).unwrap();
        assert!(c.entry < c.stop_loss);
        assert_eq!(c.reward_risk_ratio, None);
    }

    #[test]
    fn reward_risk_defined_above_break_even_position() {
        // 100 / 1.005 = 99.5025; just above it the entry clears the stop
        let below = TradePlan::new(99.50, 100.0);
        assert_eq!(below.reward_risk_ratio, None);

        let above = TradePlan::new(99.51, 100.0);
        assert!(above.entry > above.stop_loss);
        assert!(above.reward_risk_ratio.unwrap() > 0.0);

        // break-even close: entry lands on the stop
        let equal = TradePlan::new(100.0 / ENTRY_PREMIUM, 100.0);
        assert!(equal.entry <= equal.stop_loss);
        assert_eq!(equal.reward_risk_ratio, None);
    }

    #[test]
    fn classification_is_deterministic() {
        let rows = vec![bullish_row(); 3];
        assert_eq!(classify("D", &rows), classify("D", &rows));
    }

    #[test]
    fn scored_rule_uses_weighted_points() {
        let rule = FilterRule::scored();

        // trend 2 + rsi 2 (>65) + close above ema20 1 = 5
        let strong = row(103.0, 101.0, 99.0, 72.0, 100_000, 100_000.0);
        assert_eq!(bullish_score(&strong, &SnapshotMetrics::from_row(&strong)), 5);
        assert!(classify_with("S", &[strong.clone()], &rule).is_some());
        // overbought RSI fails the default rule
        assert!(classify("S", &[strong]).is_none());

        // trend 1 + rsi 1 + nothing else = 2
        let weak = row(99.0, 100.0, 100.5, 60.0, 100_000, 100_000.0);
        assert_eq!(bullish_score(&weak, &SnapshotMetrics::from_row(&weak)), 2);
        assert!(classify_with("W", &[weak], &rule).is_none());
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let strict = FilterRule::Conditions(FilterThresholds {
            volume_ratio_min: 1.5,
            ..FilterThresholds::default()
        });
        assert!(classify_with("C", &[bullish_row()], &strict).is_none());
    }

    #[test]
    fn ranking_sorts_lexicographically_and_truncates() {
        let mut input: Vec<CandidateRecord> = (0..20)
            .map(|i| candidate(&format!("S{i:02}"), (i % 5) as f64, 50.0 + i as f64, 1.0))
            .collect();
        input.push(candidate("TIE_B", 4.0, 69.0, 2.0));
        input.push(candidate("TIE_A", 4.0, 69.0, 2.0));

        let ranked = rank_candidates(input, ScanResult::DEFAULT_MAX_RESULTS);
        assert_eq!(ranked.len(), 12);
        assert_eq!(ranked.candidates[0].symbol, "TIE_A");
        assert_eq!(ranked.candidates[1].symbol, "TIE_B");

        for pair in ranked.candidates.windows(2) {
            let key = |c: &CandidateRecord| (c.trend_pct, c.rsi, c.vol_ratio);
            assert!(key(&pair[0]) >= key(&pair[1]), "{:?} before {:?}", pair[0].symbol, pair[1].symbol);
        }
    }

    #[test]
    fn ranking_ignores_insertion_order() {
        let a = vec![
            candidate("A", 1.0, 60.0, 1.0),
            candidate("B", 2.0, 55.0, 1.0),
            candidate("C", 2.0, 55.0, 1.5),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(rank_candidates(a, 12), rank_candidates(b, 12));
    }

    #[test]
    fn ranking_empty_input() {
        assert!(rank_candidates(Vec::new(), 12).is_empty());
    }
}
