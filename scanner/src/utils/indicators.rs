//! Indicator engine: EMA20, EMA50, RSI14 and the 20-bar average volume.
//!
//! Every series is aligned with its input (one slot per bar) and holds `None`
//! until the indicator has warmed up.

use crate::models::{IndicatorRow, PriceBar};

pub const EMA_FAST_PERIOD: usize = 20;
pub const EMA_SLOW_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const VOLUME_AVG_PERIOD: usize = 20;

/// Bars needed before every indicator is defined (EMA50 is the binding one)
pub const MIN_HISTORY_BARS: usize = EMA_SLOW_PERIOD;

/// Exponential moving average with smoothing factor `2 / (period + 1)`.
///
/// The first value sits at `period - 1` and is seeded with the simple average of
/// the first `period` inputs. A non-finite intermediate value ends the series.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    let multiplier = 2.0 / (period + 1) as f64;
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return result;
    }
    result[period - 1] = Some(seed);

    let mut prev = seed;
    for (i, &value) in values.iter().enumerate().skip(period) {
        let ema = value * multiplier + prev * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        result[i] = Some(ema);
        prev = ema;
    }

    result
}

/// Relative strength index with Wilder's smoothing.
///
/// The first value sits at index `period`: the simple average of the first
/// `period` gains and losses. Later values use
/// `avg = (prev_avg * (period - 1) + current) / period`.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return result;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    let (sum_gain, sum_loss) = deltas[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    match rsi_from_averages(avg_gain, avg_loss) {
        Some(rsi) => result[period] = Some(rsi),
        None => return result,
    }

    // deltas[i] is the change into closes[i + 1]
    for (i, &delta) in deltas.iter().enumerate().skip(period) {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => result[i + 1] = Some(rsi),
            None => break,
        }
    }

    result
}

/// RSI in [0, 100]; 100 with no losses, 50 when nothing moved
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };

    rsi.is_finite().then_some(rsi)
}

/// Trailing simple mean over `window` values, inclusive of the current one
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return result;
    }

    let mut sum: f64 = values[..window].iter().sum();
    result[window - 1] = Some(sum / window as f64);
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        result[i] = Some(sum / window as f64);
    }

    result
}

/// Compute indicator rows for one symbol's ascending daily history.
///
/// Rows whose indicators are not all defined are dropped. Histories shorter
/// than [`MIN_HISTORY_BARS`] produce an empty vector.
pub fn compute_indicators(history: &[PriceBar]) -> Vec<IndicatorRow> {
    if history.len() < MIN_HISTORY_BARS {
        return Vec::new();
    }

    let closes: Vec<f64> = history.iter().map(|bar| bar.close).collect();
    let volumes: Vec<f64> = history.iter().map(|bar| bar.volume as f64).collect();

    let ema20 = ema_series(&closes, EMA_FAST_PERIOD);
    let ema50 = ema_series(&closes, EMA_SLOW_PERIOD);
    let rsi14 = rsi_series(&closes, RSI_PERIOD);
    let avg_vol20 = rolling_mean(&volumes, VOLUME_AVG_PERIOD);

    history
        .iter()
        .enumerate()
        .filter_map(|(i, bar)| {
            Some(IndicatorRow::from_bar(
                bar,
                ema20[i]?,
                ema50[i]?,
                rsi14[i]?,
                avg_vol20[i]?,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars_from_closes(closes: &[f64], volume: u64) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                PriceBar::new(
                    start + chrono::Duration::days(i as i64),
                    close,
                    close * 1.01,
                    close * 0.99,
                    close,
                    volume + (i as u64 % 7) * 1_000,
                )
            })
            .collect()
    }

    fn wavy_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + i as f64 * 0.3 + ((i as f64) * 0.7).sin() * 2.5)
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = 1e-6 * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance,
            "got {actual}, expected {expected}"
        );
    }

    // Closed-form recomputation from raw closes, independent of the series helpers
    fn reference_ema(closes: &[f64], period: usize, upto: usize) -> f64 {
        let k = 2.0 / (period as f64 + 1.0);
        let mut ema = closes[..period].iter().sum::<f64>() / period as f64;
        for &c in &closes[period..=upto] {
            ema = c * k + ema * (1.0 - k);
        }
        ema
    }

    fn reference_rsi(closes: &[f64], period: usize, upto: usize) -> f64 {
        let mut gains = Vec::new();
        let mut losses = Vec::new();
        for i in 1..=upto {
            let d = closes[i] - closes[i - 1];
            gains.push(if d > 0.0 { d } else { 0.0 });
            losses.push(if d < 0.0 { -d } else { 0.0 });
        }
        let n = period as f64;
        let mut g = gains[..period].iter().sum::<f64>() / n;
        let mut l = losses[..period].iter().sum::<f64>() / n;
        for j in period..gains.len() {
            g = (g * (n - 1.0) + gains[j]) / n;
            l = (l * (n - 1.0) + losses[j]) / n;
        }
        if l == 0.0 {
            return if g == 0.0 { 50.0 } else { 100.0 };
        }
        100.0 - 100.0 / (1.0 + g / l)
    }

    #[test]
    fn ema_is_undefined_before_warm_up() {
        let values: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = ema_series(&values, 5);
        assert!(ema[..4].iter().all(Option::is_none));
        assert_close(ema[4].unwrap(), 3.0);
    }

    #[test]
    fn ema_follows_recursive_definition() {
        let values: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = ema_series(&values, 5);
        let k = 2.0 / 6.0;
        let mut expected = 3.0;
        for i in 5..10 {
            expected = values[i] * k + expected * (1.0 - k);
            assert_close(ema[i].unwrap(), expected);
        }
    }

    #[test]
    fn ema_handles_degenerate_input() {
        assert!(ema_series(&[], 5).is_empty());
        assert!(ema_series(&[1.0, 2.0], 0).iter().all(Option::is_none));
        assert!(ema_series(&[1.0, 2.0], 5).iter().all(Option::is_none));
    }

    #[test]
    fn ema_stops_at_non_finite_value() {
        let values = vec![1.0, 2.0, 3.0, f64::NAN, 5.0];
        let ema = ema_series(&values, 3);
        assert!(ema[2].is_some());
        assert!(ema[3].is_none());
        assert!(ema[4].is_none());
    }

    #[test]
    fn rsi_first_value_at_period() {
        let closes = wavy_closes(30);
        let rsi = rsi_series(&closes, 14);
        assert!(rsi[..14].iter().all(Option::is_none));
        assert!(rsi[14..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_extremes() {
        let rising: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert!(rsi_series(&rising, 14)[14..]
            .iter()
            .all(|v| (v.unwrap() - 100.0).abs() < 1e-10));

        let falling: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        assert!(rsi_series(&falling, 14)[14..]
            .iter()
            .all(|v| v.unwrap().abs() < 1e-10));

        let flat = vec![100.0; 30];
        assert!(rsi_series(&flat, 14)[14..]
            .iter()
            .all(|v| (v.unwrap() - 50.0).abs() < 1e-10));
    }

    #[test]
    fn rsi_stays_in_range() {
        let closes = wavy_closes(120);
        for value in rsi_series(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "RSI {value} out of range");
        }
    }

    #[test]
    fn rolling_mean_window() {
        let values: Vec<f64> = (1..=6).map(|x| x as f64).collect();
        let mean = rolling_mean(&values, 3);
        assert_eq!(mean[..2], [None, None]);
        assert_close(mean[2].unwrap(), 2.0);
        assert_close(mean[5].unwrap(), 5.0);
    }

    #[test]
    fn short_history_yields_no_rows() {
        assert!(compute_indicators(&bars_from_closes(&wavy_closes(10), 50_000)).is_empty());
        assert!(compute_indicators(&bars_from_closes(&wavy_closes(49), 50_000)).is_empty());
        assert!(compute_indicators(&[]).is_empty());
    }

    #[test]
    fn rows_start_once_ema50_is_defined() {
        let history = bars_from_closes(&wavy_closes(50), 50_000);
        let rows = compute_indicators(&history);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, history[49].date);

        let history = bars_from_closes(&wavy_closes(126), 50_000);
        let rows = compute_indicators(&history);
        assert_eq!(rows.len(), 126 - 49);
        assert_eq!(rows.last().unwrap().date, history.last().unwrap().date);
    }

    #[test]
    fn rows_match_closed_form_recomputation() {
        let closes = wavy_closes(90);
        let history = bars_from_closes(&closes, 80_000);
        let rows = compute_indicators(&history);

        for (offset, row) in rows.iter().enumerate() {
            let i = offset + 49;
            assert_close(row.close, closes[i]);
            assert_close(row.ema20, reference_ema(&closes, 20, i));
            assert_close(row.ema50, reference_ema(&closes, 50, i));
            assert_close(row.rsi14, reference_rsi(&closes, 14, i));

            let window = &history[i + 1 - 20..=i];
            let expected_vol = window.iter().map(|b| b.volume as f64).sum::<f64>() / 20.0;
            assert_close(row.avg_vol20, expected_vol);
        }
    }

    #[test]
    fn non_finite_close_truncates_rows() {
        let mut closes = wavy_closes(70);
        closes[60] = f64::NAN;
        let rows = compute_indicators(&bars_from_closes(&closes, 10_000));
        // rows 49..=59 survive; EMA series end at the NaN
        assert_eq!(rows.len(), 11);
    }
}
