// =============================================================================
// MACD (12, 26, 9)
// =============================================================================
//
// MACD line = EMA(12) - EMA(26), aligned on the tail of both series (the
// 26-EMA series is always shorter/equal, so we align on its length).
// Signal = 9-EMA of the MACD line. Histogram = MACD - signal.
// =============================================================================

use super::ema::calculate_ema;

#[derive(Debug, Clone, Copy)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the full MACD line (EMA12 - EMA26) over `closes`.
fn macd_line(closes: &[f64]) -> Vec<f64> {
    let ema12 = calculate_ema(closes, 12);
    let ema26 = calculate_ema(closes, 26);
    if ema12.is_empty() || ema26.is_empty() {
        return Vec::new();
    }
    // ema26 starts later (index 25) than ema12 (index 11); align by taking
    // the tails of equal length.
    let offset = ema12.len() - ema26.len();
    ema12[offset..]
        .iter()
        .zip(ema26.iter())
        .map(|(a, b)| a - b)
        .collect()
}

/// Compute MACD/signal/histogram for the most recent bar. Requires at least
/// 26 + 9 - 1 = 34 closes so the signal line itself has a seeded EMA.
pub fn calculate_macd(closes: &[f64]) -> Option<MacdResult> {
    let line = macd_line(closes);
    if line.len() < 9 {
        return None;
    }
    let signal_series = calculate_ema(&line, 9);
    let signal = *signal_series.last()?;
    let macd = *line.last()?;
    let histogram = macd - signal;
    if !macd.is_finite() || !signal.is_finite() || !histogram.is_finite() {
        return None;
    }
    Some(MacdResult {
        macd,
        signal,
        histogram,
    })
}
