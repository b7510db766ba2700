// =============================================================================
// Choppiness ratio — sideways-vs-trending gauge
// =============================================================================
//
// Ratio of cumulative true range to the net high-low range over the same
// window: a trending tape covers the range efficiently (ratio near 1), while
// a sideways tape churns back and forth and runs the ratio well above 1.

use crate::types::Bar;

/// Choppiness ratio over the trailing `period` bars. `None` when fewer than
/// `period + 1` bars are available or the high-low range collapses to zero.
pub fn calculate_choppiness(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let window = &bars[bars.len() - period - 1..];
    let tr_sum: f64 = window
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let a = cur.high - cur.low;
            let b = (cur.high - prev.close).abs();
            let c = (cur.low - prev.close).abs();
            a.max(b).max(c)
        })
        .sum();

    let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let range = highest - lowest;
    if range <= f64::EPSILON {
        return None;
    }
    let ratio = tr_sum / range;
    if ratio.is_finite() {
        Some(ratio)
    } else {
        None
    }
}

/// Whether the market is choppy enough to penalize directional conviction.
pub fn is_choppy(bars: &[Bar], period: usize) -> bool {
    calculate_choppiness(bars, period).map(|r| r > 3.0).unwrap_or(false)
}
