// =============================================================================
// Nearest support / resistance — recent swing pivots
// =============================================================================
//
// A swing low/high is a bar whose low/high is the lowest/highest within a
// `window`-bar radius on both sides. The nearest support is the closest swing
// low below the current price; nearest resistance is the closest swing high
// above it.

use crate::types::Bar;

const PIVOT_RADIUS: usize = 2;

fn swing_lows(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::new();
    if bars.len() < 2 * PIVOT_RADIUS + 1 {
        return out;
    }
    for i in PIVOT_RADIUS..bars.len() - PIVOT_RADIUS {
        let low = bars[i].low;
        let is_pivot = (i - PIVOT_RADIUS..=i + PIVOT_RADIUS).all(|j| bars[j].low >= low);
        if is_pivot {
            out.push(low);
        }
    }
    out
}

fn swing_highs(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::new();
    if bars.len() < 2 * PIVOT_RADIUS + 1 {
        return out;
    }
    for i in PIVOT_RADIUS..bars.len() - PIVOT_RADIUS {
        let high = bars[i].high;
        let is_pivot = (i - PIVOT_RADIUS..=i + PIVOT_RADIUS).all(|j| bars[j].high <= high);
        if is_pivot {
            out.push(high);
        }
    }
    out
}

/// Nearest support (below) and resistance (above) the last close, scanned
/// over the trailing `lookback` bars. Either side is `None` when no swing
/// pivot exists on that side.
pub fn nearest_support_resistance(bars: &[Bar], lookback: usize) -> (Option<f64>, Option<f64>) {
    if bars.is_empty() {
        return (None, None);
    }
    let start = bars.len().saturating_sub(lookback);
    let window = &bars[start..];
    let last_close = window.last().map(|b| b.close).unwrap_or(0.0);

    let support = swing_lows(window)
        .into_iter()
        .filter(|&low| low < last_close)
        .max_by(|a, b| a.partial_cmp(b).unwrap());

    let resistance = swing_highs(window)
        .into_iter()
        .filter(|&high| high > last_close)
        .min_by(|a, b| a.partial_cmp(b).unwrap());

    (support, resistance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(h: f64, l: f64, c: f64) -> Bar {
        Bar { timestamp: 0, open: c, high: h, low: l, close: c, volume: 100.0, vwap: None }
    }

    #[test]
    fn empty_bars_yield_none() {
        assert_eq!(nearest_support_resistance(&[], 20), (None, None));
    }

    #[test]
    fn finds_nearest_pivot_on_each_side() {
        let closes = [100.0, 99.0, 95.0, 99.0, 100.0, 101.0, 105.0, 101.0, 100.0];
        let bars: Vec<Bar> = closes.iter().map(|&c| bar(c + 0.2, c - 0.2, c)).collect();
        let (support, resistance) = nearest_support_resistance(&bars, 20);
        assert!(support.is_some());
        assert!(resistance.is_some());
        assert!(support.unwrap() < bars.last().unwrap().close);
        assert!(resistance.unwrap() > bars.last().unwrap().close);
    }

    #[test]
    fn too_few_bars_for_pivot_radius_yields_none() {
        let bars = vec![bar(101.0, 99.0, 100.0), bar(102.0, 100.0, 101.0)];
        assert_eq!(nearest_support_resistance(&bars, 20), (None, None));
    }
}
