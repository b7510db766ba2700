// =============================================================================
// Volume-Weighted Average Price (VWAP) — cumulative over a session's bars
// =============================================================================

use crate::types::Bar;

/// Cumulative VWAP across `bars` (oldest first), using the typical price
/// (H+L+C)/3 weighted by volume. Returns `None` on an empty session or when
/// total volume is zero.
pub fn calculate_vwap(bars: &[Bar]) -> Option<f64> {
    if bars.is_empty() {
        return None;
    }
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    for bar in bars {
        let typical = (bar.high + bar.low + bar.close) / 3.0;
        cum_pv += typical * bar.volume;
        cum_vol += bar.volume;
    }
    if cum_vol <= 0.0 {
        return None;
    }
    let vwap = cum_pv / cum_vol;
    if vwap.is_finite() {
        Some(vwap)
    } else {
        None
    }
}

/// Whether the last bar's close sits above the session VWAP.
pub fn price_above_vwap(bars: &[Bar]) -> Option<bool> {
    let vwap = calculate_vwap(bars)?;
    let last = bars.last()?.close;
    Some(last > vwap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(h: f64, l: f64, c: f64, v: f64) -> Bar {
        Bar {
            timestamp: 0,
            open: c,
            high: h,
            low: l,
            close: c,
            volume: v,
            vwap: None,
        }
    }

    #[test]
    fn vwap_empty_is_none() {
        assert!(calculate_vwap(&[]).is_none());
    }

    #[test]
    fn vwap_zero_volume_is_none() {
        let bars = vec![bar(101.0, 99.0, 100.0, 0.0)];
        assert!(calculate_vwap(&bars).is_none());
    }

    #[test]
    fn vwap_single_bar_equals_typical_price() {
        let bars = vec![bar(102.0, 98.0, 100.0, 50.0)];
        let vwap = calculate_vwap(&bars).unwrap();
        assert!((vwap - 100.0).abs() < 1e-9);
    }

    #[test]
    fn price_above_vwap_detects_correctly() {
        let bars = vec![
            bar(100.0, 98.0, 99.0, 100.0),
            bar(105.0, 100.0, 104.0, 100.0),
        ];
        assert_eq!(price_above_vwap(&bars), Some(true));
    }
}
