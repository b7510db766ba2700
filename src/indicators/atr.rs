// =============================================================================
// Average True Range (ATR) — Wilder's smoothing
// =============================================================================
//
// True range per bar is max(high-low, |high-prev_close|, |low-prev_close|).
// ATR is Wilder's moving average of true range, the same recurrence
// `calculate_rsi` uses for its average gain/loss.

use crate::types::Bar;

/// True range series; one value per bar after the first (which has no prior
/// close to compare against).
fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let a = cur.high - cur.low;
            let b = (cur.high - prev.close).abs();
            let c = (cur.low - prev.close).abs();
            a.max(b).max(c)
        })
        .collect()
}

/// Full Wilder-smoothed ATR series. Empty when fewer than `period + 1` bars.
pub fn calculate_atr(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period + 1 {
        return Vec::new();
    }
    let tr = true_ranges(bars);
    let period_f = period as f64;

    let seed: f64 = tr[..period].iter().sum::<f64>() / period_f;
    let mut result = Vec::with_capacity(tr.len() - period + 1);
    let mut atr = seed;
    result.push(atr);

    for &t in &tr[period..] {
        atr = (atr * (period_f - 1.0) + t) / period_f;
        result.push(atr);
    }
    result
}

/// Most recent ATR as a fraction of the last close (e.g. 0.004 = 0.4%).
/// `None` on insufficient data or a non-positive close.
pub fn current_atr_pct(bars: &[Bar], period: usize) -> Option<f64> {
    let series = calculate_atr(bars, period);
    let atr = *series.last()?;
    let close = bars.last()?.close;
    if close <= 0.0 || !atr.is_finite() {
        return None;
    }
    Some(atr / close)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(h: f64, l: f64, c: f64) -> Bar {
        Bar { timestamp: 0, open: c, high: h, low: l, close: c, volume: 100.0, vwap: None }
    }

    #[test]
    fn atr_insufficient_data_is_empty() {
        let bars = vec![bar(101.0, 99.0, 100.0)];
        assert!(calculate_atr(&bars, 14).is_empty());
    }

    #[test]
    fn atr_flat_market_is_small() {
        let bars: Vec<Bar> = (0..20).map(|_| bar(100.5, 99.5, 100.0)).collect();
        let series = calculate_atr(&bars, 14);
        assert!(!series.is_empty());
        for &v in &series {
            assert!((v - 1.0).abs() < 1e-9, "expected TR=1.0, got {v}");
        }
    }

    #[test]
    fn current_atr_pct_scales_by_price() {
        let bars: Vec<Bar> = (0..20).map(|_| bar(202.0, 198.0, 200.0)).collect();
        let pct = current_atr_pct(&bars, 14).unwrap();
        assert!((pct - 0.02).abs() < 1e-6);
    }

    #[test]
    fn current_atr_pct_none_on_empty() {
        assert!(current_atr_pct(&[], 14).is_none());
    }
}
