// =============================================================================
// Stress-test bar transforms
// =============================================================================
//
// Deterministic given a seed: `volatility_spike` is the only transform that
// consults the RNG, and it's seeded from a `StdRng` so the same seed always
// reproduces the same widened candles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressMode {
    Downtrend,
    VolatilitySpike,
    VReversal,
}

/// Apply a stress transform to a bar series. `bars` must be in chronological
/// order; the transform is applied in place conceptually but returns a new
/// `Vec` to keep the original series available for comparison.
pub fn apply_stress(bars: &[Bar], mode: StressMode, seed: u64) -> Vec<Bar> {
    match mode {
        StressMode::Downtrend => downtrend(bars),
        StressMode::VolatilitySpike => volatility_spike(bars, seed),
        StressMode::VReversal => v_reversal(bars),
    }
}

/// Linear -2% grind across the series: each bar's OHLC is scaled down by an
/// increasing fraction of 2% total drift, applied proportionally to the
/// bar's position in the series.
fn downtrend(bars: &[Bar]) -> Vec<Bar> {
    let n = bars.len().max(1) as f64;
    bars.iter()
        .enumerate()
        .map(|(i, b)| {
            let frac = i as f64 / n;
            let scale = 1.0 - 0.02 * frac;
            scale_bar(b, scale)
        })
        .collect()
}

/// Randomly widen each candle's high/low band, seeded for reproducibility.
fn volatility_spike(bars: &[Bar], seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    bars.iter()
        .map(|b| {
            let widen: f64 = rng.random_range(1.0..3.0);
            let mid = (b.high + b.low) / 2.0;
            let half_range = (b.high - b.low).max(0.01) * widen / 2.0;
            Bar {
                timestamp: b.timestamp,
                open: b.open,
                high: mid + half_range,
                low: (mid - half_range).max(0.0),
                close: b.close,
                volume: b.volume,
                vwap: b.vwap,
            }
        })
        .collect()
}

/// Down for the first half of the series, then back up: first half mirrors
/// `downtrend`'s scaling, second half reverses it symmetrically.
fn v_reversal(bars: &[Bar]) -> Vec<Bar> {
    let n = bars.len();
    if n == 0 {
        return Vec::new();
    }
    let mid = n / 2;
    bars.iter()
        .enumerate()
        .map(|(i, b)| {
            let scale = if i <= mid {
                1.0 - 0.02 * (i as f64 / mid.max(1) as f64)
            } else {
                let back_frac = (i - mid) as f64 / (n - mid).max(1) as f64;
                0.98 + 0.02 * back_frac
            };
            scale_bar(b, scale)
        })
        .collect()
}

fn scale_bar(b: &Bar, scale: f64) -> Bar {
    Bar {
        timestamp: b.timestamp,
        open: b.open * scale,
        high: b.high * scale,
        low: b.low * scale,
        close: b.close * scale,
        volume: b.volume,
        vwap: b.vwap.map(|v| v * scale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar {
                timestamp: i as i64 * 60,
                open: 500.0,
                high: 501.0,
                low: 499.0,
                close: 500.0,
                volume: 1000.0,
                vwap: Some(500.0),
            })
            .collect()
    }

    #[test]
    fn downtrend_ends_lower_than_it_starts() {
        let bars = apply_stress(&flat_bars(10), StressMode::Downtrend, 1);
        assert!(bars.last().unwrap().close < bars.first().unwrap().close);
    }

    #[test]
    fn volatility_spike_widens_range_and_is_deterministic() {
        let a = apply_stress(&flat_bars(10), StressMode::VolatilitySpike, 42);
        let b = apply_stress(&flat_bars(10), StressMode::VolatilitySpike, 42);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x.high - y.high).abs() < 1e-9);
        }
        assert!(a[0].high - a[0].low > 2.0);
    }

    #[test]
    fn v_reversal_dips_then_recovers() {
        let bars = apply_stress(&flat_bars(20), StressMode::VReversal, 1);
        let mid_close = bars[10].close;
        let start_close = bars[0].close;
        let end_close = bars[19].close;
        assert!(mid_close <= start_close);
        assert!(end_close >= mid_close);
    }
}
