// =============================================================================
// Bollinger Bands — SMA(20) +/- 2 standard deviations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    /// Width of the band as a fraction of the middle band; collapses toward 0
    /// during a squeeze.
    pub fn width_pct(&self) -> f64 {
        if self.middle.abs() < f64::EPSILON {
            return 0.0;
        }
        (self.upper - self.lower) / self.middle
    }
}

/// Most recent Bollinger bands over `closes`, using the trailing `period`
/// window and `std_devs` standard deviations. `None` when fewer than `period`
/// closes are available.
pub fn calculate_bollinger(closes: &[f64], period: usize, std_devs: f64) -> Option<BollingerBands> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / period as f64;
    let std = variance.sqrt();
    if !std.is_finite() {
        return None;
    }
    Some(BollingerBands {
        upper: middle + std_devs * std,
        middle,
        lower: middle - std_devs * std,
    })
}

/// Whether the last close sits within `tolerance_pct` of the lower/upper band.
/// Returns `(at_lower, at_upper)`.
pub fn band_touch(bands: &BollingerBands, last_close: f64, tolerance_pct: f64) -> (bool, bool) {
    if bands.lower <= 0.0 || bands.upper <= 0.0 {
        return (false, false);
    }
    let at_lower = ((last_close - bands.lower) / bands.lower).abs() <= tolerance_pct;
    let at_upper = ((last_close - bands.upper) / bands.upper).abs() <= tolerance_pct;
    (at_lower, at_upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_insufficient_data_is_none() {
        assert!(calculate_bollinger(&[1.0, 2.0], 20, 2.0).is_none());
    }

    #[test]
    fn bollinger_flat_series_has_zero_width() {
        let closes = vec![100.0; 20];
        let bands = calculate_bollinger(&closes, 20, 2.0).unwrap();
        assert!((bands.middle - 100.0).abs() < 1e-9);
        assert!((bands.upper - bands.lower).abs() < 1e-9);
        assert!((bands.width_pct()).abs() < 1e-9);
    }

    #[test]
    fn bollinger_widens_with_volatility() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i as f64 % 2.0) * 5.0).collect();
        let bands = calculate_bollinger(&closes, 20, 2.0).unwrap();
        assert!(bands.upper > bands.middle);
        assert!(bands.lower < bands.middle);
    }

    #[test]
    fn band_touch_detects_lower_proximity() {
        let bands = BollingerBands { upper: 110.0, middle: 100.0, lower: 90.0 };
        let (at_lower, at_upper) = band_touch(&bands, 90.1, 0.01);
        assert!(at_lower);
        assert!(!at_upper);
    }

    #[test]
    fn band_touch_false_when_mid_range() {
        let bands = BollingerBands { upper: 110.0, middle: 100.0, lower: 90.0 };
        let (at_lower, at_upper) = band_touch(&bands, 100.0, 0.01);
        assert!(!at_lower);
        assert!(!at_upper);
    }
}
