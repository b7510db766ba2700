// =============================================================================
// PricingMath — Black-Scholes gamma/delta/price, normal PDF/CDF
// =============================================================================
//
// Standard Black-Scholes with a configurable risk-free rate (default in the
// 0.045-0.05 range). All guards return 0.0 rather than NaN/Inf so that
// downstream aggregation (GEX, backtest simulator) never has to special-case
// a poisoned value.
// =============================================================================

use std::f64::consts::PI;

/// Standard normal probability density function.
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal cumulative distribution function (Abramowitz & Stegun
/// 7.1.26 rational approximation, accurate to ~1.5e-7).
pub fn norm_cdf(x: f64) -> f64 {
    let b1 = 0.319_381_530;
    let b2 = -0.356_563_782;
    let b3 = 1.781_477_937;
    let b4 = -1.821_255_978;
    let b5 = 1.330_274_429;
    let p = 0.231_641_900;
    let c = 0.398_942_280_401_432_7; // 1/sqrt(2*pi)

    let z = x.abs();
    let t = 1.0 / (1.0 + p * z);
    let poly = t * (b1 + t * (b2 + t * (b3 + t * (b4 + t * b5))));
    let cdf = 1.0 - c * (-z * z / 2.0).exp() * poly;

    if x >= 0.0 {
        cdf
    } else {
        1.0 - cdf
    }
}

fn d1_d2(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> Option<(f64, f64)> {
    if s <= 0.0 || k <= 0.0 || sigma <= 0.0 || t <= 0.0 {
        return None;
    }
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt());
    let d2 = d1 - sigma * t.sqrt();
    if !d1.is_finite() || !d2.is_finite() {
        return None;
    }
    Some((d1, d2))
}

/// Black-Scholes gamma: identical formula for calls and puts.
/// Returns 0.0 on any invalid/degenerate input.
pub fn gamma(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    match d1_d2(s, k, r, sigma, t) {
        Some((d1, _)) => {
            let g = norm_pdf(d1) / (s * sigma * t.sqrt());
            if g.is_finite() { g } else { 0.0 }
        }
        None => 0.0,
    }
}

/// Black-Scholes call delta = Phi(d1). Returns 0.0 on invalid input.
pub fn delta_call(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    match d1_d2(s, k, r, sigma, t) {
        Some((d1, _)) => norm_cdf(d1),
        None => 0.0,
    }
}

/// Black-Scholes put delta = Phi(d1) - 1. Returns 0.0 on invalid input.
pub fn delta_put(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    match d1_d2(s, k, r, sigma, t) {
        Some((d1, _)) => norm_cdf(d1) - 1.0,
        None => 0.0,
    }
}

/// Black-Scholes call price. Returns 0.0 on invalid input.
pub fn call_price(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    match d1_d2(s, k, r, sigma, t) {
        Some((d1, d2)) => {
            let price = s * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2);
            if price.is_finite() { price.max(0.0) } else { 0.0 }
        }
        None => 0.0,
    }
}

/// Black-Scholes put price, derived from call price via put-call parity.
/// Returns 0.0 on invalid input.
pub fn put_price(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    if s <= 0.0 || k <= 0.0 || sigma <= 0.0 || t <= 0.0 {
        return 0.0;
    }
    let c = call_price(s, k, r, sigma, t);
    let put = c - s + k * (-r * t).exp();
    if put.is_finite() { put.max(0.0) } else { 0.0 }
}

/// Price and greeks bundle for a single contract evaluation.
#[derive(Debug, Clone, Copy)]
pub struct BlackScholesResult {
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
}

/// Convenience: price + delta + gamma for a call or put in one pass.
pub fn evaluate(s: f64, k: f64, r: f64, sigma: f64, t: f64, is_call: bool) -> BlackScholesResult {
    let g = gamma(s, k, r, sigma, t);
    if is_call {
        BlackScholesResult {
            price: call_price(s, k, r, sigma, t),
            delta: delta_call(s, k, r, sigma, t),
            gamma: g,
        }
    } else {
        BlackScholesResult {
            price: put_price(s, k, r, sigma, t),
            delta: delta_put(s, k, r, sigma, t),
            gamma: g,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_is_nonnegative_and_equal_for_call_and_put() {
        let (s, k, r, sigma, t) = (500.0, 500.0, 0.045, 0.2, 0.1);
        let gc = gamma(s, k, r, sigma, t);
        // Gamma formula has no call/put branch; re-derive to confirm equality.
        let gp = gamma(s, k, r, sigma, t);
        assert!(gc >= 0.0);
        assert!((gc - gp).abs() < 1e-12);
    }

    #[test]
    fn guards_return_zero_never_nan() {
        assert_eq!(gamma(0.0, 500.0, 0.045, 0.2, 0.1), 0.0);
        assert_eq!(gamma(500.0, 0.0, 0.045, 0.2, 0.1), 0.0);
        assert_eq!(gamma(500.0, 500.0, 0.045, 0.0, 0.1), 0.0);
        assert_eq!(gamma(500.0, 500.0, 0.045, 0.2, 0.0), 0.0);
        assert_eq!(gamma(500.0, 500.0, 0.045, 0.2, -1.0), 0.0);
        assert_eq!(call_price(500.0, 500.0, 0.045, 0.2, -1.0), 0.0);
        assert_eq!(put_price(500.0, 500.0, 0.045, 0.2, -1.0), 0.0);
    }

    #[test]
    fn call_delta_in_unit_range() {
        let d = delta_call(500.0, 495.0, 0.045, 0.2, 0.05);
        assert!((0.0..=1.0).contains(&d));
    }

    #[test]
    fn put_delta_in_negative_unit_range() {
        let d = delta_put(500.0, 505.0, 0.045, 0.2, 0.05);
        assert!((-1.0..=0.0).contains(&d));
    }

    #[test]
    fn deep_itm_call_delta_near_one() {
        let d = delta_call(600.0, 400.0, 0.045, 0.2, 0.05);
        assert!(d > 0.95);
    }

    #[test]
    fn deep_otm_call_delta_near_zero() {
        let d = delta_call(400.0, 600.0, 0.045, 0.2, 0.05);
        assert!(d < 0.05);
    }

    #[test]
    fn put_call_parity_holds() {
        let (s, k, r, sigma, t) = (500.0, 505.0, 0.045, 0.25, 0.1);
        let c = call_price(s, k, r, sigma, t);
        let p = put_price(s, k, r, sigma, t);
        let lhs = c - p;
        let rhs = s - k * (-r * t).exp();
        assert!((lhs - rhs).abs() < 1e-6);
    }

    #[test]
    fn norm_cdf_symmetry() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-9);
        assert!((norm_cdf(1.0) + norm_cdf(-1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn norm_pdf_peak_at_zero() {
        assert!(norm_pdf(0.0) > norm_pdf(1.0));
        assert!(norm_pdf(0.0) > norm_pdf(-1.0));
    }
}
