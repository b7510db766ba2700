// =============================================================================
// Synthetic option chain generator for backtesting
// =============================================================================
//
// Grounded on `goldspanlabs-optopsy-mcp`'s synthetic-chain generator: strikes
// are laid out around spot at a fixed increment, each priced with
// Black-Scholes plus a linear volatility smile, and wrapped into the same
// `OptionContract` shape the live gateway returns so contract-selection code
// never has to know it's looking at a simulation.

use crate::broker::{Greeks, OptionContract, Quote};
use crate::pricing;
use crate::types::OptionSide;

/// Tunables for the synthetic chain: base IV at the money, a linear skew
/// applied per dollar of distance from spot, and the risk-free rate used for
/// every BS evaluation.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticChainConfig {
    pub iv_base: f64,
    pub iv_skew: f64,
    pub risk_free_rate: f64,
    pub strike_increment: f64,
    pub strikes_each_side: u32,
    pub bid_ask_spread_pct: f64,
}

impl Default for SyntheticChainConfig {
    fn default() -> Self {
        Self {
            iv_base: 0.18,
            iv_skew: 0.0004,
            risk_free_rate: 0.045,
            strike_increment: 1.0,
            strikes_each_side: 15,
            bid_ask_spread_pct: 0.03,
        }
    }
}

/// Implied vol for a strike: base plus a smile term linear in distance from
/// spot, per the spec's `iv_base + iv_skew * |strike - spot|`.
fn smile_iv(config: &SyntheticChainConfig, spot: f64, strike: f64) -> f64 {
    (config.iv_base + config.iv_skew * (strike - spot).abs()).max(0.01)
}

/// Round `spot` down to the nearest `increment` to anchor the strike ladder.
fn nearest_strike(spot: f64, increment: f64) -> f64 {
    (spot / increment).round() * increment
}

/// Build a synthetic one-expiration option chain priced off `spot` with
/// `years_to_expiry` remaining. `osi_suffix` is the OSI expiration+side
/// encoding used to build each contract's canonical identifier.
pub fn synthesize_chain(
    config: &SyntheticChainConfig,
    underlying: &str,
    spot: f64,
    expiration: &str,
    years_to_expiry: f64,
) -> Vec<OptionContract> {
    let center = nearest_strike(spot, config.strike_increment);
    let mut chain = Vec::new();

    for i in -(config.strikes_each_side as i64)..=(config.strikes_each_side as i64) {
        let strike = center + i as f64 * config.strike_increment;
        if strike <= 0.0 {
            continue;
        }
        let iv = smile_iv(config, spot, strike);

        for side in [OptionSide::Call, OptionSide::Put] {
            let is_call = side == OptionSide::Call;
            let result = pricing::evaluate(spot, strike, config.risk_free_rate, iv, years_to_expiry, is_call);
            let mid = result.price.max(0.01);
            let half_spread = mid * config.bid_ask_spread_pct / 2.0;

            chain.push(OptionContract {
                underlying: underlying.to_string(),
                strike,
                expiration: expiration.to_string(),
                side,
                open_interest: 500,
                implied_volatility: iv,
                greeks: Greeks { delta: result.delta, gamma: result.gamma, theta: 0.0, vega: 0.0, rho: 0.0 },
                quote: Quote {
                    bid: (mid - half_spread).max(0.01),
                    ask: mid + half_spread,
                    last: mid,
                    bid_size: 10,
                    ask_size: 10,
                },
                volume: 50,
                osi: crate::chain::build_osi(underlying, expiration, side, strike).unwrap_or_default(),
                greeks_estimated: false,
            });
        }
    }

    chain
}

/// Re-price a single contract against a new spot/time-to-expiry, as the
/// harness does on every subsequent bar while a simulated position is open.
pub fn reprice(config: &SyntheticChainConfig, side: OptionSide, spot: f64, strike: f64, years_to_expiry: f64) -> f64 {
    let iv = smile_iv(config, spot, strike);
    let is_call = side == OptionSide::Call;
    pricing::evaluate(spot, strike, config.risk_free_rate, iv, years_to_expiry, is_call).price
}
