// =============================================================================
// GexEngine — dealer gamma exposure aggregation, regime, walls, flip point
// =============================================================================
//
// Grounded on `regime/detector.rs`'s classify-with-confidence architecture:
// ordered priority rules producing a label plus a `remap()`-style linear
// interpolation helper, reused here for the gamma-flip strike.

use crate::broker::OptionContract;
use crate::types::OptionSide;
use serde::{Deserialize, Serialize};

/// Dealer gamma exposure at a single strike, aggregated across calls and puts
/// expiring on or before the horizon considered by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GexStrikeRow {
    pub strike: f64,
    pub call_gex: f64,
    pub put_gex: f64,
    pub net_gex: f64,
    pub call_oi: u64,
    pub put_oi: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GexRegime {
    Positive,
    Negative,
    Neutral,
}

impl std::fmt::Display for GexRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GexRegime::Positive => "positive",
            GexRegime::Negative => "negative",
            GexRegime::Neutral => "neutral",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wall {
    pub strike: f64,
    pub gex: f64,
    /// True when a second strike within one step carries >=70% of this
    /// wall's magnitude, i.e. the wall is reinforced rather than a lone spike.
    pub stacked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GexSummary {
    pub spot: f64,
    pub total_gex: f64,
    pub regime: GexRegime,
    pub confidence: f64,
    /// Largest-magnitude strikes first.
    pub call_walls: Vec<Wall>,
    pub put_walls: Vec<Wall>,
    pub flip_point: Option<f64>,
    pub rows: Vec<GexStrikeRow>,
}

impl GexSummary {
    /// Nearest call wall above spot, if any — the primary wall DirectionAssessor
    /// checks for proximity triggers.
    pub fn nearest_call_wall(&self) -> Option<&Wall> {
        self.call_walls.first()
    }

    pub fn nearest_put_wall(&self) -> Option<&Wall> {
        self.put_walls.first()
    }
}

/// Neutral-band threshold, as a fraction of notional spot^2, below which the
/// regime is reported `Neutral` rather than weakly positive/negative.
const NEUTRAL_BAND_FRACTION: f64 = 0.02;
/// Strike filter: only strikes within this fraction of spot are aggregated.
const STRIKE_WINDOW_FRACTION: f64 = 0.15;
/// Number of top-magnitude walls retained per side.
const MAX_WALLS_PER_SIDE: usize = 3;

pub struct GexEngine;

impl GexEngine {
    /// Contract-level dealer gamma exposure in dollars per 1% move, using the
    /// standard retail convention: dealers are long gamma on calls they've
    /// sold (positive) and short gamma on puts they've sold (negative).
    fn contract_gex(contract: &OptionContract, spot: f64) -> f64 {
        let gamma = contract.greeks.gamma;
        if !gamma.is_finite() || gamma <= 0.0 || !spot.is_finite() || spot <= 0.0 {
            return 0.0;
        }
        let notional = gamma * contract.open_interest as f64 * 100.0 * spot * spot * 0.01;
        match contract.side {
            OptionSide::Call => notional,
            OptionSide::Put => -notional,
        }
    }

    /// Aggregate a chain into per-strike rows within +/-15% of spot, compute
    /// the regime, walls, and gamma-flip point.
    pub fn summarize(chain: &[OptionContract], spot: f64) -> GexSummary {
        let lo = spot * (1.0 - STRIKE_WINDOW_FRACTION);
        let hi = spot * (1.0 + STRIKE_WINDOW_FRACTION);

        let mut by_strike: std::collections::BTreeMap<u64, GexStrikeRow> = std::collections::BTreeMap::new();
        for c in chain {
            if c.strike < lo || c.strike > hi {
                continue;
            }
            let key = (c.strike * 1000.0).round() as u64;
            let row = by_strike.entry(key).or_insert(GexStrikeRow {
                strike: c.strike,
                call_gex: 0.0,
                put_gex: 0.0,
                net_gex: 0.0,
                call_oi: 0,
                put_oi: 0,
            });
            let gex = Self::contract_gex(c, spot);
            match c.side {
                OptionSide::Call => {
                    row.call_gex += gex;
                    row.call_oi += c.open_interest;
                }
                OptionSide::Put => {
                    row.put_gex += gex;
                    row.put_oi += c.open_interest;
                }
            }
            row.net_gex = row.call_gex + row.put_gex;
        }

        let rows: Vec<GexStrikeRow> = by_strike.into_values().collect();
        let total_gex: f64 = rows.iter().map(|r| r.net_gex).sum();

        let notional_scale = spot * spot;
        let regime = if notional_scale <= 0.0 {
            GexRegime::Neutral
        } else if total_gex.abs() / notional_scale < NEUTRAL_BAND_FRACTION {
            GexRegime::Neutral
        } else if total_gex > 0.0 {
            GexRegime::Positive
        } else {
            GexRegime::Negative
        };

        let confidence = if notional_scale > 0.0 {
            (total_gex.abs() / notional_scale / (NEUTRAL_BAND_FRACTION * 5.0)).min(1.0)
        } else {
            0.0
        };

        let call_walls = Self::find_walls(&rows, true);
        let put_walls = Self::find_walls(&rows, false);
        let flip_point = Self::flip_point(&rows, spot);

        GexSummary {
            spot,
            total_gex,
            regime,
            confidence,
            call_walls,
            put_walls,
            flip_point,
            rows,
        }
    }

    /// Top `MAX_WALLS_PER_SIDE` strikes by gamma magnitude on one side, largest first.
    fn find_walls(rows: &[GexStrikeRow], call_side: bool) -> Vec<Wall> {
        let mut candidates: Vec<&GexStrikeRow> = rows
            .iter()
            .filter(|r| {
                let magnitude = if call_side { r.call_gex } else { r.put_gex };
                magnitude.abs() >= f64::EPSILON
            })
            .collect();
        candidates.sort_by(|a, b| {
            let ma = if call_side { a.call_gex } else { a.put_gex }.abs();
            let mb = if call_side { b.call_gex } else { b.put_gex }.abs();
            mb.partial_cmp(&ma).unwrap()
        });

        candidates
            .into_iter()
            .take(MAX_WALLS_PER_SIDE)
            .map(|candidate| {
                let magnitude = if call_side { candidate.call_gex } else { candidate.put_gex };
                let stacked = rows.iter().any(|r| {
                    if (r.strike - candidate.strike).abs() < f64::EPSILON {
                        return false;
                    }
                    let neighbor = if call_side { r.call_gex } else { r.put_gex };
                    neighbor.abs() >= magnitude.abs() * 0.7
                });
                Wall {
                    strike: candidate.strike,
                    gex: magnitude,
                    stacked,
                }
            })
            .collect()
    }

    /// Gamma-flip strike: linear interpolation between adjacent strikes whose
    /// cumulative net GEX (sorted by strike, running sum) crosses zero.
    fn flip_point(rows: &[GexStrikeRow], spot: f64) -> Option<f64> {
        if rows.is_empty() {
            return None;
        }
        let mut sorted: Vec<&GexStrikeRow> = rows.iter().collect();
        sorted.sort_by(|a, b| a.strike.partial_cmp(&b.strike).unwrap());

        let mut cumulative = 0.0;
        let mut prev_strike = sorted[0].strike;
        let mut prev_cum = 0.0;
        for (i, row) in sorted.iter().enumerate() {
            cumulative += row.net_gex;
            if i > 0 && prev_cum.signum() != cumulative.signum() && prev_cum != 0.0 {
                let span = row.strike - prev_strike;
                if span.abs() > f64::EPSILON {
                    let t = -prev_cum / (cumulative - prev_cum);
                    return Some(prev_strike + t * span);
                }
            }
            prev_strike = row.strike;
            prev_cum = cumulative;
        }
        let _ = spot;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Greeks, Quote};

    fn contract(strike: f64, side: OptionSide, gamma: f64, oi: u64) -> OptionContract {
        OptionContract {
            underlying: "SPY".into(),
            strike,
            expiration: "2026-02-12".into(),
            side,
            open_interest: oi,
            implied_volatility: 0.2,
            greeks: Greeks { delta: 0.0, gamma, theta: 0.0, vega: 0.0, rho: 0.0 },
            quote: Quote::default(),
            volume: 0,
            osi: format!("SPY260212{}{:08}", if side == OptionSide::Call { "C" } else { "P" }, (strike * 1000.0) as u64),
            greeks_estimated: false,
        }
    }

    #[test]
    fn summarize_empty_chain_is_neutral() {
        let s = GexEngine::summarize(&[], 500.0);
        assert_eq!(s.regime, GexRegime::Neutral);
        assert!(s.rows.is_empty());
        assert!(s.call_walls.is_empty());
    }

    #[test]
    fn call_heavy_chain_is_positive_regime() {
        let chain = vec![
            contract(505.0, OptionSide::Call, 0.05, 5000),
            contract(510.0, OptionSide::Call, 0.04, 4000),
        ];
        let s = GexEngine::summarize(&chain, 500.0);
        assert_eq!(s.regime, GexRegime::Positive);
        assert!(s.total_gex > 0.0);
    }

    #[test]
    fn put_heavy_chain_is_negative_regime() {
        let chain = vec![
            contract(495.0, OptionSide::Put, 0.05, 5000),
            contract(490.0, OptionSide::Put, 0.04, 4000),
        ];
        let s = GexEngine::summarize(&chain, 500.0);
        assert_eq!(s.regime, GexRegime::Negative);
        assert!(s.total_gex < 0.0);
    }

    #[test]
    fn strikes_outside_window_are_excluded() {
        let chain = vec![contract(1000.0, OptionSide::Call, 0.05, 5000)];
        let s = GexEngine::summarize(&chain, 500.0);
        assert!(s.rows.is_empty());
    }

    #[test]
    fn call_wall_picks_largest_positive_strike() {
        let chain = vec![
            contract(505.0, OptionSide::Call, 0.02, 1000),
            contract(510.0, OptionSide::Call, 0.08, 9000),
        ];
        let s = GexEngine::summarize(&chain, 500.0);
        let wall = s.nearest_call_wall().unwrap();
        assert!((wall.strike - 510.0).abs() < 1e-6);
        assert_eq!(s.call_walls.len(), 2);
    }

    #[test]
    fn zero_gamma_never_produces_nan() {
        let chain = vec![contract(500.0, OptionSide::Call, 0.0, 1000)];
        let s = GexEngine::summarize(&chain, 500.0);
        assert!(s.total_gex.is_finite());
    }

    #[test]
    fn flip_point_interpolates_between_sign_change() {
        let mut rows = vec![
            GexStrikeRow { strike: 495.0, call_gex: 0.0, put_gex: -100.0, net_gex: -100.0, call_oi: 0, put_oi: 100 },
            GexStrikeRow { strike: 500.0, call_gex: 200.0, put_gex: 0.0, net_gex: 200.0, call_oi: 100, put_oi: 0 },
        ];
        rows.sort_by(|a, b| a.strike.partial_cmp(&b.strike).unwrap());
        let flip = GexEngine::flip_point(&rows, 500.0);
        assert!(flip.is_some());
        let f = flip.unwrap();
        assert!(f > 495.0 && f < 500.0);
    }
}
