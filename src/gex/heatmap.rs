// =============================================================================
// GammaHeatmap — strike x expiration grid of net dealer gamma exposure
// =============================================================================

use crate::broker::OptionContract;
use crate::gex::engine::GexEngine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub expiration: String,
    pub strike: f64,
    pub net_gex: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GammaHeatmap {
    pub spot: f64,
    pub cells: Vec<HeatmapCell>,
}

impl GammaHeatmap {
    /// Build a heatmap by grouping the chain by expiration and reusing
    /// `GexEngine::summarize` per-expiration slice for strike aggregation.
    pub fn build(chain: &[OptionContract], spot: f64) -> Self {
        let mut by_expiration: std::collections::BTreeMap<String, Vec<OptionContract>> = std::collections::BTreeMap::new();
        for c in chain {
            by_expiration.entry(c.expiration.clone()).or_default().push(c.clone());
        }

        let mut cells = Vec::new();
        for (expiration, contracts) in by_expiration {
            let summary = GexEngine::summarize(&contracts, spot);
            for row in summary.rows {
                cells.push(HeatmapCell {
                    expiration: expiration.clone(),
                    strike: row.strike,
                    net_gex: row.net_gex,
                });
            }
        }

        Self { spot, cells }
    }

    /// Nearest-term expiration present in the heatmap, if any.
    pub fn nearest_expiration(&self) -> Option<&str> {
        self.cells.iter().map(|c| c.expiration.as_str()).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Greeks, Quote};
    use crate::types::OptionSide;

    fn contract(strike: f64, expiration: &str, side: OptionSide, gamma: f64, oi: u64) -> OptionContract {
        OptionContract {
            underlying: "SPY".into(),
            strike,
            expiration: expiration.into(),
            side,
            open_interest: oi,
            implied_volatility: 0.2,
            greeks: Greeks { delta: 0.0, gamma, theta: 0.0, vega: 0.0, rho: 0.0 },
            quote: Quote::default(),
            volume: 0,
            osi: format!("SPY{expiration}{:?}", side),
            greeks_estimated: false,
        }
    }

    #[test]
    fn build_empty_chain_yields_empty_heatmap() {
        let hm = GammaHeatmap::build(&[], 500.0);
        assert!(hm.cells.is_empty());
        assert!(hm.nearest_expiration().is_none());
    }

    #[test]
    fn build_groups_by_expiration() {
        let chain = vec![
            contract(500.0, "2026-02-12", OptionSide::Call, 0.05, 1000),
            contract(500.0, "2026-02-19", OptionSide::Call, 0.05, 1000),
        ];
        let hm = GammaHeatmap::build(&chain, 500.0);
        let expirations: std::collections::HashSet<&str> = hm.cells.iter().map(|c| c.expiration.as_str()).collect();
        assert_eq!(expirations.len(), 2);
        assert_eq!(hm.nearest_expiration(), Some("2026-02-12"));
    }
}
