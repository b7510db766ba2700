// =============================================================================
// Macro — ETF-universe risk regime scoring
// =============================================================================
//
// Grounded on `regime/detector.rs`'s ordered-rule classification with a
// cached, timestamped state. Scores a small universe of macro ETFs (broad
// market, bonds, volatility, credit) into a single risk-appetite score, then
// maps that score to a regime label and a position-size multiplier.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::types::Bar;

/// How long a computed macro snapshot remains valid before a refresh is due.
pub const MACRO_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroRegime {
    RiskOn,
    Cautious,
    RiskOff,
}

impl std::fmt::Display for MacroRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MacroRegime::RiskOn => "RISK_ON",
            MacroRegime::Cautious => "CAUTIOUS",
            MacroRegime::RiskOff => "RISK_OFF",
        };
        write!(f, "{s}")
    }
}

impl MacroRegime {
    /// Position-size multiplier applied by downstream sizing logic.
    pub fn position_multiplier(self) -> f64 {
        match self {
            MacroRegime::RiskOn => 1.0,
            MacroRegime::Cautious => 0.6,
            MacroRegime::RiskOff => 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroSnapshot {
    pub regime: MacroRegime,
    pub score: f64,
    pub position_multiplier: f64,
    pub components: Vec<MacroComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroComponent {
    pub ticker: String,
    pub contribution: f64,
}

/// Risk-on threshold (inclusive, score >= this is RISK_ON).
const RISK_ON_THRESHOLD: f64 = 0.35;
/// Risk-off threshold (inclusive, score <= this is RISK_OFF).
const RISK_OFF_THRESHOLD: f64 = -0.35;

/// Fail-safe snapshot used when any input is missing: treats the macro
/// backdrop as unknown rather than favorable, per the fail-open-but-cautious
/// posture used for optional features elsewhere in the engine.
fn fail_safe_snapshot() -> MacroSnapshot {
    MacroSnapshot {
        regime: MacroRegime::Cautious,
        score: 0.0,
        position_multiplier: MacroRegime::Cautious.position_multiplier(),
        components: Vec::new(),
    }
}

/// One ETF in the macro universe and its weight in the composite score.
/// Positive weight means "rising price contributes to risk-on"; VIX-style
/// instruments get a negative weight since rising vol is risk-off.
pub struct MacroTicker {
    pub ticker: &'static str,
    pub weight: f64,
}

pub const MACRO_UNIVERSE: &[MacroTicker] = &[
    MacroTicker { ticker: "SPY", weight: 0.30 },
    MacroTicker { ticker: "QQQ", weight: 0.20 },
    MacroTicker { ticker: "IWM", weight: 0.15 },
    MacroTicker { ticker: "HYG", weight: 0.15 },
    MacroTicker { ticker: "TLT", weight: -0.10 },
    MacroTicker { ticker: "VXX", weight: -0.10 },
];

/// Score a single ticker's contribution from its recent daily bars: the
/// 5-day rate of change, clamped to [-1, 1] and scaled by its universe
/// weight.
fn ticker_contribution(weight: f64, bars: &[Bar]) -> Option<f64> {
    if bars.len() < 6 {
        return None;
    }
    let last = bars.last()?.close;
    let prior = bars[bars.len() - 6].close;
    if prior <= 0.0 || !last.is_finite() || !prior.is_finite() {
        return None;
    }
    let roc = (last - prior) / prior;
    let clamped = roc.clamp(-0.10, 0.10) / 0.10; // normalize a +/-10% 5-day move to +/-1
    Some(clamped * weight)
}

/// Compute a fresh macro snapshot from a map of ticker -> recent daily bars.
/// Missing tickers are skipped (their weight does not contribute); an empty
/// result (no ticker had enough data) falls back to `fail_safe_snapshot()`.
pub fn compute_snapshot(bars_by_ticker: &std::collections::HashMap<String, Vec<Bar>>) -> MacroSnapshot {
    let mut components = Vec::new();
    let mut score = 0.0;

    for mt in MACRO_UNIVERSE {
        let Some(bars) = bars_by_ticker.get(mt.ticker) else {
            warn!(ticker = mt.ticker, "macro ticker missing from bar set, skipping");
            continue;
        };
        match ticker_contribution(mt.weight, bars) {
            Some(c) => {
                score += c;
                components.push(MacroComponent { ticker: mt.ticker.to_string(), contribution: c });
            }
            None => {
                debug!(ticker = mt.ticker, "insufficient bars for macro contribution");
            }
        }
    }

    if components.is_empty() {
        return fail_safe_snapshot();
    }

    let regime = if score >= RISK_ON_THRESHOLD {
        MacroRegime::RiskOn
    } else if score <= RISK_OFF_THRESHOLD {
        MacroRegime::RiskOff
    } else {
        MacroRegime::Cautious
    };

    MacroSnapshot {
        regime,
        score,
        position_multiplier: regime.position_multiplier(),
        components,
    }
}

/// Thread-safe cache around `compute_snapshot`, refreshed at most every
/// `MACRO_CACHE_TTL`.
pub struct MacroCache {
    state: RwLock<Option<(MacroSnapshot, Instant)>>,
}

impl MacroCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { state: RwLock::new(None) })
    }

    /// Returns the cached snapshot if still fresh, else `None` (caller should
    /// fetch bars and call `refresh`).
    pub fn get_if_fresh(&self) -> Option<MacroSnapshot> {
        let guard = self.state.read();
        match guard.as_ref() {
            Some((snapshot, at)) if at.elapsed() < MACRO_CACHE_TTL => Some(snapshot.clone()),
            _ => None,
        }
    }

    pub fn refresh(&self, bars_by_ticker: &std::collections::HashMap<String, Vec<Bar>>) -> MacroSnapshot {
        let snapshot = compute_snapshot(bars_by_ticker);
        *self.state.write() = Some((snapshot.clone(), Instant::now()));
        snapshot
    }
}

impl Default for MacroCache {
    fn default() -> Self {
        Self { state: RwLock::new(None) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_with_trend(start: f64, daily_step: f64, count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| Bar {
                timestamp: i as i64 * 86_400,
                open: start + daily_step * i as f64,
                high: start + daily_step * i as f64 + 1.0,
                low: start + daily_step * i as f64 - 1.0,
                close: start + daily_step * i as f64,
                volume: 1_000_000.0,
                vwap: None,
            })
            .collect()
    }

    #[test]
    fn empty_input_fails_safe_to_cautious() {
        let map = std::collections::HashMap::new();
        let snap = compute_snapshot(&map);
        assert_eq!(snap.regime, MacroRegime::Cautious);
        assert!(snap.components.is_empty());
    }

    #[test]
    fn broad_rally_scores_risk_on() {
        let mut map = std::collections::HashMap::new();
        for mt in MACRO_UNIVERSE {
            let step = if mt.weight > 0.0 { 2.0 } else { -2.0 };
            map.insert(mt.ticker.to_string(), bars_with_trend(400.0, step, 10));
        }
        let snap = compute_snapshot(&map);
        assert_eq!(snap.regime, MacroRegime::RiskOn);
        assert!((snap.position_multiplier - 1.0).abs() < 1e-9);
    }

    #[test]
    fn broad_selloff_scores_risk_off() {
        let mut map = std::collections::HashMap::new();
        for mt in MACRO_UNIVERSE {
            let step = if mt.weight > 0.0 { -2.0 } else { 2.0 };
            map.insert(mt.ticker.to_string(), bars_with_trend(400.0, step, 10));
        }
        let snap = compute_snapshot(&map);
        assert_eq!(snap.regime, MacroRegime::RiskOff);
    }

    #[test]
    fn flat_tape_is_cautious() {
        let mut map = std::collections::HashMap::new();
        for mt in MACRO_UNIVERSE {
            map.insert(mt.ticker.to_string(), bars_with_trend(400.0, 0.0, 10));
        }
        let snap = compute_snapshot(&map);
        assert_eq!(snap.regime, MacroRegime::Cautious);
    }

    #[test]
    fn missing_ticker_is_skipped_not_fatal() {
        let mut map = std::collections::HashMap::new();
        map.insert("SPY".to_string(), bars_with_trend(400.0, 3.0, 10));
        let snap = compute_snapshot(&map);
        assert_eq!(snap.components.len(), 1);
    }

    #[test]
    fn cache_returns_none_when_empty() {
        let cache = MacroCache::new();
        assert!(cache.get_if_fresh().is_none());
    }

    #[test]
    fn cache_returns_fresh_snapshot_after_refresh() {
        let cache = MacroCache::new();
        let mut map = std::collections::HashMap::new();
        map.insert("SPY".to_string(), bars_with_trend(400.0, 1.0, 10));
        cache.refresh(&map);
        assert!(cache.get_if_fresh().is_some());
    }
}
