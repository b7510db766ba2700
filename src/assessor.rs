// =============================================================================
// DirectionAssessor — fixed-point trigger table for direction and conviction
// =============================================================================
//
// Grounded on `signals/weighted_score.rs`'s accumulate-then-classify shape,
// but each trigger here contributes a fixed point value to one of two
// accumulators (`bull_points`/`bear_points`) rather than a weighted vote, per
// a table of trigger -> points documented once below and not scattered across
// call sites. Direction always resolves (bull >= bear is bullish); there is
// no abstention case.

use serde::{Deserialize, Serialize};

use crate::gex::engine::GexRegime;
use crate::indicators::BollingerBands;
use crate::macro_regime::MacroRegime;
use crate::mtf_ema::MtfEmaResult;
use crate::types::{Direction, Strategy};

/// Inputs available to the trigger table. Optional fields are `None` when
/// that upstream module failed open or the data wasn't available; a missing
/// input simply contributes nothing rather than failing the assessment.
pub struct AssessmentInputs<'a> {
    pub spot: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub price_above_vwap: Option<bool>,
    /// Fractional momentum over a short lookback, e.g. 0.002 = +0.2%.
    pub momentum_pct: Option<f64>,
    pub volume_surge: Option<bool>,
    /// Signed size of today's move in standard deviations of typical daily
    /// range; positive = up move.
    pub today_move_sigma: Option<f64>,
    pub bollinger: Option<BollingerBands>,
    pub is_choppy: Option<bool>,
    pub atr_pct: Option<f64>,
    pub gex_regime: Option<GexRegime>,
    pub call_wall: Option<f64>,
    pub put_wall: Option<f64>,
    pub gamma_flip: Option<f64>,
    pub macro_regime: Option<MacroRegime>,
    pub mtf: Option<&'a MtfEmaResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionAssessment {
    pub direction: Direction,
    pub bull_points: f64,
    pub bear_points: f64,
    /// dominant / total, in [0.0, 1.0]; 0.5 when both sides are tied.
    pub clarity: f64,
    /// Integer conviction in [1, 10].
    pub conviction: i32,
    pub strategy: Strategy,
    pub reasons: Vec<String>,
}

/// Push `points` to the bull or bear accumulator and record the reason.
fn fire(bull: &mut f64, bear: &mut f64, reasons: &mut Vec<String>, bullish: bool, points: f64, reason: &str) {
    if bullish {
        *bull += points;
    } else {
        *bear += points;
    }
    reasons.push(reason.to_string());
}

pub fn assess(inputs: &AssessmentInputs) -> DirectionAssessment {
    let mut bull = 0.0_f64;
    let mut bear = 0.0_f64;
    let mut reasons = Vec::new();

    // Macro RISK_ON / RISK_OFF -> +2 bull / bear.
    if let Some(regime) = inputs.macro_regime {
        match regime {
            MacroRegime::RiskOn => fire(&mut bull, &mut bear, &mut reasons, true, 2.0, "macro: RISK_ON"),
            MacroRegime::RiskOff => fire(&mut bull, &mut bear, &mut reasons, false, 2.0, "macro: RISK_OFF"),
            MacroRegime::Cautious => {}
        }
    }

    // GEX long-gamma + RSI extreme -> +2 mean-reversion.
    if let (Some(GexRegime::Positive), Some(rsi)) = (inputs.gex_regime, inputs.rsi) {
        if rsi < 35.0 {
            fire(&mut bull, &mut bear, &mut reasons, true, 2.0, "gex: long-gamma mean-reversion, RSI oversold");
        } else if rsi > 65.0 {
            fire(&mut bull, &mut bear, &mut reasons, false, 2.0, "gex: long-gamma mean-reversion, RSI overbought");
        }
    }

    // GEX short-gamma + momentum -> +2 trend-follow.
    if let (Some(GexRegime::Negative), Some(momentum)) = (inputs.gex_regime, inputs.momentum_pct) {
        if momentum > 0.0015 {
            fire(&mut bull, &mut bear, &mut reasons, true, 2.0, "gex: short-gamma trend-follow, momentum up");
        } else if momentum < -0.0015 {
            fire(&mut bull, &mut bear, &mut reasons, false, 2.0, "gex: short-gamma trend-follow, momentum down");
        }
    }

    // Spot near put/call wall (+/-0.5%) -> +1.5 bull / bear.
    if let Some(spot) = inputs.spot.filter(|s| *s > 0.0) {
        if let Some(put_wall) = inputs.put_wall {
            if ((spot - put_wall).abs() / spot) <= 0.005 {
                fire(&mut bull, &mut bear, &mut reasons, true, 1.5, "spot pinned near put wall");
            }
        }
        if let Some(call_wall) = inputs.call_wall {
            if ((spot - call_wall).abs() / spot) <= 0.005 {
                fire(&mut bull, &mut bear, &mut reasons, false, 1.5, "spot pinned near call wall");
            }
        }

        // Spot above/below gamma flip by >1% -> +1 bull / bear.
        if let Some(flip) = inputs.gamma_flip {
            let dist = (spot - flip) / spot;
            if dist > 0.01 {
                fire(&mut bull, &mut bear, &mut reasons, true, 1.0, "spot above gamma flip");
            } else if dist < -0.01 {
                fire(&mut bull, &mut bear, &mut reasons, false, 1.0, "spot below gamma flip");
            }
        }
    }

    // RSI extremes: <30/>70 -> +1.5; <40/>60 lean -> +0.5.
    if let Some(rsi) = inputs.rsi {
        if rsi < 30.0 {
            fire(&mut bull, &mut bear, &mut reasons, true, 1.5, "RSI oversold");
        } else if rsi > 70.0 {
            fire(&mut bull, &mut bear, &mut reasons, false, 1.5, "RSI overbought");
        } else if rsi < 40.0 {
            fire(&mut bull, &mut bear, &mut reasons, true, 0.5, "RSI leaning oversold");
        } else if rsi > 60.0 {
            fire(&mut bull, &mut bear, &mut reasons, false, 0.5, "RSI leaning overbought");
        }
    }

    // MACD histogram sign -> +1.
    if let Some(hist) = inputs.macd_histogram {
        if hist > 0.0 {
            fire(&mut bull, &mut bear, &mut reasons, true, 1.0, "MACD histogram bullish");
        } else if hist < 0.0 {
            fire(&mut bull, &mut bear, &mut reasons, false, 1.0, "MACD histogram bearish");
        }
    }

    // Price above/below VWAP -> +0.5.
    if let Some(above) = inputs.price_above_vwap {
        fire(&mut bull, &mut bear, &mut reasons, above, 0.5, if above { "price above VWAP" } else { "price below VWAP" });
    }

    // At lower/upper Bollinger band (within 0.2%) -> +1.
    if let (Some(bands), Some(spot)) = (&inputs.bollinger, inputs.spot) {
        let (at_lower, at_upper) = crate::indicators::band_touch(bands, spot, 0.002);
        if at_lower {
            fire(&mut bull, &mut bear, &mut reasons, true, 1.0, "at lower Bollinger band");
        } else if at_upper {
            fire(&mut bull, &mut bear, &mut reasons, false, 1.0, "at upper Bollinger band");
        }
    }

    // Volume surge + momentum sign -> +0.5 in that direction.
    if let (Some(true), Some(momentum)) = (inputs.volume_surge, inputs.momentum_pct) {
        if momentum > 0.0 {
            fire(&mut bull, &mut bear, &mut reasons, true, 0.5, "volume surge with upward momentum");
        } else if momentum < 0.0 {
            fire(&mut bull, &mut bear, &mut reasons, false, 0.5, "volume surge with downward momentum");
        }
    }

    // Today's move >= 1.5 sigma + momentum sign -> +1.
    if let Some(sigma) = inputs.today_move_sigma {
        if sigma >= 1.5 {
            fire(&mut bull, &mut bear, &mut reasons, true, 1.0, "today's move >= 1.5 sigma, up");
        } else if sigma <= -1.5 {
            fire(&mut bull, &mut bear, &mut reasons, false, 1.0, "today's move >= 1.5 sigma, down");
        }
    }

    // Choppiness > 3.0 -> -0.5 both.
    if inputs.is_choppy == Some(true) {
        bull = (bull - 0.5).max(0.0);
        bear = (bear - 0.5).max(0.0);
        reasons.push("choppiness penalty applied".to_string());
    }

    let direction = if bull >= bear { Direction::Bullish } else { Direction::Bearish };
    let dominant = bull.max(bear);
    let total = bull + bear;
    let clarity = if total > f64::EPSILON { dominant / total } else { 0.5 };

    let base_conviction = (dominant * clarity * 2.5).round().clamp(0.0, 10.0) as i32;
    let mtf_boost = inputs.mtf.map(|m| m.conviction_boost).unwrap_or(0);
    if mtf_boost != 0 {
        reasons.push(format!("mtf confluence boost: {mtf_boost:+}"));
    }
    let conviction = (base_conviction + mtf_boost).clamp(1, 10);

    let short_gamma = inputs.gex_regime == Some(GexRegime::Negative);
    let wide_atr = inputs.atr_pct.map(|a| a > 0.005).unwrap_or(false);
    let strategy = if short_gamma || wide_atr { Strategy::Swing } else { Strategy::Scalp };

    DirectionAssessment {
        direction,
        bull_points: bull,
        bear_points: bear,
        clarity,
        conviction,
        strategy,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::BollingerBands;

    fn empty_inputs() -> AssessmentInputs<'static> {
        AssessmentInputs {
            spot: None,
            rsi: None,
            macd_histogram: None,
            price_above_vwap: None,
            momentum_pct: None,
            volume_surge: None,
            today_move_sigma: None,
            bollinger: None,
            is_choppy: None,
            atr_pct: None,
            gex_regime: None,
            call_wall: None,
            put_wall: None,
            gamma_flip: None,
            macro_regime: None,
            mtf: None,
        }
    }

    #[test]
    fn all_none_inputs_still_resolve_a_direction() {
        let result = assess(&empty_inputs());
        assert_eq!(result.direction, Direction::Bullish); // bull(0) >= bear(0)
        assert_eq!(result.bull_points, 0.0);
        assert_eq!(result.bear_points, 0.0);
        assert_eq!(result.conviction, 1); // clamped floor
    }

    #[test]
    fn strong_bullish_consensus_yields_bullish_direction_and_high_conviction() {
        let mut inputs = empty_inputs();
        inputs.rsi = Some(25.0);
        inputs.macd_histogram = Some(0.8);
        inputs.price_above_vwap = Some(true);
        inputs.macro_regime = Some(MacroRegime::RiskOn);
        let result = assess(&inputs);
        assert_eq!(result.direction, Direction::Bullish);
        assert!(result.bull_points > result.bear_points);
        assert!(result.conviction >= 5);
    }

    #[test]
    fn strong_bearish_consensus_yields_bearish_direction() {
        let mut inputs = empty_inputs();
        inputs.rsi = Some(75.0);
        inputs.macd_histogram = Some(-0.8);
        inputs.price_above_vwap = Some(false);
        inputs.macro_regime = Some(MacroRegime::RiskOff);
        let result = assess(&inputs);
        assert_eq!(result.direction, Direction::Bearish);
        assert!(result.bear_points > result.bull_points);
    }

    #[test]
    fn gex_long_gamma_rsi_oversold_votes_bullish() {
        let mut inputs = empty_inputs();
        inputs.gex_regime = Some(GexRegime::Positive);
        inputs.rsi = Some(30.0);
        let result = assess(&inputs);
        assert!(result.reasons.iter().any(|r| r.contains("long-gamma mean-reversion")));
        assert_eq!(result.direction, Direction::Bullish);
    }

    #[test]
    fn gex_short_gamma_momentum_votes_with_trend() {
        let mut inputs = empty_inputs();
        inputs.gex_regime = Some(GexRegime::Negative);
        inputs.momentum_pct = Some(-0.003);
        let result = assess(&inputs);
        assert!(result.reasons.iter().any(|r| r.contains("short-gamma trend-follow")));
        assert_eq!(result.direction, Direction::Bearish);
    }

    #[test]
    fn wall_proximity_triggers_fire_within_half_percent() {
        let mut inputs = empty_inputs();
        inputs.spot = Some(500.0);
        inputs.put_wall = Some(498.0); // 0.4% away
        let result = assess(&inputs);
        assert!(result.bull_points >= 1.5);
    }

    #[test]
    fn bollinger_touch_at_lower_band_votes_bullish() {
        let mut inputs = empty_inputs();
        inputs.spot = Some(90.05);
        inputs.bollinger = Some(BollingerBands { upper: 110.0, middle: 100.0, lower: 90.0 });
        let result = assess(&inputs);
        assert!(result.reasons.iter().any(|r| r.contains("lower Bollinger")));
        assert!(result.bull_points >= 1.0);
    }

    #[test]
    fn choppiness_penalizes_both_sides_without_flipping_direction() {
        let mut inputs = empty_inputs();
        inputs.macro_regime = Some(MacroRegime::RiskOn);
        inputs.is_choppy = Some(true);
        let result = assess(&inputs);
        assert!(result.bull_points < 2.0);
        assert_eq!(result.direction, Direction::Bullish);
    }

    #[test]
    fn short_gamma_regime_prefers_swing_strategy() {
        let mut inputs = empty_inputs();
        inputs.gex_regime = Some(GexRegime::Negative);
        let result = assess(&inputs);
        assert_eq!(result.strategy, Strategy::Swing);
    }

    #[test]
    fn wide_atr_prefers_swing_even_in_long_gamma() {
        let mut inputs = empty_inputs();
        inputs.gex_regime = Some(GexRegime::Positive);
        inputs.atr_pct = Some(0.01);
        let result = assess(&inputs);
        assert_eq!(result.strategy, Strategy::Swing);
    }

    #[test]
    fn tight_atr_long_gamma_prefers_scalp() {
        let mut inputs = empty_inputs();
        inputs.gex_regime = Some(GexRegime::Positive);
        inputs.atr_pct = Some(0.002);
        let result = assess(&inputs);
        assert_eq!(result.strategy, Strategy::Scalp);
    }

    #[test]
    fn conviction_stays_within_one_to_ten() {
        let mtf = MtfEmaResult {
            readings: vec![],
            bullish_count: 7,
            bearish_count: 0,
            confluence: 1.0,
            consensus: Some(Direction::Bullish),
            conviction_boost: 2,
        };
        let mut inputs = empty_inputs();
        inputs.rsi = Some(10.0);
        inputs.macd_histogram = Some(2.0);
        inputs.price_above_vwap = Some(true);
        inputs.macro_regime = Some(MacroRegime::RiskOn);
        inputs.mtf = Some(&mtf);
        let result = assess(&inputs);
        assert!((1..=10).contains(&result.conviction));
    }
}
