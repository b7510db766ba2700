// =============================================================================
// CheckExits — priority-ordered exit rules for tracked options trades
// =============================================================================
//
// Grounded on `position_engine.rs`'s `check_exits()` priority ordering
// (stop-loss > take-profit-2 > take-profit-1-partial > trailing-stop),
// restructured as a pure function over a simpler `TrackedTrade` (no partial
// fills). Theta-timing is a backtest-only entry gate (see
// `backtest::harness::theta_timing_floor`), not one of these live exit rules.

use serde::{Deserialize, Serialize};

use crate::types::{OptionSide, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeStop,
    TrailingStop,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::TimeStop => "time_exit",
            ExitReason::TrailingStop => "trailing_stop",
        };
        write!(f, "{s}")
    }
}

/// Minimal view of a tracked options position needed to evaluate exits.
/// Lives alongside (not replacing) `TrackedTrade` so this module stays a
/// pure function of plain data — no engine-state coupling. `minutes_to_close`
/// drives the time-exit rule rather than `minutes_held`, per the contract's
/// own clock rather than the trade's age.
pub struct ExitInputs {
    pub side: Side,
    pub option_side: OptionSide,
    pub entry_price: f64,
    pub current_price: f64,
    pub highest_price: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub trailing_stop_pct: f64,
    pub minutes_to_close: i64,
    pub close_before_minutes: i64,
}

fn pnl_pct(entry: f64, current: f64, side: Side) -> f64 {
    if entry <= 0.0 {
        return 0.0;
    }
    match side {
        Side::Buy => (current - entry) / entry,
        Side::Sell => (entry - current) / entry,
    }
}

/// Evaluate exit rules in priority order, returning the first that fires.
/// Priority: stop-loss > take-profit > time-exit > trailing-stop.
pub fn check_exit(inputs: &ExitInputs) -> Option<ExitReason> {
    let pnl = pnl_pct(inputs.entry_price, inputs.current_price, inputs.side);

    if pnl <= -inputs.stop_loss_pct {
        return Some(ExitReason::StopLoss);
    }
    if pnl >= inputs.take_profit_pct {
        return Some(ExitReason::TakeProfit);
    }
    if inputs.minutes_to_close <= inputs.close_before_minutes {
        return Some(ExitReason::TimeStop);
    }
    if inputs.highest_price > inputs.entry_price {
        let drawdown_from_peak = (inputs.highest_price - inputs.current_price) / inputs.highest_price;
        if drawdown_from_peak >= inputs.trailing_stop_pct {
            return Some(ExitReason::TrailingStop);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> ExitInputs {
        ExitInputs {
            side: Side::Buy,
            option_side: OptionSide::Call,
            entry_price: 2.00,
            current_price: 2.00,
            highest_price: 2.00,
            stop_loss_pct: 0.40,
            take_profit_pct: 0.60,
            trailing_stop_pct: 0.25,
            minutes_to_close: 120,
            close_before_minutes: 5,
        }
    }

    #[test]
    fn no_exit_when_nothing_fires() {
        assert_eq!(check_exit(&base_inputs()), None);
    }

    #[test]
    fn stop_loss_fires_first() {
        let mut i = base_inputs();
        i.current_price = 1.00; // -50%
        assert_eq!(check_exit(&i), Some(ExitReason::StopLoss));
    }

    #[test]
    fn take_profit_fires_when_gain_exceeds_threshold() {
        let mut i = base_inputs();
        i.current_price = 3.30; // +65%
        assert_eq!(check_exit(&i), Some(ExitReason::TakeProfit));
    }

    #[test]
    fn time_stop_fires_near_close() {
        let mut i = base_inputs();
        i.minutes_to_close = 3;
        assert_eq!(check_exit(&i), Some(ExitReason::TimeStop));
    }

    #[test]
    fn trailing_stop_fires_on_retracement_from_peak() {
        let mut i = base_inputs();
        i.highest_price = 4.00;
        i.current_price = 2.90; // 27.5% off peak, above 25% trailing threshold
        assert_eq!(check_exit(&i), Some(ExitReason::TrailingStop));
    }

    #[test]
    fn trailing_stop_ignored_when_never_above_entry() {
        let mut i = base_inputs();
        i.highest_price = 2.00; // never moved up
        i.current_price = 1.70;
        // -15% move doesn't trip the 40% stop-loss either
        assert_eq!(check_exit(&i), None);
    }

    #[test]
    fn sell_side_pnl_direction_is_inverted() {
        let mut i = base_inputs();
        i.side = Side::Sell;
        i.current_price = 3.30; // price up is a loss for a short
        assert_eq!(check_exit(&i), Some(ExitReason::StopLoss));
    }
}
