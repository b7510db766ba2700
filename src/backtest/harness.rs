// =============================================================================
// BacktestHarness — deterministic bar replay over the live decision logic
// =============================================================================
//
// Drives the same `DirectionAssessor` used by `OptionsEngine::scan_for_entries`
// over a historical bar series, synthesizing the option chain it would have
// seen rather than calling a live `MarketDataGateway`. No randomness outside
// `stress::apply_stress`; no network calls.

use serde::{Deserialize, Serialize};

use super::ledger::{compute_metrics, BacktestMetrics, BacktestTrade};
use super::simulator::{self, SyntheticChainConfig};
use crate::assessor::{self, AssessmentInputs};
use crate::broker::OptionContract;
use crate::indicators::{calculate_macd, current_rsi, price_above_vwap};
use crate::macro_regime::MacroRegime;
use crate::types::{Bar, Direction, OptionSide};

const ROLLING_WINDOW: usize = 50;
const TRADING_YEAR_MINUTES: f64 = 252.0 * 390.0;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub underlying: String,
    pub scan_interval_bars: usize,
    pub skip_first_bars: usize,
    pub fixed_macro_regime: MacroRegime,
    pub min_conviction: i32,
    pub target_delta: f64,
    pub eod_close_minutes: i64,
    pub premium_stop_pct: f64,
    pub premium_target_pct: f64,
    pub max_hold_minutes: i64,
    pub time_stop_minutes: i64,
    pub slippage_pct: f64,
    pub commission_per_contract: f64,
    pub chain: SyntheticChainConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            underlying: "SPY".to_string(),
            scan_interval_bars: 5,
            skip_first_bars: 6,
            fixed_macro_regime: MacroRegime::Cautious,
            min_conviction: 3,
            target_delta: 0.40,
            eod_close_minutes: 15,
            premium_stop_pct: 0.40,
            premium_target_pct: 0.60,
            max_hold_minutes: 240,
            time_stop_minutes: 90,
            slippage_pct: 0.02,
            commission_per_contract: 0.65,
            chain: SyntheticChainConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitReason {
    EodClose,
    PremiumStop,
    ProfitTarget,
    MaxHoldTime,
    TimeStopNoProfit,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::EodClose => "eod_close",
            ExitReason::PremiumStop => "premium_stop",
            ExitReason::ProfitTarget => "profit_target",
            ExitReason::MaxHoldTime => "max_hold_time",
            ExitReason::TimeStopNoProfit => "time_stop_no_profit",
        };
        write!(f, "{s}")
    }
}

struct OpenPosition {
    direction: Direction,
    option_side: OptionSide,
    strike: f64,
    entry_spot: f64,
    entry_premium: f64,
    entry_time: i64,
}

/// Required conviction floor tightens as the close approaches; below 60
/// minutes to close the floor exceeds 10 and new entries are blocked
/// outright (conviction never exceeds 10).
fn theta_timing_floor(base: i32, minutes_to_close: i64) -> i32 {
    if minutes_to_close > 240 {
        base
    } else if minutes_to_close > 120 {
        base + 1
    } else if minutes_to_close > 60 {
        base + 2
    } else {
        11
    }
}

/// Reject a directional call that fights a strong opposing 5-bar momentum
/// read: bullish calls rejected when momentum < -10% and RSI > 55, and
/// symmetrically for bearish.
fn momentum_alignment_blocks(direction: Direction, momentum: f64, rsi: Option<f64>) -> bool {
    let rsi = rsi.unwrap_or(50.0);
    match direction {
        Direction::Bullish => momentum < -0.10 && rsi > 55.0,
        Direction::Bearish => momentum > 0.10 && rsi < 45.0,
    }
}

fn momentum_pct(window: &[Bar]) -> f64 {
    if window.len() < 6 {
        return 0.0;
    }
    let last = window.last().unwrap().close;
    let prior = window[window.len() - 6].close;
    if prior <= 0.0 {
        return 0.0;
    }
    (last - prior) / prior
}

fn minutes_to_close(bar_index: usize, total_bars: usize) -> i64 {
    // One bar assumed per minute; the final bar in the series is the close.
    ((total_bars - 1).saturating_sub(bar_index)) as i64
}

fn years_to_expiry(minutes_remaining: i64) -> f64 {
    (minutes_remaining.max(1) as f64 / TRADING_YEAR_MINUTES).max(1.0 / TRADING_YEAR_MINUTES)
}

fn select_contract(chain: &[OptionContract], side: OptionSide, target_delta: f64) -> Option<&OptionContract> {
    chain
        .iter()
        .filter(|c| c.side == side && c.is_well_formed() && c.quote.spread_pct().is_some())
        .min_by(|a, b| {
            let da = (a.greeks.delta.abs() - target_delta).abs();
            let db = (b.greeks.delta.abs() - target_delta).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Replay `bars` (oldest to newest, assumed one per minute within a single
/// trading session) through the scan/assess/enter/monitor/exit cycle,
/// returning the resulting trade ledger and aggregated metrics.
pub fn run_backtest(bars: &[Bar], config: &BacktestConfig) -> (Vec<BacktestTrade>, BacktestMetrics) {
    let mut trades = Vec::new();
    let mut open: Option<OpenPosition> = None;

    for i in 0..bars.len() {
        if let Some(pos) = open.take() {
            let spot = bars[i].close;
            let mtc = minutes_to_close(i, bars.len());
            let years = years_to_expiry(mtc);
            let premium = simulator::reprice(&config.chain, pos.option_side, spot, pos.strike, years);
            let hold_minutes = bars[i].timestamp.saturating_sub(pos.entry_time) / 60;
            let pnl_pct = if pos.entry_premium > 0.0 { (premium - pos.entry_premium) / pos.entry_premium } else { 0.0 };

            let reason = if mtc <= config.eod_close_minutes {
                Some(ExitReason::EodClose)
            } else if pnl_pct <= -config.premium_stop_pct {
                Some(ExitReason::PremiumStop)
            } else if pnl_pct >= config.premium_target_pct {
                Some(ExitReason::ProfitTarget)
            } else if hold_minutes >= config.max_hold_minutes {
                Some(ExitReason::MaxHoldTime)
            } else if hold_minutes >= config.time_stop_minutes && pnl_pct <= 0.0 {
                Some(ExitReason::TimeStopNoProfit)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    trades.push(close_trade(config, &pos, spot, premium, bars[i].timestamp, reason));
                }
                None => open = Some(pos),
            }
        }

        if open.is_some() {
            continue;
        }
        if i < config.skip_first_bars || i % config.scan_interval_bars != 0 {
            continue;
        }

        let window_start = i.saturating_sub(ROLLING_WINDOW);
        let window = &bars[window_start..=i];
        let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
        if closes.len() < 22 {
            continue;
        }

        let rsi = current_rsi(&closes, 14).map(|(v, _)| v);
        let macd_hist = calculate_macd(&closes).map(|m| m.histogram);
        let vwap_above = price_above_vwap(window);
        let momentum = momentum_pct(window);

        let inputs = AssessmentInputs {
            spot: Some(bars[i].close),
            rsi,
            macd_histogram: macd_hist,
            price_above_vwap: vwap_above,
            momentum_pct: Some(momentum),
            volume_surge: None,
            today_move_sigma: None,
            bollinger: None,
            is_choppy: None,
            atr_pct: None,
            gex_regime: None,
            call_wall: None,
            put_wall: None,
            gamma_flip: None,
            macro_regime: Some(config.fixed_macro_regime),
            mtf: None,
        };
        let assessment = assessor::assess(&inputs);
        let direction = assessment.direction;

        let mtc = minutes_to_close(i, bars.len());
        let required = theta_timing_floor(config.min_conviction, mtc);
        if assessment.conviction < required {
            continue;
        }

        if momentum_alignment_blocks(direction, momentum, rsi) {
            continue;
        }

        let spot = bars[i].close;
        let years = years_to_expiry(mtc);
        let expiration = "backtest-0dte";
        let chain = simulator::synthesize_chain(&config.chain, &config.underlying, spot, expiration, years);

        let option_side = match direction {
            Direction::Bullish => OptionSide::Call,
            Direction::Bearish => OptionSide::Put,
        };
        let Some(contract) = select_contract(&chain, option_side, config.target_delta) else { continue };

        open = Some(OpenPosition {
            direction,
            option_side,
            strike: contract.strike,
            entry_spot: spot,
            entry_premium: contract.quote.mid(),
            entry_time: bars[i].timestamp,
        });
    }

    // Force-close any position still open at the final bar.
    if let Some(pos) = open {
        let last = bars.last().expect("positions only open once bars is non-empty");
        let years = years_to_expiry(1);
        let premium = simulator::reprice(&config.chain, pos.option_side, last.close, pos.strike, years);
        trades.push(close_trade(config, &pos, last.close, premium, last.timestamp, ExitReason::EodClose));
    }

    let metrics = compute_metrics(&trades);
    (trades, metrics)
}

fn close_trade(
    config: &BacktestConfig,
    pos: &OpenPosition,
    exit_spot: f64,
    exit_premium: f64,
    exit_time: i64,
    reason: ExitReason,
) -> BacktestTrade {
    let slippage = (pos.entry_premium + exit_premium) * config.slippage_pct;
    let commission = config.commission_per_contract * 2.0;
    let gross_pnl = (exit_premium - pos.entry_premium) * 100.0;
    let net_pnl = gross_pnl - slippage * 100.0 - commission;
    let pnl_pct = if pos.entry_premium > 0.0 { (exit_premium - pos.entry_premium) / pos.entry_premium } else { 0.0 };
    let hold_minutes = exit_time.saturating_sub(pos.entry_time) / 60;

    BacktestTrade {
        underlying: config.underlying.clone(),
        direction: pos.direction,
        option_side: pos.option_side,
        strike: pos.strike,
        entry_spot: pos.entry_spot,
        exit_spot,
        entry_premium: pos.entry_premium,
        exit_premium,
        entry_time: pos.entry_time,
        exit_time,
        reason: reason.to_string(),
        gross_pnl,
        net_pnl,
        pnl_pct,
        hold_minutes,
        slippage: slippage * 100.0,
        commission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(i: i64, close: f64) -> Bar {
        Bar {
            timestamp: i * 60,
            open: close,
            high: close + 0.2,
            low: close - 0.2,
            close,
            volume: 10_000.0,
            vwap: Some(close),
        }
    }

    fn uptrend_session(n: usize) -> Vec<Bar> {
        (0..n).map(|i| bar(i as i64, 500.0 + i as f64 * 0.3)).collect()
    }

    #[test]
    fn flat_session_opens_no_trades_without_conviction() {
        let bars: Vec<Bar> = (0..100).map(|i| bar(i as i64, 500.0)).collect();
        let config = BacktestConfig::default();
        let (trades, _metrics) = run_backtest(&bars, &config);
        assert!(trades.is_empty());
    }

    #[test]
    fn trending_session_can_produce_a_trade() {
        let bars = uptrend_session(120);
        let config = BacktestConfig { min_conviction: 1, ..BacktestConfig::default() };
        let (trades, metrics) = run_backtest(&bars, &config);
        assert_eq!(metrics.total_trades, trades.len());
    }

    #[test]
    fn theta_timing_floor_tightens_near_close() {
        assert!(theta_timing_floor(3, 300) < theta_timing_floor(3, 100));
        assert!(theta_timing_floor(3, 50) > 10);
    }

    #[test]
    fn momentum_alignment_blocks_bullish_against_strong_downtrend() {
        assert!(momentum_alignment_blocks(Direction::Bullish, -0.15, Some(60.0)));
        assert!(!momentum_alignment_blocks(Direction::Bullish, -0.15, Some(40.0)));
    }

    #[test]
    fn force_close_happens_when_position_open_at_final_bar() {
        let bars = uptrend_session(30);
        let config = BacktestConfig {
            min_conviction: 1,
            skip_first_bars: 1,
            scan_interval_bars: 1,
            max_hold_minutes: 10_000,
            time_stop_minutes: 10_000,
            eod_close_minutes: 0,
            ..BacktestConfig::default()
        };
        let (trades, _metrics) = run_backtest(&bars, &config);
        if let Some(last) = trades.last() {
            assert_eq!(last.exit_time, bars.last().unwrap().timestamp);
        }
    }
}
