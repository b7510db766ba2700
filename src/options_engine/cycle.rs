// =============================================================================
// Cycle — the A-E per-tick state machine for the options engine
// =============================================================================
//
// Step A (accounting) is folded into Step B here: the gateway is the source
// of truth for fills, so "accounting" is just re-quoting open trades before
// the exit check runs. Step C (capacity) and Step D (scan) are ordinary
// functions rather than a formal state enum, matching the teacher's
// preference for a straight-line async function over a hand-rolled state
// machine type when the steps always run in the same order.

use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use super::OptionsEngine;
use crate::ai_adjudicator::{AdjudicationRequest, AiAction};
use crate::assessor::{self, AssessmentInputs};
use crate::audit_log::{AuditOutcome, AuditRecord};
use crate::broker::{OptionContract, OptionsOrderRequest, OrderType, TimeInForce};
use crate::gex::GexEngine;
use crate::indicators::{
    calculate_bollinger, calculate_choppiness, calculate_macd, current_atr_pct, current_rsi, price_above_vwap,
};
use crate::mtf_ema::{self, TIMEFRAMES};
use crate::policy::config::OptionsParams;
use crate::policy::{OptionsOrderContext, PolicyConfig};
use crate::position_engine::OpenTradeParams;
use crate::session;
use crate::types::{Bar, Direction, OptionSide, Side, Strategy};

#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub exits_triggered: usize,
    pub entries_opened: usize,
    pub skipped: Vec<String>,
}

pub async fn run_cycle(engine: &OptionsEngine) -> Result<CycleSummary> {
    let mut summary = CycleSummary::default();

    if let Some(reason) = engine.circuit_breaker.is_paused() {
        info!(reason, "options cycle skipped, circuit breaker paused");
        summary.skipped.push(reason);
        return Ok(summary);
    }

    summary.exits_triggered = monitor_open_trades(engine).await?;

    let config = engine.config.read().clone();

    if !config.options_enabled {
        summary.skipped.push("options engine disabled".to_string());
        return Ok(summary);
    }
    let now = Utc::now();
    if !session::is_market_hours(now) {
        summary.skipped.push("outside market hours".to_string());
        return Ok(summary);
    }
    if session::minutes_since_open(now) < 15 {
        summary.skipped.push("within opening 15 minutes of the session".to_string());
        return Ok(summary);
    }

    if config.underlyings.is_empty() {
        return Ok(summary);
    }
    let total_open = engine.positions.get_open_trades().len();
    if total_open >= config.max_concurrent_options_positions as usize {
        summary.skipped.push("max concurrent positions reached".to_string());
        return Ok(summary);
    }

    summary.entries_opened = scan_for_entries(engine, &config).await?;
    Ok(summary)
}

/// Step A/B: re-quote every open trade, then act on any exit the priority
/// rules trigger.
async fn monitor_open_trades(engine: &OptionsEngine) -> Result<usize> {
    let open = engine.positions.get_open_trades();
    let mut chains_by_underlying: HashMap<String, Vec<OptionContract>> = HashMap::new();

    for trade in &open {
        let chain = match chains_by_underlying.get(&trade.underlying) {
            Some(c) => c.clone(),
            None => {
                let fetched = engine.gateway.get_options_snapshots(&trade.underlying, None, None).await.unwrap_or_default();
                chains_by_underlying.insert(trade.underlying.clone(), fetched.clone());
                fetched
            }
        };
        if let Some(contract) = chain.iter().find(|c| c.osi == trade.osi_symbol) {
            engine.positions.update_quote(&trade.osi_symbol, contract.quote.mid());
        }
    }

    let close_before_minutes = engine.config.read().options.close_before_minutes;
    let minutes_to_close = session::minutes_to_close(Utc::now());
    let triggered = engine.positions.check_exits(minutes_to_close, close_before_minutes);
    let open_after_requote = engine.positions.get_open_trades();

    for (id, reason) in &triggered {
        let Some(trade) = open_after_requote.iter().find(|t| &t.id == id) else { continue };
        let close_price = trade.current_price;

        match engine.gateway.close_options_position(&trade.osi_symbol, Some(trade.quantity)).await {
            Ok(_ack) => {
                let pnl = engine.positions.close_trade(id, close_price, &reason.to_string()).unwrap_or(0.0);
                engine.circuit_breaker.record_exit(&trade.osi_symbol, pnl);
                engine.start_cooldown(&trade.underlying, engine.config.read().options.cooldown_secs);
                engine.audit.record(
                    AuditRecord::new(&trade.underlying, AuditOutcome::Exited).with_reason(reason.to_string()),
                );
            }
            Err(e) => {
                warn!(error = %e, osi = trade.osi_symbol, "close order failed, reverting to open");
                engine.positions.revert_exit_pending(id);
                engine.circuit_breaker.record_error();
                engine.audit.record(
                    AuditRecord::new(&trade.underlying, AuditOutcome::Error).with_reason(e.to_string()),
                );
            }
        }
    }

    Ok(triggered.len())
}

/// Step D: scan every configured underlying with no open position for a new
/// entry, gated by cooldown, a hard conviction floor, policy, and (if
/// enabled) the AI adjudicator.
async fn scan_for_entries(engine: &OptionsEngine, config: &PolicyConfig) -> Result<usize> {
    /// Conviction below this is never tradeable, independent of the
    /// config-driven `min_conviction` knob checked later against the AI's
    /// own conviction.
    const HARD_CONVICTION_FLOOR: i32 = 3;

    let mut opened = 0;
    let open_trades = engine.positions.get_open_trades();
    let total_open = open_trades.len();
    let minutes_to_close = session::minutes_to_close(Utc::now());

    for underlying in &config.underlyings {
        if open_trades.iter().any(|t| &t.underlying == underlying) {
            continue;
        }
        if engine.in_cooldown(underlying) {
            engine.audit.record(AuditRecord::new(underlying, AuditOutcome::SkippedByPolicy).with_reason("cooldown active"));
            continue;
        }

        let assessment = match assess_underlying(engine, underlying).await {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, underlying, "failed to assess underlying, skipping this cycle");
                continue;
            }
        };

        let direction = assessment.assessment.direction;
        if assessment.assessment.conviction < HARD_CONVICTION_FLOOR {
            engine.audit.record(
                AuditRecord::new(underlying, AuditOutcome::SkippedByPolicy)
                    .with_reason("conviction below hard floor"),
            );
            continue;
        }

        let mut option_side = match direction {
            Direction::Bullish => OptionSide::Call,
            Direction::Bearish => OptionSide::Put,
        };

        if config.enable_ai_adjudicator {
            if let Some(ai) = &engine.ai {
                let req = AdjudicationRequest {
                    underlying: underlying.clone(),
                    direction,
                    strategy: assessment.assessment.strategy.to_string(),
                    conviction: assessment.assessment.conviction,
                    gex_regime: assessment.gex_regime.to_string(),
                    macro_regime: assessment.macro_regime.to_string(),
                    minutes_to_close,
                    reasons: assessment.assessment.reasons.clone(),
                };
                if let Some(decision) = ai.adjudicate(&req).await {
                    match decision.action {
                        AiAction::Skip => {
                            engine.audit.record(
                                AuditRecord::new(underlying, AuditOutcome::SkippedByAi)
                                    .with_ai_verdict("SKIP")
                                    .with_reason(decision.reason),
                            );
                            continue;
                        }
                        AiAction::BuyCall => option_side = OptionSide::Call,
                        AiAction::BuyPut => option_side = OptionSide::Put,
                        AiAction::Buy => {}
                    }
                    if (decision.conviction.round() as i32) < config.options.min_conviction {
                        engine.audit.record(
                            AuditRecord::new(underlying, AuditOutcome::SkippedByAi)
                                .with_ai_verdict(format!("{:?}", decision.action))
                                .with_reason("AI conviction below configured minimum"),
                        );
                        continue;
                    }
                }
                // `None` (AI unreachable/unparseable) degrades to silent approval.
            }
        }

        let expirations = engine.gateway.get_option_expirations(underlying).await?;
        let Some(expiration) = expirations.into_iter().min() else {
            continue;
        };
        let chain = engine.gateway.get_options_snapshots(underlying, Some(&expiration), Some(option_side)).await?;

        let Some(contract) = select_contract(&chain, option_side, minutes_to_close, &config.options) else {
            engine.audit.record(AuditRecord::new(underlying, AuditOutcome::SkippedByPolicy).with_reason("no suitable contract in chain"));
            continue;
        };

        let ctx = OptionsOrderContext {
            underlying,
            contract,
            open_positions_for_underlying: 0,
            total_open_positions: total_open,
            trades_today: engine.trades_today_count(),
        };
        let eval = engine.policy.evaluate_options_order(&ctx);
        if !eval.allowed {
            engine.audit.record(
                AuditRecord::new(underlying, AuditOutcome::SkippedByPolicy).with_reason(eval.violations.join("; ")),
            );
            continue;
        }

        let mid = contract.quote.mid();
        let qty = contracts_for_budget(config.options.max_premium_per_trade, mid);
        if qty == 0 {
            continue;
        }
        let limit_price = round_to_cent(mid);

        let token = engine.policy.preview(&contract.osi, Side::Buy, qty as f64, mid);
        if engine.policy.validate_token(&token.token, &contract.osi).is_err() {
            continue;
        }

        let order = OptionsOrderRequest {
            osi_symbol: contract.osi.clone(),
            side: Side::Buy,
            qty,
            order_type: OrderType::Limit,
            limit_price: Some(limit_price),
            time_in_force: TimeInForce::Day,
        };

        let (take_profit_pct, stop_loss_pct) = match assessment.assessment.strategy {
            Strategy::Scalp => (config.options.scalp_take_profit_pct, config.options.scalp_stop_loss_pct),
            Strategy::Swing => (config.options.swing_take_profit_pct, config.options.swing_stop_loss_pct),
        };

        match engine.gateway.create_options_order(order).await {
            Ok(_ack) => {
                engine.positions.open_trade(OpenTradeParams {
                    osi_symbol: &contract.osi,
                    underlying,
                    option_side,
                    side: Side::Buy,
                    strategy: assessment.assessment.strategy,
                    quantity: qty,
                    entry_price: limit_price,
                    stop_loss_pct,
                    take_profit_pct,
                    trailing_stop_pct: config.options.trailing_stop_pct,
                });
                engine.increment_trades_today();
                opened += 1;
                engine.audit.record(
                    AuditRecord::new(underlying, AuditOutcome::Entered)
                        .with_direction(direction.to_string(), assessment.assessment.conviction as f64)
                        .with_regimes(assessment.gex_regime.to_string(), assessment.macro_regime.to_string()),
                );
            }
            Err(e) => {
                warn!(error = %e, underlying, "entry order failed");
                engine.circuit_breaker.record_error();
                engine.audit.record(AuditRecord::new(underlying, AuditOutcome::Error).with_reason(e.to_string()));
            }
        }
    }

    Ok(opened)
}

struct UnderlyingAssessment {
    assessment: assessor::DirectionAssessment,
    gex_regime: crate::gex::GexRegime,
    macro_regime: crate::macro_regime::MacroRegime,
}

async fn assess_underlying(engine: &OptionsEngine, underlying: &str) -> Result<UnderlyingAssessment> {
    let intraday = engine.gateway.get_intraday_bars(underlying, "5m", 60).await.unwrap_or_default();
    let closes: Vec<f64> = intraday.iter().map(|b| b.close).collect();
    let daily = engine.gateway.get_history(underlying, 20).await.unwrap_or_default();

    let spot = closes.last().copied();
    let rsi = current_rsi(&closes, 14).map(|(v, _)| v);
    let macd_hist = calculate_macd(&closes).map(|m| m.histogram);
    let vwap_above = price_above_vwap(&intraday);
    let momentum = momentum_pct(&closes);
    let surge = volume_surge(&intraday);
    let sigma = today_move_sigma(&intraday, &daily);
    let bollinger = calculate_bollinger(&closes, 20, 2.0);
    let is_choppy = calculate_choppiness(&intraday, 14).map(|r| r > 3.0);
    let atr_pct = current_atr_pct(&intraday, 14);

    let macro_snapshot = match engine.macro_cache.get_if_fresh() {
        Some(s) => s,
        None => {
            let bars = fetch_macro_bars(engine).await;
            engine.macro_cache.refresh(&bars)
        }
    };

    let gex_summary = match engine.gex_cache.get(underlying) {
        Some(g) => g,
        None => {
            let chain = engine.gateway.get_options_snapshots(underlying, None, None).await.unwrap_or_default();
            let gex_spot = spot.unwrap_or(0.0);
            let summary = GexEngine::summarize(&chain, gex_spot);
            engine.gex_cache.put(underlying, summary.clone());
            summary
        }
    };

    let mtf_closes = mtf_closes_for(engine, underlying).await;
    let mtf_result = mtf_ema::evaluate(&mtf_closes);

    let inputs = AssessmentInputs {
        spot,
        rsi,
        macd_histogram: macd_hist,
        price_above_vwap: vwap_above,
        momentum_pct: momentum,
        volume_surge: surge,
        today_move_sigma: sigma,
        bollinger,
        is_choppy,
        atr_pct,
        gex_regime: Some(gex_summary.regime),
        call_wall: gex_summary.nearest_call_wall().map(|w| w.strike),
        put_wall: gex_summary.nearest_put_wall().map(|w| w.strike),
        gamma_flip: gex_summary.flip_point,
        macro_regime: Some(macro_snapshot.regime),
        mtf: Some(&mtf_result),
    };

    Ok(UnderlyingAssessment {
        assessment: assessor::assess(&inputs),
        gex_regime: gex_summary.regime,
        macro_regime: macro_snapshot.regime,
    })
}

async fn fetch_macro_bars(engine: &OptionsEngine) -> HashMap<String, Vec<crate::types::Bar>> {
    let mut map = HashMap::new();
    for mt in crate::macro_regime::MACRO_UNIVERSE {
        match engine.gateway.get_history(mt.ticker, 10).await {
            Ok(bars) => {
                map.insert(mt.ticker.to_string(), bars);
            }
            Err(e) => warn!(error = %e, ticker = mt.ticker, "failed to fetch macro ticker history"),
        }
    }
    map
}

async fn mtf_closes_for(engine: &OptionsEngine, underlying: &str) -> HashMap<String, Vec<f64>> {
    let mut map = HashMap::new();
    for tf in TIMEFRAMES {
        let bars = if *tf == "1D" {
            engine.gateway.get_history(underlying, 40).await
        } else {
            engine.gateway.get_intraday_bars(underlying, tf, 40).await
        };
        match bars {
            Ok(b) => {
                map.insert(tf.to_string(), b.iter().map(|bar| bar.close).collect());
            }
            Err(e) => warn!(error = %e, underlying, timeframe = tf, "failed to fetch timeframe bars"),
        }
    }
    map
}

/// Fractional close-over-close move over the last 5 bars; `None` with fewer
/// than 6 closes.
fn momentum_pct(closes: &[f64]) -> Option<f64> {
    if closes.len() < 6 {
        return None;
    }
    let last = *closes.last()?;
    let prior = closes[closes.len() - 6];
    if prior == 0.0 {
        return None;
    }
    Some((last - prior) / prior)
}

/// Whether the most recent bar's volume exceeds 1.5x the average of the
/// preceding 10 bars. `None` with fewer than 11 bars or a zero-volume window.
fn volume_surge(bars: &[Bar]) -> Option<bool> {
    if bars.len() < 11 {
        return None;
    }
    let last_volume = bars.last()?.volume;
    let window = &bars[bars.len() - 11..bars.len() - 1];
    let avg = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
    if avg <= 0.0 {
        return None;
    }
    Some(last_volume > avg * 1.5)
}

/// Today's open-to-last-close move, in standard deviations of the daily
/// high-low range (as a fraction of open) over `daily`. `None` with fewer
/// than 5 daily bars or a degenerate (near-zero) standard deviation.
fn today_move_sigma(intraday: &[Bar], daily: &[Bar]) -> Option<f64> {
    let today_open = intraday.first()?.open;
    let today_last = intraday.last()?.close;
    if today_open == 0.0 {
        return None;
    }
    let today_move_pct = (today_last - today_open) / today_open;

    let ranges: Vec<f64> = daily.iter().filter(|b| b.open > 0.0).map(|b| (b.high - b.low) / b.open).collect();
    if ranges.len() < 5 {
        return None;
    }
    let mean = ranges.iter().sum::<f64>() / ranges.len() as f64;
    let variance = ranges.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / ranges.len() as f64;
    let stdev = variance.sqrt();
    if stdev <= f64::EPSILON {
        return None;
    }
    Some(today_move_pct / stdev)
}

fn round_to_cent(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Delta window widens as expiration nears, since 0DTE deltas move fast in
/// the final trading hours.
fn delta_window(minutes_to_close: i64, min_delta: f64, max_delta: f64) -> (f64, f64) {
    let widen = if minutes_to_close > 120 {
        0.0
    } else if minutes_to_close >= 60 {
        0.05
    } else {
        0.10
    };
    ((min_delta - widen).max(0.05), (max_delta + widen).min(0.90))
}

fn spread_tier(spread_pct: f64) -> f64 {
    if spread_pct < 0.05 {
        3.0
    } else if spread_pct < 0.10 {
        2.0
    } else if spread_pct < 0.15 {
        1.0
    } else {
        0.0
    }
}

fn delta_tier(delta_abs: f64) -> f64 {
    if (0.35..=0.45).contains(&delta_abs) {
        2.0
    } else if (0.30..=0.50).contains(&delta_abs) {
        1.0
    } else {
        0.0
    }
}

fn oi_tier(open_interest: u64) -> f64 {
    if open_interest > 1000 {
        2.0
    } else if open_interest > 500 {
        1.0
    } else if open_interest > 100 {
        0.5
    } else {
        0.0
    }
}

fn volume_tier(volume: u64) -> f64 {
    if volume > 100 {
        1.0
    } else if volume > 10 {
        0.5
    } else {
        0.0
    }
}

fn score_candidate(c: &OptionContract) -> f64 {
    let spread = c.quote.spread_pct().unwrap_or(1.0);
    spread_tier(spread) + delta_tier(c.greeks.delta.abs()) + oi_tier(c.open_interest) + volume_tier(c.volume)
}

fn max_spread_threshold(c: &OptionContract, configured: f64) -> f64 {
    if c.greeks_estimated {
        configured.max(0.20)
    } else {
        configured
    }
}

fn passes_filters(c: &OptionContract, side: OptionSide, lo: f64, hi: f64, oi_floor: u64, configured_spread: f64) -> bool {
    c.side == side
        && c.is_well_formed()
        && c.quote.bid > 0.0
        && c.quote.ask > 0.0
        && c.greeks.delta.abs() >= lo
        && c.greeks.delta.abs() <= hi
        && c.open_interest >= oi_floor
        && c.quote.spread_pct().map(|p| p <= max_spread_threshold(c, configured_spread)).unwrap_or(false)
}

/// Score every contract passing the delta/OI/spread filters and return the
/// highest-scoring one, preferring the tighter spread on ties. The open
/// interest floor relaxes to 100 if nothing in the configured chain clears
/// it; the delta window widens as expiration approaches.
fn select_contract(
    chain: &[OptionContract],
    side: OptionSide,
    minutes_to_close: i64,
    params: &OptionsParams,
) -> Option<&OptionContract> {
    let (lo, hi) = delta_window(minutes_to_close, params.min_delta, params.max_delta);

    let mut candidates: Vec<&OptionContract> =
        chain.iter().filter(|c| passes_filters(c, side, lo, hi, params.min_open_interest, params.max_spread_pct)).collect();
    if candidates.is_empty() {
        candidates = chain.iter().filter(|c| passes_filters(c, side, lo, hi, 100, params.max_spread_pct)).collect();
    }

    candidates.into_iter().max_by(|a, b| {
        score_candidate(a).partial_cmp(&score_candidate(b)).unwrap_or(std::cmp::Ordering::Equal).then_with(|| {
            let spread_a = a.quote.spread_pct().unwrap_or(f64::MAX);
            let spread_b = b.quote.spread_pct().unwrap_or(f64::MAX);
            spread_b.partial_cmp(&spread_a).unwrap_or(std::cmp::Ordering::Equal)
        })
    })
}

/// Contracts to buy given the per-trade premium budget and the contract's
/// mid price (dollars/share, multiplied by the 100-share contract unit).
/// Always buys at least 1 and never more than 3, even if the budget implies
/// otherwise.
fn contracts_for_budget(max_premium_per_trade: f64, mid_price: f64) -> u32 {
    if mid_price <= 0.0 {
        return 0;
    }
    let raw = (max_premium_per_trade / (mid_price * 100.0)).floor();
    raw.clamp(1.0, 3.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Greeks, Quote};

    fn contract(delta: f64, side: OptionSide, bid: f64, ask: f64, oi: u64, volume: u64) -> OptionContract {
        OptionContract {
            underlying: "SPY".into(),
            strike: 500.0,
            expiration: "2026-02-12".into(),
            side,
            open_interest: oi,
            implied_volatility: 0.2,
            greeks: Greeks { delta, gamma: 0.02, theta: -0.1, vega: 0.05, rho: 0.01 },
            quote: Quote { bid, ask, last: (bid + ask) / 2.0, bid_size: 10, ask_size: 10 },
            volume,
            osi: "SPY260212C00500000".into(),
            greeks_estimated: false,
        }
    }

    fn params() -> OptionsParams {
        OptionsParams::default()
    }

    #[test]
    fn select_contract_prefers_highest_composite_score() {
        let chain = vec![
            contract(0.20, OptionSide::Call, 1.0, 1.05, 2000, 500),
            contract(0.40, OptionSide::Call, 2.0, 2.05, 2000, 500),
            contract(0.70, OptionSide::Call, 3.0, 3.05, 2000, 500),
        ];
        let picked = select_contract(&chain, OptionSide::Call, 200, &params()).unwrap();
        assert!((picked.greeks.delta - 0.40).abs() < 1e-9);
    }

    #[test]
    fn select_contract_ignores_crossed_book() {
        let chain = vec![contract(0.40, OptionSide::Call, 3.0, 2.0, 2000, 500)];
        assert!(select_contract(&chain, OptionSide::Call, 200, &params()).is_none());
    }

    #[test]
    fn select_contract_none_on_empty_chain() {
        assert!(select_contract(&[], OptionSide::Call, 200, &params()).is_none());
    }

    #[test]
    fn select_contract_relaxes_oi_floor_when_nothing_clears_it() {
        let chain = vec![contract(0.40, OptionSide::Call, 2.0, 2.05, 150, 50)];
        let picked = select_contract(&chain, OptionSide::Call, 200, &params()).unwrap();
        assert_eq!(picked.open_interest, 150);
    }

    #[test]
    fn select_contract_widens_delta_window_near_close() {
        let chain = vec![contract(0.55, OptionSide::Call, 2.0, 2.05, 2000, 500)];
        assert!(select_contract(&chain, OptionSide::Call, 600, &params()).is_none());
        assert!(select_contract(&chain, OptionSide::Call, 30, &params()).is_some());
    }

    #[test]
    fn select_contract_tiebreaks_on_tighter_spread() {
        let chain = vec![
            contract(0.40, OptionSide::Call, 2.00, 2.10, 2000, 500),
            contract(0.40, OptionSide::Call, 2.00, 2.04, 2000, 500),
        ];
        let picked = select_contract(&chain, OptionSide::Call, 200, &params()).unwrap();
        assert!((picked.quote.ask - 2.04).abs() < 1e-9);
    }

    #[test]
    fn contracts_for_budget_floors_to_the_premium_cap() {
        assert_eq!(contracts_for_budget(300.0, 2.00), 1); // 300/200 = 1.5 -> 1
        assert_eq!(contracts_for_budget(900.0, 1.00), 3); // 900/100 = 9, clamped to 3
    }

    #[test]
    fn contracts_for_budget_never_goes_below_one() {
        assert_eq!(contracts_for_budget(50.0, 2.00), 1); // 50/200 = 0.25, floors to 0, clamped up to 1
    }

    #[test]
    fn contracts_for_budget_zero_on_zero_price() {
        assert_eq!(contracts_for_budget(300.0, 0.0), 0);
    }

    #[test]
    fn momentum_pct_needs_six_closes() {
        assert!(momentum_pct(&[1.0, 2.0, 3.0, 4.0, 5.0]).is_none());
        assert!(momentum_pct(&[100.0, 100.0, 100.0, 100.0, 100.0, 102.0]).is_some());
    }

    #[test]
    fn round_to_cent_rounds_half_up() {
        assert!((round_to_cent(1.005) - 1.01).abs() < 1e-9 || (round_to_cent(1.005) - 1.00).abs() < 1e-9);
        assert!((round_to_cent(2.344) - 2.34).abs() < 1e-9);
    }
}
