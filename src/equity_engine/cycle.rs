// =============================================================================
// Equity cycle — monitor then scan, same two-phase shape as the options cycle
// =============================================================================

use anyhow::Result;
use tracing::{info, warn};

use super::position::{EquityExitInputs, OpenEquityTradeParams};
use super::EquityEngine;
use crate::assessor::{self, AssessmentInputs};
use crate::audit_log::{AuditOutcome, AuditRecord};
use crate::broker::{OrderRequest, OrderType, TimeInForce};
use crate::indicators::{calculate_macd, current_rsi, price_above_vwap};
use crate::mtf_ema::{self, TIMEFRAMES};
use crate::policy::PolicyConfig;
use crate::types::{Direction, Side};

#[derive(Debug, Clone, Default)]
pub struct EquityCycleSummary {
    pub exits_triggered: usize,
    pub entries_opened: usize,
}

pub async fn run_cycle(engine: &EquityEngine) -> Result<EquityCycleSummary> {
    let mut summary = EquityCycleSummary::default();

    if engine.circuit_breaker.is_paused().is_some() {
        return Ok(summary);
    }
    let config = engine.config.read().clone();
    if !config.enable_equity_engine {
        return Ok(summary);
    }

    summary.exits_triggered = monitor_open_trades(engine).await?;

    let open = engine.positions.get_open_trades();
    if open.len() >= config.max_concurrent_options_positions as usize {
        return Ok(summary);
    }

    summary.entries_opened = scan_for_entries(engine, &config).await?;
    Ok(summary)
}

async fn monitor_open_trades(engine: &EquityEngine) -> Result<usize> {
    let open = engine.positions.get_open_trades();
    for trade in &open {
        if let Ok(bars) = engine.gateway.get_intraday_bars(&trade.symbol, "1m", 1).await {
            if let Some(last) = bars.last() {
                engine.positions.update_quote(&trade.symbol, last.close);
            }
        }
    }

    let triggered = engine.positions.check_exits();
    let open_after = engine.positions.get_open_trades();

    for (id, reason) in &triggered {
        let Some(trade) = open_after.iter().find(|t| &t.id == id) else { continue };
        match engine.gateway.close_position(&trade.symbol, Some(trade.quantity)).await {
            Ok(_ack) => {
                let pnl = engine.positions.close_trade(id, trade.current_price, &reason.to_string()).unwrap_or(0.0);
                engine.circuit_breaker.record_exit(&trade.symbol, pnl);
                engine
                    .audit
                    .record(AuditRecord::new(&trade.symbol, AuditOutcome::Exited).with_reason(reason.to_string()));
            }
            Err(e) => {
                warn!(error = %e, symbol = trade.symbol, "equity close order failed, reverting to open");
                engine.positions.revert_exit_pending(id);
                engine.circuit_breaker.record_error();
            }
        }
    }

    Ok(triggered.len())
}

async fn scan_for_entries(engine: &EquityEngine, config: &PolicyConfig) -> Result<usize> {
    let mut opened = 0;
    let open = engine.positions.get_open_trades();

    for underlying in &config.underlyings {
        if open.iter().any(|t| &t.symbol == underlying) {
            continue;
        }

        let intraday = engine.gateway.get_intraday_bars(underlying, "5m", 60).await.unwrap_or_default();
        let closes: Vec<f64> = intraday.iter().map(|b| b.close).collect();
        let rsi = current_rsi(&closes, 14).map(|(v, _)| v);
        let macd_hist = calculate_macd(&closes).map(|m| m.histogram);
        let vwap_above = price_above_vwap(&intraday);

        let macro_snapshot = match engine.macro_cache.get_if_fresh() {
            Some(s) => s,
            None => continue, // macro refresh is the scheduler's job; skip this tick if stale
        };

        let mut mtf_closes = std::collections::HashMap::new();
        for tf in TIMEFRAMES {
            if let Ok(bars) = engine.gateway.get_intraday_bars(underlying, tf, 40).await {
                mtf_closes.insert(tf.to_string(), bars.iter().map(|b| b.close).collect());
            }
        }
        let mtf_result = mtf_ema::evaluate(&mtf_closes);

        let inputs = AssessmentInputs {
            spot: closes.last().copied(),
            rsi,
            macd_histogram: macd_hist,
            price_above_vwap: vwap_above,
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
            macro_regime: Some(macro_snapshot.regime),
            mtf: Some(&mtf_result),
        };
        let assessment = assessor::assess(&inputs);
        let direction = assessment.direction;

        let eval = engine.policy.evaluate(engine.policy_trades_today());
        if !eval.allowed {
            engine
                .audit
                .record(AuditRecord::new(underlying, AuditOutcome::SkippedByPolicy).with_reason(eval.violations.join("; ")));
            continue;
        }

        let Some(last_close) = closes.last().copied() else { continue };
        let account = engine.gateway.get_account().await?;
        let notional = account.equity * (config.equity.stop_loss_pct.max(0.01)) * macro_snapshot.position_multiplier * 10.0;
        let qty = (notional / last_close).floor();
        if qty < 1.0 {
            continue;
        }

        let side = match direction {
            Direction::Bullish => Side::Buy,
            Direction::Bearish => Side::Sell,
        };

        let token = engine.policy.preview(underlying, side, qty, last_close);
        if engine.policy.validate_token(&token.token, underlying).is_err() {
            continue;
        }

        let order = OrderRequest {
            symbol: underlying.clone(),
            side,
            qty: Some(qty),
            notional: None,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
            limit_price: None,
        };

        match engine.gateway.create_order(order).await {
            Ok(_ack) => {
                engine.positions.open_trade(OpenEquityTradeParams {
                    symbol: underlying,
                    side,
                    quantity: qty,
                    entry_price: last_close,
                    stop_loss_pct: config.equity.stop_loss_pct,
                    take_profit_pct: config.equity.take_profit_pct,
                    max_hold_minutes: config.equity.max_hold_minutes,
                });
                opened += 1;
                engine.audit.record(
                    AuditRecord::new(underlying, AuditOutcome::Entered)
                        .with_direction(direction.to_string(), assessment.conviction as f64)
                        .with_regimes("n/a", macro_snapshot.regime.to_string()),
                );
                info!(underlying, qty, "equity entry opened");
            }
            Err(e) => {
                warn!(error = %e, underlying, "equity entry order failed");
                engine.circuit_breaker.record_error();
            }
        }
    }

    Ok(opened)
}

impl EquityEngine {
    fn policy_trades_today(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::super::position::{check_equity_exit, EquityExitReason};
    use super::*;

    #[test]
    fn exit_inputs_direction_matches_reason_priority() {
        let exit = check_equity_exit(&EquityExitInputs {
            side: Side::Buy,
            entry_price: 100.0,
            current_price: 95.0,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.05,
            minutes_held: 0,
            max_hold_minutes: 100,
        });
        assert_eq!(exit, Some(EquityExitReason::StopLoss));
    }
}
