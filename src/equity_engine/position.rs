// =============================================================================
// Equity position tracking — stop-loss/take-profit/time-stop only
// =============================================================================
//
// A stripped-down sibling of `position_engine::PositionEngine`: equities have
// no theta or trailing-stop concept in this engine's scope, so the exit rule
// set is just the first three of the options engine's five, in the same
// priority order (stop-loss beats take-profit beats time-stop).

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquityTradeStatus {
    Open,
    ExitPending,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquityExitReason {
    StopLoss,
    TakeProfit,
    TimeStop,
}

impl std::fmt::Display for EquityExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EquityExitReason::StopLoss => "stop_loss",
            EquityExitReason::TakeProfit => "take_profit",
            EquityExitReason::TimeStop => "time_stop",
        };
        write!(f, "{s}")
    }
}

pub struct EquityExitInputs {
    pub side: Side,
    pub entry_price: f64,
    pub current_price: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub minutes_held: i64,
    pub max_hold_minutes: i64,
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

pub fn check_equity_exit(inputs: &EquityExitInputs) -> Option<EquityExitReason> {
    let pnl = pnl_pct(inputs.entry_price, inputs.current_price, inputs.side);

    if pnl <= -inputs.stop_loss_pct {
        return Some(EquityExitReason::StopLoss);
    }
    if pnl >= inputs.take_profit_pct {
        return Some(EquityExitReason::TakeProfit);
    }
    if inputs.minutes_held >= inputs.max_hold_minutes {
        return Some(EquityExitReason::TimeStop);
    }
    None
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityTrade {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    #[serde(default)]
    pub current_price: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_hold_minutes: i64,
    pub status: EquityTradeStatus,
    pub opened_at: i64,
    #[serde(default)]
    pub closed_at: Option<i64>,
    #[serde(default)]
    pub close_reason: Option<String>,
    #[serde(default)]
    pub realized_pnl: f64,
}

impl EquityTrade {
    fn minutes_held(&self, now: i64) -> i64 {
        ((now - self.opened_at).max(0)) / 60
    }

    fn exit_inputs(&self, now: i64) -> EquityExitInputs {
        EquityExitInputs {
            side: self.side,
            entry_price: self.entry_price,
            current_price: self.current_price,
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
            minutes_held: self.minutes_held(now),
            max_hold_minutes: self.max_hold_minutes,
        }
    }
}

pub struct OpenEquityTradeParams<'a> {
    pub symbol: &'a str,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_hold_minutes: i64,
}

pub struct EquityPositionEngine {
    open: RwLock<Vec<EquityTrade>>,
    closed: RwLock<Vec<EquityTrade>>,
}

impl EquityPositionEngine {
    pub fn new() -> Self {
        Self { open: RwLock::new(Vec::new()), closed: RwLock::new(Vec::new()) }
    }

    pub fn open_trade(&self, params: OpenEquityTradeParams) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();
        let trade = EquityTrade {
            id: id.clone(),
            symbol: params.symbol.to_string(),
            side: params.side,
            quantity: params.quantity,
            entry_price: params.entry_price,
            current_price: params.entry_price,
            stop_loss_pct: params.stop_loss_pct,
            take_profit_pct: params.take_profit_pct,
            max_hold_minutes: params.max_hold_minutes,
            status: EquityTradeStatus::Open,
            opened_at: now,
            closed_at: None,
            close_reason: None,
            realized_pnl: 0.0,
        };
        info!(id = %id, symbol = params.symbol, entry_price = params.entry_price, "equity trade opened");
        self.open.write().push(trade);
        id
    }

    pub fn update_quote(&self, symbol: &str, price: f64) {
        let mut open = self.open.write();
        for t in open.iter_mut().filter(|t| t.symbol == symbol && t.status == EquityTradeStatus::Open) {
            t.current_price = price;
        }
    }

    pub fn check_exits(&self) -> Vec<(String, EquityExitReason)> {
        let now = Utc::now().timestamp();
        let mut triggered = Vec::new();
        let mut open = self.open.write();
        for t in open.iter_mut().filter(|t| t.status == EquityTradeStatus::Open) {
            if let Some(reason) = check_equity_exit(&t.exit_inputs(now)) {
                t.status = EquityTradeStatus::ExitPending;
                triggered.push((t.id.clone(), reason));
            }
        }
        triggered
    }

    pub fn close_trade(&self, id: &str, close_price: f64, reason: &str) -> Option<f64> {
        let mut open = self.open.write();
        let idx = open.iter().position(|t| t.id == id)?;
        let mut trade = open.remove(idx);

        let direction = match trade.side {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        };
        let pnl = direction * (close_price - trade.entry_price) * trade.quantity;
        trade.realized_pnl = pnl;
        trade.current_price = close_price;
        trade.status = EquityTradeStatus::Closed;
        trade.closed_at = Some(Utc::now().timestamp());
        trade.close_reason = Some(reason.to_string());

        info!(id, reason, close_price, pnl, "equity trade closed");
        self.closed.write().push(trade);
        Some(pnl)
    }

    pub fn revert_exit_pending(&self, id: &str) {
        let mut open = self.open.write();
        if let Some(t) = open.iter_mut().find(|t| t.id == id) {
            t.status = EquityTradeStatus::Open;
        }
    }

    pub fn get_open_trades(&self) -> Vec<EquityTrade> {
        self.open.read().clone()
    }

    pub fn get_open_trade_for_symbol(&self, symbol: &str) -> Option<EquityTrade> {
        self.open.read().iter().find(|t| t.symbol == symbol).cloned()
    }

    pub fn get_closed_trades(&self, count: usize) -> Vec<EquityTrade> {
        let closed = self.closed.read();
        closed.iter().rev().take(count).cloned().collect()
    }
}

impl Default for EquityPositionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(symbol: &'static str) -> OpenEquityTradeParams<'static> {
        OpenEquityTradeParams {
            symbol,
            side: Side::Buy,
            quantity: 10.0,
            entry_price: 100.0,
            stop_loss_pct: 0.015,
            take_profit_pct: 0.025,
            max_hold_minutes: 120,
        }
    }

    #[test]
    fn open_trade_starts_open() {
        let engine = EquityPositionEngine::new();
        engine.open_trade(params("SPY"));
        assert_eq!(engine.get_open_trades().len(), 1);
    }

    #[test]
    fn stop_loss_triggers_exit_pending() {
        let engine = EquityPositionEngine::new();
        engine.open_trade(params("SPY"));
        engine.update_quote("SPY", 98.0); // -2%, past 1.5% stop
        let exits = engine.check_exits();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].1, EquityExitReason::StopLoss);
    }

    #[test]
    fn take_profit_triggers_exit_pending() {
        let engine = EquityPositionEngine::new();
        engine.open_trade(params("SPY"));
        engine.update_quote("SPY", 103.0); // +3%, past 2.5% target
        let exits = engine.check_exits();
        assert_eq!(exits[0].1, EquityExitReason::TakeProfit);
    }

    #[test]
    fn close_trade_computes_pnl_and_moves_to_closed() {
        let engine = EquityPositionEngine::new();
        let id = engine.open_trade(params("SPY"));
        let pnl = engine.close_trade(&id, 103.0, "take_profit").unwrap();
        assert!((pnl - 30.0).abs() < 1e-9);
        assert!(engine.get_open_trades().is_empty());
    }

    #[test]
    fn sell_side_inverts_pnl_direction() {
        let exit = check_equity_exit(&EquityExitInputs {
            side: Side::Sell,
            entry_price: 100.0,
            current_price: 98.0,
            stop_loss_pct: 0.015,
            take_profit_pct: 0.025,
            minutes_held: 0,
            max_hold_minutes: 120,
        });
        assert_eq!(exit, Some(EquityExitReason::TakeProfit));
    }
}
