// =============================================================================
// Position Engine — TrackedTrade state machine for options positions
// =============================================================================
//
// Life-cycle: Open -> ExitPending -> Closed. Simpler than the teacher's
// Open/PartialTP1/Closed machine (no partial-quantity closes — an options
// contract either stays open at full size or is fully closed) but keeps its
// RwLock<Vec<_>> open/closed split and `check_exits`-driven transition.
//
// `ExitPending` exists so a close order can be in flight (submitted, not yet
// confirmed by the broker) without a second scheduler tick re-submitting it.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::policy::exits::{check_exit, ExitInputs, ExitReason};
use crate::types::{OptionSide, Side, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Open,
    ExitPending,
    Closed,
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TradeStatus::Open => "Open",
            TradeStatus::ExitPending => "ExitPending",
            TradeStatus::Closed => "Closed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedTrade {
    pub id: String,
    pub osi_symbol: String,
    pub underlying: String,
    pub option_side: OptionSide,
    pub side: Side,
    pub strategy: Strategy,
    pub quantity: u32,
    pub entry_price: f64,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub highest_price: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub trailing_stop_pct: f64,
    pub status: TradeStatus,
    pub opened_at: i64,
    #[serde(default)]
    pub closed_at: Option<i64>,
    #[serde(default)]
    pub close_reason: Option<String>,
    #[serde(default)]
    pub realized_pnl: f64,
}

impl TrackedTrade {
    /// `minutes_to_close`/`close_before_minutes` come from the session clock
    /// and config respectively, not from the trade itself — every 0DTE
    /// contract shares the same close.
    fn exit_inputs(&self, minutes_to_close: i64, close_before_minutes: i64) -> ExitInputs {
        ExitInputs {
            side: self.side,
            option_side: self.option_side,
            entry_price: self.entry_price,
            current_price: self.current_price,
            highest_price: self.highest_price,
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
            trailing_stop_pct: self.trailing_stop_pct,
            minutes_to_close,
            close_before_minutes,
        }
    }
}

pub struct PositionEngine {
    open: RwLock<Vec<TrackedTrade>>,
    closed: RwLock<Vec<TrackedTrade>>,
}

#[allow(clippy::too_many_arguments)]
pub struct OpenTradeParams<'a> {
    pub osi_symbol: &'a str,
    pub underlying: &'a str,
    pub option_side: OptionSide,
    pub side: Side,
    pub strategy: Strategy,
    pub quantity: u32,
    pub entry_price: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub trailing_stop_pct: f64,
}

impl PositionEngine {
    pub fn new() -> Self {
        Self { open: RwLock::new(Vec::new()), closed: RwLock::new(Vec::new()) }
    }

    pub fn open_trade(&self, params: OpenTradeParams) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        let trade = TrackedTrade {
            id: id.clone(),
            osi_symbol: params.osi_symbol.to_string(),
            underlying: params.underlying.to_string(),
            option_side: params.option_side,
            side: params.side,
            strategy: params.strategy,
            quantity: params.quantity,
            entry_price: params.entry_price,
            current_price: params.entry_price,
            highest_price: params.entry_price,
            stop_loss_pct: params.stop_loss_pct,
            take_profit_pct: params.take_profit_pct,
            trailing_stop_pct: params.trailing_stop_pct,
            status: TradeStatus::Open,
            opened_at: now,
            closed_at: None,
            close_reason: None,
            realized_pnl: 0.0,
        };

        info!(id = %id, osi = params.osi_symbol, entry_price = params.entry_price, "trade opened");
        self.open.write().push(trade);
        id
    }

    /// Update live price for all open positions matching `osi_symbol`.
    pub fn update_quote(&self, osi_symbol: &str, price: f64) {
        let mut open = self.open.write();
        for t in open.iter_mut().filter(|t| t.osi_symbol == osi_symbol && t.status == TradeStatus::Open) {
            t.current_price = price;
            if price > t.highest_price {
                t.highest_price = price;
            }
        }
    }

    /// Scan open positions and move any that should exit into `ExitPending`,
    /// returning `(id, reason)` pairs for the caller to act on (submit a
    /// close order). A position already `ExitPending` is skipped so a
    /// second tick doesn't double-submit. `minutes_to_close`/`close_before_minutes`
    /// come from the session clock and config, shared by every 0DTE contract.
    pub fn check_exits(&self, minutes_to_close: i64, close_before_minutes: i64) -> Vec<(String, ExitReason)> {
        let mut triggered = Vec::new();
        let mut open = self.open.write();
        for t in open.iter_mut().filter(|t| t.status == TradeStatus::Open) {
            if let Some(reason) = check_exit(&t.exit_inputs(minutes_to_close, close_before_minutes)) {
                t.status = TradeStatus::ExitPending;
                triggered.push((t.id.clone(), reason));
            }
        }
        triggered
    }

    /// Finalize a close (called once the broker confirms the fill).
    pub fn close_trade(&self, id: &str, close_price: f64, reason: &str) -> Option<f64> {
        let mut open = self.open.write();
        let idx = open.iter().position(|t| t.id == id)?;
        let mut trade = open.remove(idx);

        let direction = match trade.side {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        };
        let pnl = direction * (close_price - trade.entry_price) * trade.quantity as f64 * 100.0;
        trade.realized_pnl = pnl;
        trade.current_price = close_price;
        trade.status = TradeStatus::Closed;
        trade.closed_at = Some(Utc::now().timestamp());
        trade.close_reason = Some(reason.to_string());

        info!(id, reason, close_price, pnl, "trade closed");
        self.closed.write().push(trade);
        Some(pnl)
    }

    /// Abort a pending exit if the close order failed, returning the
    /// position to `Open` so the next cycle re-evaluates it.
    pub fn revert_exit_pending(&self, id: &str) {
        let mut open = self.open.write();
        if let Some(t) = open.iter_mut().find(|t| t.id == id) {
            t.status = TradeStatus::Open;
        }
    }

    pub fn get_open_trades(&self) -> Vec<TrackedTrade> {
        self.open.read().clone()
    }

    pub fn get_open_trade_for_underlying(&self, underlying: &str) -> Option<TrackedTrade> {
        self.open.read().iter().find(|t| t.underlying == underlying).cloned()
    }

    pub fn get_closed_trades(&self, count: usize) -> Vec<TrackedTrade> {
        let closed = self.closed.read();
        closed.iter().rev().take(count).cloned().collect()
    }
}

impl Default for PositionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PositionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionEngine")
            .field("open", &self.open.read().len())
            .field("closed", &self.closed.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_params(osi: &'static str) -> OpenTradeParams<'static> {
        OpenTradeParams {
            osi_symbol: osi,
            underlying: "SPY",
            option_side: OptionSide::Call,
            side: Side::Buy,
            strategy: Strategy::Scalp,
            quantity: 1,
            entry_price: 2.00,
            stop_loss_pct: 0.40,
            take_profit_pct: 0.60,
            trailing_stop_pct: 0.25,
        }
    }

    #[test]
    fn open_trade_starts_in_open_status() {
        let engine = PositionEngine::new();
        engine.open_trade(open_params("SPY260212C00500000"));
        let trades = engine.get_open_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].status, TradeStatus::Open);
    }

    #[test]
    fn check_exits_transitions_to_exit_pending() {
        let engine = PositionEngine::new();
        let id = engine.open_trade(open_params("SPY260212C00500000"));
        engine.update_quote("SPY260212C00500000", 1.00); // -50%, trips stop-loss
        let exits = engine.check_exits(120, 5);
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].0, id);
        assert_eq!(exits[0].1, ExitReason::StopLoss);

        let trades = engine.get_open_trades();
        assert_eq!(trades[0].status, TradeStatus::ExitPending);
    }

    #[test]
    fn exit_pending_not_retriggered_next_scan() {
        let engine = PositionEngine::new();
        engine.open_trade(open_params("SPY260212C00500000"));
        engine.update_quote("SPY260212C00500000", 1.00);
        engine.check_exits(120, 5);
        let second_scan = engine.check_exits(120, 5);
        assert!(second_scan.is_empty());
    }

    #[test]
    fn close_trade_moves_to_closed_list() {
        let engine = PositionEngine::new();
        let id = engine.open_trade(open_params("SPY260212C00500000"));
        let pnl = engine.close_trade(&id, 1.00, "stop_loss").unwrap();
        assert!(pnl < 0.0);
        assert!(engine.get_open_trades().is_empty());
        assert_eq!(engine.get_closed_trades(10).len(), 1);
    }

    #[test]
    fn revert_exit_pending_returns_to_open() {
        let engine = PositionEngine::new();
        let id = engine.open_trade(open_params("SPY260212C00500000"));
        engine.update_quote("SPY260212C00500000", 1.00);
        engine.check_exits(120, 5);
        engine.revert_exit_pending(&id);
        let trades = engine.get_open_trades();
        assert_eq!(trades[0].status, TradeStatus::Open);
    }

    #[test]
    fn get_open_trade_for_underlying_finds_match() {
        let engine = PositionEngine::new();
        engine.open_trade(open_params("SPY260212C00500000"));
        assert!(engine.get_open_trade_for_underlying("SPY").is_some());
        assert!(engine.get_open_trade_for_underlying("QQQ").is_none());
    }
}
