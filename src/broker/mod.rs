// =============================================================================
// MarketDataGateway — abstract broker/data provider
// =============================================================================
//
// An `async_trait` abstraction over the broker/data provider so
// `BacktestHarness` can substitute a synthetic implementation while
// `OptionsEngine`/`EquityEngine` call the same trait against a live gateway.

pub mod client;

use crate::types::{Bar, OptionSide, Side};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Market clock snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    pub is_open: bool,
    pub next_open: chrono::DateTime<chrono::Utc>,
    pub next_close: chrono::DateTime<chrono::Utc>,
}

/// Account snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Account {
    pub equity: f64,
    pub buying_power: f64,
    pub cash: f64,
    pub daytrade_count: u32,
}

/// A held position as reported by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// OSI symbol for options, ticker for equities.
    pub symbol: String,
    pub qty: i64,
    pub avg_entry_price: f64,
    pub market_value: f64,
    pub unrealized_pl: f64,
    pub unrealized_plpc: f64,
}

/// Greeks for a single contract; all default to 0.0 when unavailable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

/// Top-of-book quote for a contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub bid_size: u32,
    pub ask_size: u32,
}

impl Quote {
    pub fn mid(&self) -> f64 {
        if self.bid > 0.0 && self.ask > 0.0 {
            (self.bid + self.ask) / 2.0
        } else {
            self.last
        }
    }

    pub fn spread_pct(&self) -> Option<f64> {
        if self.bid > 0.0 && self.ask > 0.0 {
            let mid = self.mid();
            if mid > 0.0 {
                return Some((self.ask - self.bid) / mid);
            }
        }
        None
    }
}

/// A single option contract snapshot, including greeks and quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    pub underlying: String,
    pub strike: f64,
    /// YYYY-MM-DD
    pub expiration: String,
    pub side: OptionSide,
    pub open_interest: u64,
    pub implied_volatility: f64,
    pub greeks: Greeks,
    pub quote: Quote,
    pub volume: u64,
    pub osi: String,
    /// Set when greeks were estimated from moneyness rather than provided.
    #[serde(default)]
    pub greeks_estimated: bool,
}

impl OptionContract {
    /// Invariant check used by tests and defensive call sites: bid<=ask when
    /// both positive, |delta| in [0,1], gamma >= 0.
    pub fn is_well_formed(&self) -> bool {
        let bid_ask_ok = !(self.quote.bid > 0.0 && self.quote.ask > 0.0) || self.quote.bid <= self.quote.ask;
        let delta_ok = self.greeks.delta.abs() <= 1.0;
        let gamma_ok = self.greeks.gamma >= 0.0;
        bid_ask_ok && delta_ok && gamma_ok
    }
}

/// A unified chain: one or more expirations of `OptionContract`s.
pub type OptionChain = Vec<OptionContract>;

/// Order request for equities.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub qty: Option<f64>,
    pub notional: Option<f64>,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub limit_price: Option<f64>,
}

/// Order request for options (OSI symbol, always whole contracts).
#[derive(Debug, Clone)]
pub struct OptionsOrderRequest {
    pub osi_symbol: String,
    pub side: Side,
    pub qty: u32,
    pub order_type: OrderType,
    pub limit_price: Option<f64>,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    Day,
    Gtc,
}

/// Result of a successfully submitted order.
#[derive(Debug, Clone)]
pub struct OrderAck {
    pub order_id: String,
    pub status: String,
}

/// Abstract market-data/broker gateway. Implemented by the live HTTP client
/// (`client::HttpGateway`) and, for the backtest harness, by a self-contained
/// synthetic gateway (`crate::backtest::simulator`).
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    async fn get_clock(&self) -> anyhow::Result<Clock>;
    async fn get_account(&self) -> anyhow::Result<Account>;
    async fn get_positions(&self) -> anyhow::Result<Vec<Position>>;
    async fn get_options_positions(&self) -> anyhow::Result<Vec<Position>>;
    async fn get_history(&self, ticker: &str, days: u32) -> anyhow::Result<Vec<Bar>>;
    async fn get_intraday_bars(&self, ticker: &str, timeframe: &str, limit: u32) -> anyhow::Result<Vec<Bar>>;
    async fn get_options_snapshots(
        &self,
        ticker: &str,
        expiration: Option<&str>,
        side: Option<OptionSide>,
    ) -> anyhow::Result<OptionChain>;
    async fn get_option_expirations(&self, ticker: &str) -> anyhow::Result<Vec<String>>;
    async fn create_order(&self, req: OrderRequest) -> anyhow::Result<OrderAck>;
    async fn create_options_order(&self, req: OptionsOrderRequest) -> anyhow::Result<OrderAck>;
    async fn close_position(&self, symbol: &str, qty: Option<f64>) -> anyhow::Result<OrderAck>;
    async fn close_options_position(&self, osi: &str, qty: Option<u32>) -> anyhow::Result<OrderAck>;
    async fn cancel_all_orders(&self) -> anyhow::Result<()>;
    async fn close_all_positions(&self) -> anyhow::Result<()>;
}
