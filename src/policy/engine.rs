// =============================================================================
// PolicyEngine — ordered gates + two-phase order approval
// =============================================================================
//
// Grounded on `trade_insurance.rs`'s `InsuranceGate::check_all` ordered-gate
// pattern, generalized from a single blocking reason to a full
// violations/warnings list (per the spec's evaluate/evaluateOptionsOrder
// contract) and wired to the new `TokenStore`/`CircuitBreaker`.

use std::sync::Arc;

use crate::broker::OptionContract;
use crate::policy::circuit_breaker::CircuitBreaker;
use crate::policy::config::PolicyConfig;
use crate::policy::exits::{check_exit, ExitInputs, ExitReason};
use crate::policy::tokens::{ApprovalToken, TokenError, TokenStore};
use crate::types::{OptionSide, Side, TradingMode};

#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub allowed: bool,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
}

impl EvaluationResult {
    fn pass() -> Self {
        Self { allowed: true, violations: Vec::new(), warnings: Vec::new() }
    }
}

/// Inputs for an options order evaluation. Kept free of any AppState
/// reference so the function stays unit-testable.
pub struct OptionsOrderContext<'a> {
    pub underlying: &'a str,
    pub contract: &'a OptionContract,
    pub open_positions_for_underlying: usize,
    pub total_open_positions: usize,
    pub trades_today: u32,
}

pub struct PolicyEngine {
    config: Arc<parking_lot::RwLock<PolicyConfig>>,
    circuit_breaker: Arc<CircuitBreaker>,
    tokens: TokenStore,
}

impl PolicyEngine {
    pub fn new(config: Arc<parking_lot::RwLock<PolicyConfig>>, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        Self { config, circuit_breaker, tokens: TokenStore::new() }
    }

    /// Gate 1-2: trading mode must not be Paused or Killed.
    fn check_trading_mode(&self, result: &mut EvaluationResult) {
        let mode = self.config.read().trading_mode;
        match mode {
            TradingMode::Killed => result.violations.push("trading mode is KILLED".to_string()),
            TradingMode::Paused => result.violations.push("trading mode is PAUSED".to_string()),
            TradingMode::Live => {}
        }
    }

    /// Gate 3: circuit breaker must not currently be paused.
    fn check_circuit_breaker(&self, result: &mut EvaluationResult) {
        if let Some(reason) = self.circuit_breaker.is_paused() {
            result.violations.push(reason);
        }
    }

    /// General pre-trade evaluation shared by both equities and options:
    /// trading mode + circuit breaker + daily trade cap.
    pub fn evaluate(&self, trades_today: u32) -> EvaluationResult {
        let mut result = EvaluationResult::pass();
        self.check_trading_mode(&mut result);
        self.check_circuit_breaker(&mut result);

        let max_trades = self.config.read().max_trades_per_day;
        if trades_today >= max_trades {
            result.violations.push(format!("daily trade cap reached: {trades_today} >= {max_trades}"));
        }

        result.allowed = result.violations.is_empty();
        result
    }

    /// Options-specific gates on top of `evaluate`: position caps, duplicate
    /// underlying, spread, minimum open interest.
    pub fn evaluate_options_order(&self, ctx: &OptionsOrderContext) -> EvaluationResult {
        let mut result = self.evaluate(ctx.trades_today);

        let config = self.config.read();
        if ctx.total_open_positions >= config.max_concurrent_options_positions as usize {
            result.violations.push(format!(
                "max concurrent options positions reached: {} >= {}",
                ctx.total_open_positions, config.max_concurrent_options_positions
            ));
        }
        if ctx.open_positions_for_underlying > 0 {
            result.violations.push(format!("already have an open position on {}", ctx.underlying));
        }

        if let Some(spread_pct) = ctx.contract.quote.spread_pct() {
            let spread_bps = spread_pct * 10_000.0;
            if spread_bps > config.options.max_spread_bps {
                result.violations.push(format!(
                    "spread too wide: {spread_bps:.1} bps > {:.1} bps limit",
                    config.options.max_spread_bps
                ));
            }
        } else {
            result.warnings.push("no two-sided quote, spread unchecked".to_string());
        }

        if ctx.contract.open_interest < config.options.min_open_interest {
            result.violations.push(format!(
                "open interest too thin: {} < {}",
                ctx.contract.open_interest, config.options.min_open_interest
            ));
        }

        if !ctx.contract.is_well_formed() {
            result.violations.push("contract snapshot failed well-formedness check".to_string());
        }

        result.allowed = result.violations.is_empty();
        result
    }

    /// Preview an order: issue an approval token without submitting anything.
    pub fn preview(&self, symbol: &str, side: Side, qty: f64, est_price: f64) -> ApprovalToken {
        let side_str = match side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        };
        self.tokens.issue(symbol, side_str, qty, est_price)
    }

    /// Consume a previously issued token. This is the single-use gate
    /// between Preview and CreateOrder; `symbol` must match the underlying
    /// the token was issued for.
    pub fn validate_token(&self, token: &str, symbol: &str) -> Result<ApprovalToken, TokenError> {
        self.tokens.validate(token, symbol)
    }

    /// Run the priority-ordered exit check for a single tracked position.
    pub fn check_exits(&self, inputs: &ExitInputs) -> Option<ExitReason> {
        check_exit(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Greeks, Quote};

    fn sample_contract() -> OptionContract {
        OptionContract {
            underlying: "SPY".into(),
            strike: 500.0,
            expiration: "2026-02-12".into(),
            side: OptionSide::Call,
            open_interest: 500,
            implied_volatility: 0.2,
            greeks: Greeks { delta: 0.45, gamma: 0.02, theta: -0.1, vega: 0.05, rho: 0.01 },
            quote: Quote { bid: 2.40, ask: 2.45, last: 2.42, bid_size: 10, ask_size: 10 },
            volume: 100,
            osi: "SPY260212C00500000".into(),
            greeks_estimated: false,
        }
    }

    fn engine() -> PolicyEngine {
        PolicyEngine::new(
            Arc::new(parking_lot::RwLock::new(PolicyConfig::default())),
            Arc::new(CircuitBreaker::new(3, 5)),
        )
    }

    #[test]
    fn evaluate_blocks_when_paused_by_default() {
        let e = engine();
        let result = e.evaluate(0);
        assert!(!result.allowed);
        assert!(result.violations.iter().any(|v| v.contains("PAUSED")));
    }

    #[test]
    fn evaluate_allows_when_live_and_clear() {
        let e = engine();
        e.config.write().trading_mode = TradingMode::Live;
        let result = e.evaluate(0);
        assert!(result.allowed);
    }

    #[test]
    fn evaluate_blocks_at_daily_trade_cap() {
        let e = engine();
        e.config.write().trading_mode = TradingMode::Live;
        let max = e.config.read().max_trades_per_day;
        let result = e.evaluate(max);
        assert!(!result.allowed);
    }

    #[test]
    fn options_order_blocks_duplicate_underlying() {
        let e = engine();
        e.config.write().trading_mode = TradingMode::Live;
        let contract = sample_contract();
        let ctx = OptionsOrderContext {
            underlying: "SPY",
            contract: &contract,
            open_positions_for_underlying: 1,
            total_open_positions: 1,
            trades_today: 0,
        };
        let result = e.evaluate_options_order(&ctx);
        assert!(!result.allowed);
        assert!(result.violations.iter().any(|v| v.contains("already have an open position")));
    }

    #[test]
    fn options_order_blocks_thin_open_interest() {
        let e = engine();
        e.config.write().trading_mode = TradingMode::Live;
        let mut contract = sample_contract();
        contract.open_interest = 1;
        let ctx = OptionsOrderContext {
            underlying: "SPY",
            contract: &contract,
            open_positions_for_underlying: 0,
            total_open_positions: 0,
            trades_today: 0,
        };
        let result = e.evaluate_options_order(&ctx);
        assert!(!result.allowed);
    }

    #[test]
    fn preview_then_validate_succeeds() {
        let e = engine();
        let token = e.preview("SPY260212C00500000", Side::Buy, 1.0, 2.42);
        assert!(e.validate_token(&token.token, "SPY260212C00500000").is_ok());
    }

    #[test]
    fn validate_token_twice_fails() {
        let e = engine();
        let token = e.preview("SPY260212C00500000", Side::Buy, 1.0, 2.42);
        e.validate_token(&token.token, "SPY260212C00500000").unwrap();
        assert_eq!(
            e.validate_token(&token.token, "SPY260212C00500000").unwrap_err(),
            TokenError::AlreadyConsumed
        );
    }
}
