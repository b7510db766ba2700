// =============================================================================
// Equity Engine — simple directional equity positions alongside the options book
// =============================================================================
//
// Shares the broker gateway, policy engine, circuit breaker, macro cache and
// audit log with `options_engine::OptionsEngine` but keeps its own, far
// simpler position tracker (stop-loss/take-profit/time-stop only, no
// options-chain selection or theta).

pub mod cycle;
pub mod position;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::audit_log::AuditLog;
use crate::broker::MarketDataGateway;
use crate::macro_regime::MacroCache;
use crate::policy::{CircuitBreaker, PolicyConfig, PolicyEngine};

pub use cycle::{run_cycle, EquityCycleSummary};
pub use position::EquityPositionEngine;

pub struct EquityEngine {
    pub gateway: Arc<dyn MarketDataGateway>,
    pub config: Arc<RwLock<PolicyConfig>>,
    pub policy: Arc<PolicyEngine>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub positions: Arc<EquityPositionEngine>,
    pub macro_cache: Arc<MacroCache>,
    pub audit: Arc<AuditLog>,
}

impl EquityEngine {
    pub fn new(
        gateway: Arc<dyn MarketDataGateway>,
        config: Arc<RwLock<PolicyConfig>>,
        policy: Arc<PolicyEngine>,
        circuit_breaker: Arc<CircuitBreaker>,
        positions: Arc<EquityPositionEngine>,
        macro_cache: Arc<MacroCache>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self { gateway, config, policy, circuit_breaker, positions, macro_cache, audit }
    }
}
