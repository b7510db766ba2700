// =============================================================================
// Options Engine — 0DTE/short-dated options cycle
// =============================================================================
//
// Owns every subsystem a single cycle touches: the broker gateway, policy
// engine/circuit breaker, tracked positions, the macro/GEX caches, and the
// optional AI adjudicator. `cycle::run_cycle` is the actual A-E state
// machine; this module just wires the pieces together, mirroring how
// `app_state.rs` aggregates subsystems behind one struct rather than passing
// a dozen arguments around.

pub mod cycle;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;

use crate::ai_adjudicator::AiAdjudicator;
use crate::audit_log::AuditLog;
use crate::broker::MarketDataGateway;
use crate::gex::GexSummary;
use crate::macro_regime::MacroCache;
use crate::policy::{CircuitBreaker, PolicyConfig, PolicyEngine};
use crate::position_engine::PositionEngine;
use crate::signal_cache::SignalCache;

pub use cycle::{run_cycle, CycleSummary};

pub struct OptionsEngine {
    pub gateway: Arc<dyn MarketDataGateway>,
    pub config: Arc<RwLock<PolicyConfig>>,
    pub policy: Arc<PolicyEngine>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub positions: Arc<PositionEngine>,
    pub macro_cache: Arc<MacroCache>,
    pub gex_cache: SignalCache<GexSummary>,
    pub ai: Option<Arc<AiAdjudicator>>,
    pub audit: Arc<AuditLog>,
    trades_today: RwLock<(NaiveDate, u32)>,
    cooldowns: RwLock<HashMap<String, i64>>,
}

impl OptionsEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn MarketDataGateway>,
        config: Arc<RwLock<PolicyConfig>>,
        policy: Arc<PolicyEngine>,
        circuit_breaker: Arc<CircuitBreaker>,
        positions: Arc<PositionEngine>,
        macro_cache: Arc<MacroCache>,
        ai: Option<Arc<AiAdjudicator>>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            gateway,
            config,
            policy,
            circuit_breaker,
            positions,
            macro_cache,
            gex_cache: SignalCache::new(),
            ai,
            audit,
            trades_today: RwLock::new((Utc::now().date_naive(), 0)),
            cooldowns: RwLock::new(HashMap::new()),
        }
    }

    /// Daily-rollover-aware trade counter, mirroring the circuit breaker's
    /// own `maybe_reset_daily` pattern.
    fn trades_today_count(&self) -> u32 {
        let today = Utc::now().date_naive();
        let mut guard = self.trades_today.write();
        if guard.0 != today {
            *guard = (today, 0);
        }
        guard.1
    }

    fn increment_trades_today(&self) {
        let today = Utc::now().date_naive();
        let mut guard = self.trades_today.write();
        if guard.0 != today {
            *guard = (today, 1);
        } else {
            guard.1 += 1;
        }
    }

    fn start_cooldown(&self, underlying: &str, seconds: i64) {
        let until = Utc::now().timestamp() + seconds;
        self.cooldowns.write().insert(underlying.to_string(), until);
    }

    fn in_cooldown(&self, underlying: &str) -> bool {
        let now = Utc::now().timestamp();
        self.cooldowns.read().get(underlying).is_some_and(|&until| now < until)
    }
}
