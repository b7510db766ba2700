// =============================================================================
// Central Application State — Gamma Sentinel Trading Engine
// =============================================================================
//
// The single source of truth for the entire engine. All subsystems hold Arc
// references to their own state; AppState ties them together and provides a
// unified snapshot for the dashboard API and WebSocket feed.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
//   - Arc wrappers for subsystem engines that manage their own interior
//     mutability.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::audit_log::{AuditLog, AuditRecord};
use crate::broker::MarketDataGateway;
use crate::equity_engine::position::{EquityPositionEngine, EquityTrade};
use crate::equity_engine::EquityEngine;
use crate::macro_regime::{MacroCache, MacroSnapshot};
use crate::options_engine::OptionsEngine;
use crate::policy::circuit_breaker::CircuitBreakerState;
use crate::policy::{CircuitBreaker, PolicyConfig, PolicyEngine};
use crate::position_engine::{PositionEngine, TrackedTrade};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    pub code: Option<String>,
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

const MAX_RECENT_ERRORS: usize = 50;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    pub state_version: AtomicU64,
    pub ws_sequence_number: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub config: Arc<RwLock<PolicyConfig>>,

    // ── Gateway ──────────────────────────────────────────────────────────
    pub gateway: Arc<dyn MarketDataGateway>,

    // ── Policy / risk ────────────────────────────────────────────────────
    pub policy: Arc<PolicyEngine>,
    pub circuit_breaker: Arc<CircuitBreaker>,

    // ── Positions ────────────────────────────────────────────────────────
    pub options_positions: Arc<PositionEngine>,
    pub equity_positions: Arc<EquityPositionEngine>,

    // ── Signals ──────────────────────────────────────────────────────────
    pub macro_cache: Arc<MacroCache>,

    // ── Engines ──────────────────────────────────────────────────────────
    pub options_engine: Arc<OptionsEngine>,
    pub equity_engine: Arc<EquityEngine>,

    // ── Decision Audit Trail ─────────────────────────────────────────────
    pub audit: Arc<AuditLog>,

    // ── Error Log ────────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Operational Status ───────────────────────────────────────────────
    pub no_go_reason: RwLock<Option<String>>,
    pub ws_user_connected: RwLock<bool>,
    pub last_ws_user_event: RwLock<std::time::Instant>,
    pub last_reconcile_ok: RwLock<Option<std::time::Instant>>,
    pub last_reconcile_error: RwLock<Option<String>>,

    // ── Timing ───────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<RwLock<PolicyConfig>>,
        gateway: Arc<dyn MarketDataGateway>,
        policy: Arc<PolicyEngine>,
        circuit_breaker: Arc<CircuitBreaker>,
        options_positions: Arc<PositionEngine>,
        equity_positions: Arc<EquityPositionEngine>,
        macro_cache: Arc<MacroCache>,
        options_engine: Arc<OptionsEngine>,
        equity_engine: Arc<EquityEngine>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),

            config,
            gateway,
            policy,
            circuit_breaker,
            options_positions,
            equity_positions,
            macro_cache,
            options_engine,
            equity_engine,
            audit,

            recent_errors: RwLock::new(Vec::new()),

            no_go_reason: RwLock::new(None),
            ws_user_connected: RwLock::new(false),
            last_ws_user_event: RwLock::new(std::time::Instant::now()),
            last_reconcile_ok: RwLock::new(None),
            last_reconcile_error: RwLock::new(None),

            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    pub fn push_error(&self, msg: String) {
        self.push_error_with_code(msg, None);
    }

    pub fn push_error_with_code(&self, msg: String, code: Option<String>) {
        let record = ErrorRecord {
            message: msg,
            code,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot of the entire engine state.
    /// Payload for `GET /api/v1/state` and the WebSocket push feed.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let now = Utc::now();
        let config = self.config.read();
        let version = self.current_state_version();

        let ws_user_event_age_ms = self.last_ws_user_event.read().elapsed().as_millis() as u64;
        let reconcile_last_ok_age_s = self.last_reconcile_ok.read().map(|t| t.elapsed().as_secs());
        let breaker_state = self.circuit_breaker.snapshot();

        let truth = TruthHeader {
            ws_user_connected: *self.ws_user_connected.read(),
            last_ws_user_event_age_ms: ws_user_event_age_ms,
            reconcile_last_ok_age_s,
            reconcile_last_error: self.last_reconcile_error.read().clone(),
            no_go_reason: self.no_go_reason.read().clone(),
            state_version: version,
            ws_sequence_number: self.ws_sequence_number.load(Ordering::Relaxed),
            trading_mode: config.trading_mode.to_string(),
            circuit_breaker_paused: self.circuit_breaker.is_paused(),
            server_time: now.timestamp_millis(),
        };

        let options_open = self.options_positions.get_open_trades();
        let equity_open = self.equity_positions.get_open_trades();
        let recent_decisions = self.audit.recent(100);
        let macro_snapshot = self.macro_cache.get_if_fresh();
        let recent_errors = self.recent_errors.read().clone();

        let runtime_config_summary = RuntimeConfigSummary {
            trading_mode: config.trading_mode.to_string(),
            account_mode: config.account_mode.to_string(),
            underlyings: config.underlyings.clone(),
            max_concurrent_options_positions: config.max_concurrent_options_positions,
            max_trades_per_day: config.max_trades_per_day,
            enable_equity_engine: config.enable_equity_engine,
        };

        let closed_options = self.options_positions.get_closed_trades(500);
        let journal_stats = journal_stats_from(&closed_options);

        StateSnapshot {
            state_version: version,
            server_time: now.timestamp_millis(),
            truth,
            options_positions: options_open,
            equity_positions: equity_open,
            recent_decisions,
            circuit_breaker: breaker_state,
            runtime_config: runtime_config_summary,
            macro_: macro_snapshot,
            recent_errors: Some(recent_errors),
            journal_stats,
        }
    }
}

fn journal_stats_from(closed: &[TrackedTrade]) -> Option<JournalStats> {
    if closed.is_empty() {
        return None;
    }
    let total_trades = closed.len();
    let wins = closed.iter().filter(|t| t.realized_pnl > 0.0).count();
    let win_rate = wins as f64 / total_trades as f64;
    let total_net_pnl: f64 = closed.iter().map(|t| t.realized_pnl).sum();
    let gross_profit: f64 = closed.iter().map(|t| t.realized_pnl).filter(|&p| p > 0.0).sum();
    let gross_loss: f64 = closed.iter().map(|t| t.realized_pnl).filter(|&p| p < 0.0).map(f64::abs).sum();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    Some(JournalStats { total_trades, win_rate, total_net_pnl, profit_factor })
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub truth: TruthHeader,
    pub options_positions: Vec<TrackedTrade>,
    pub equity_positions: Vec<EquityTrade>,
    pub recent_decisions: Vec<AuditRecord>,
    pub circuit_breaker: CircuitBreakerState,
    pub runtime_config: RuntimeConfigSummary,

    #[serde(rename = "macro", skip_serializing_if = "Option::is_none")]
    pub macro_: Option<MacroSnapshot>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_errors: Option<Vec<ErrorRecord>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_stats: Option<JournalStats>,
}

/// Operational truth header — the dashboard's primary status banner.
#[derive(Debug, Clone, Serialize)]
pub struct TruthHeader {
    pub ws_user_connected: bool,
    pub last_ws_user_event_age_ms: u64,
    pub reconcile_last_ok_age_s: Option<u64>,
    pub reconcile_last_error: Option<String>,
    pub no_go_reason: Option<String>,
    pub state_version: u64,
    pub ws_sequence_number: u64,
    pub trading_mode: String,
    pub circuit_breaker_paused: Option<String>,
    pub server_time: i64,
}

/// Summary of policy config for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeConfigSummary {
    pub trading_mode: String,
    pub account_mode: String,
    pub underlyings: Vec<String>,
    pub max_concurrent_options_positions: u32,
    pub max_trades_per_day: u32,
    pub enable_equity_engine: bool,
}

/// Trade journal aggregate statistics (options book).
#[derive(Debug, Clone, Serialize)]
pub struct JournalStats {
    pub total_trades: usize,
    pub win_rate: f64,
    pub total_net_pnl: f64,
    pub profit_factor: f64,
}
