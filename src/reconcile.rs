// =============================================================================
// Reconciliation Engine — compare internal state against the broker
// =============================================================================
//
// SAFETY POLICY: this module logs warnings for any drift it discovers but will
// **never** automatically cancel orders or close positions at the broker. A
// human operator or explicit admin action must resolve discrepancies.
// =============================================================================

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::broker::MarketDataGateway;
use crate::equity_engine::position::EquityPositionEngine;
use crate::position_engine::PositionEngine;

/// Summary of a single reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResult {
    /// Internal options positions that matched a broker-reported position.
    pub options_matched: u32,
    /// Broker-reported options positions with no matching internal trade.
    pub options_orphaned: u32,
    /// Internal equity positions that matched a broker-reported position.
    pub equity_matched: u32,
    /// Broker-reported equity positions with no matching internal trade.
    pub equity_orphaned: u32,
    pub account_equity: f64,
    pub timestamp: String,
}

/// Run one reconciliation cycle: fetch broker positions, diff against the
/// internal options and equity trackers, and refresh account equity.
pub async fn reconcile_once(
    gateway: &dyn MarketDataGateway,
    options_positions: &PositionEngine,
    equity_positions: &EquityPositionEngine,
) -> Result<ReconcileResult> {
    let now = Utc::now().to_rfc3339();
    info!(timestamp = %now, "reconciliation cycle started");

    let account = gateway.get_account().await.context("reconcile: failed to fetch account")?;

    let broker_options = gateway
        .get_options_positions()
        .await
        .context("reconcile: failed to fetch options positions")?;
    let broker_equity = gateway
        .get_positions()
        .await
        .context("reconcile: failed to fetch equity positions")?;

    let broker_osi: HashSet<String> = broker_options.iter().map(|p| p.symbol.clone()).collect();
    let broker_symbols: HashSet<String> = broker_equity.iter().map(|p| p.symbol.clone()).collect();

    let internal_options = options_positions.get_open_trades();
    let mut options_matched = 0u32;
    for t in &internal_options {
        if broker_osi.contains(&t.osi_symbol) {
            options_matched += 1;
        } else {
            warn!(id = %t.id, osi = %t.osi_symbol, "internal options trade has NO matching broker position — possible drift");
        }
    }
    let internal_osi: HashSet<String> = internal_options.iter().map(|t| t.osi_symbol.clone()).collect();
    let options_orphaned = broker_osi.iter().filter(|osi| !internal_osi.contains(*osi)).count() as u32;
    for osi in broker_osi.iter().filter(|osi| !internal_osi.contains(*osi)) {
        warn!(osi = %osi, "orphan broker options position detected — no matching internal trade");
    }

    let internal_equity = equity_positions.get_open_trades();
    let mut equity_matched = 0u32;
    for t in &internal_equity {
        if broker_symbols.contains(&t.symbol) {
            equity_matched += 1;
        } else {
            warn!(id = %t.id, symbol = %t.symbol, "internal equity trade has NO matching broker position — possible drift");
        }
    }
    let internal_symbols: HashSet<String> = internal_equity.iter().map(|t| t.symbol.clone()).collect();
    let equity_orphaned = broker_symbols.iter().filter(|s| !internal_symbols.contains(*s)).count() as u32;
    for sym in broker_symbols.iter().filter(|s| !internal_symbols.contains(*s)) {
        warn!(symbol = %sym, "orphan broker equity position detected — no matching internal trade");
    }

    debug!(equity = account.equity, buying_power = account.buying_power, "account snapshot refreshed");

    let result = ReconcileResult {
        options_matched,
        options_orphaned,
        equity_matched,
        equity_orphaned,
        account_equity: account.equity,
        timestamp: now.clone(),
    };

    info!(
        options_matched,
        options_orphaned,
        equity_matched,
        equity_orphaned,
        timestamp = %now,
        "reconciliation cycle completed"
    );

    Ok(result)
}
