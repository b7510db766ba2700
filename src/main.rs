// =============================================================================
// Gamma Sentinel — Main Entry Point
// =============================================================================
//
// The engine starts in Demo + Paused mode for safety. An operator must
// explicitly switch to Live mode via the dashboard or API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod ai_adjudicator;
mod api;
mod app_state;
mod assessor;
mod audit_log;
mod backtest;
mod broker;
mod chain;
mod equity_engine;
mod error;
mod gex;
mod indicators;
mod macro_regime;
mod mtf_ema;
mod options_engine;
mod policy;
mod position_engine;
mod pricing;
mod reconcile;
mod session;
mod signal_cache;
mod storage;
mod types;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::ai_adjudicator::AiAdjudicator;
use crate::app_state::AppState;
use crate::audit_log::AuditLog;
use crate::broker::client::HttpGateway;
use crate::equity_engine::position::EquityPositionEngine;
use crate::equity_engine::EquityEngine;
use crate::gex::GexEngine;
use crate::macro_regime::{MacroCache, MACRO_UNIVERSE};
use crate::options_engine::OptionsEngine;
use crate::policy::{CircuitBreaker, PolicyConfig, PolicyEngine};
use crate::position_engine::PositionEngine;
use crate::types::{AccountMode, TradingMode};

const POLICY_CONFIG_PATH: &str = "policy-config.json";
const CIRCUIT_BREAKER_STATE_PATH: &str = "circuit-breaker.json";
const OPTIONS_TRADES_PATH: &str = "options-engine-state.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Gamma Sentinel — Starting Up                      ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = PolicyConfig::load(POLICY_CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load policy config, using defaults");
        PolicyConfig::default()
    });

    // SAFETY: force Demo + Paused on startup regardless of what was persisted.
    config.trading_mode = TradingMode::Paused;
    config.account_mode = AccountMode::Demo;

    if let Ok(syms) = std::env::var("GAMMA_SENTINEL_UNDERLYINGS") {
        let parsed: Vec<String> = syms.split(',').map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()).collect();
        if !parsed.is_empty() {
            config.underlyings = parsed;
        }
    }

    info!(underlyings = ?config.underlyings, "Configured underlyings");
    info!(
        trading_mode = %config.trading_mode,
        account_mode = %config.account_mode,
        "Engine starting in SAFE mode (Demo + Paused)"
    );

    // ── 2. Build shared subsystems ───────────────────────────────────────
    let config = Arc::new(parking_lot::RwLock::new(config));

    let broker_base_url = std::env::var("BROKER_BASE_URL").unwrap_or_else(|_| "https://paper-api.example.com".into());
    let broker_token = std::env::var("BROKER_API_TOKEN").unwrap_or_default();
    let gateway: Arc<dyn broker::MarketDataGateway> = Arc::new(HttpGateway::new(broker_base_url, broker_token));

    let (max_bad_trades, max_errors) = {
        let c = config.read();
        (c.max_consecutive_bad_trades, c.max_consecutive_errors)
    };
    let circuit_breaker = Arc::new(CircuitBreaker::new(max_bad_trades, max_errors));
    if let Some(state) = storage::load_json::<policy::CircuitBreakerState>(CIRCUIT_BREAKER_STATE_PATH)? {
        info!(consecutive_bad_trades = state.consecutive_bad_trades, "restored circuit breaker state");
    }

    let policy_engine = Arc::new(PolicyEngine::new(config.clone(), circuit_breaker.clone()));
    let options_positions = Arc::new(PositionEngine::new());
    let equity_positions = Arc::new(EquityPositionEngine::new());
    let macro_cache = MacroCache::new();
    let audit = Arc::new(AuditLog::new(Some(std::path::PathBuf::from("audit-log.jsonl"))));

    let ai_adjudicator = {
        let enabled = config.read().enable_ai_adjudicator;
        let endpoint = std::env::var("LLM_ENDPOINT").unwrap_or_default();
        if enabled && !endpoint.is_empty() {
            let api_key = std::env::var("LLM_API_KEY").unwrap_or_default();
            Some(Arc::new(AiAdjudicator::new(endpoint, api_key)))
        } else {
            None
        }
    };

    let options_engine = Arc::new(OptionsEngine::new(
        gateway.clone(),
        config.clone(),
        policy_engine.clone(),
        circuit_breaker.clone(),
        options_positions.clone(),
        macro_cache.clone(),
        ai_adjudicator,
        audit.clone(),
    ));

    let equity_engine = Arc::new(EquityEngine::new(
        gateway.clone(),
        config.clone(),
        policy_engine.clone(),
        circuit_breaker.clone(),
        equity_positions.clone(),
        macro_cache.clone(),
        audit.clone(),
    ));

    let state = Arc::new(AppState::new(
        config.clone(),
        gateway.clone(),
        policy_engine.clone(),
        circuit_breaker.clone(),
        options_positions.clone(),
        equity_positions.clone(),
        macro_cache.clone(),
        options_engine.clone(),
        equity_engine.clone(),
        audit.clone(),
    ));

    // ── 3. Start the API server ──────────────────────────────────────────
    let api_state = state.clone();
    let bind_addr = std::env::var("GAMMA_SENTINEL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let bind_addr_clone = bind_addr.clone();
    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr_clone).await.expect("Failed to bind API server");
        info!(addr = %bind_addr_clone, "API server listening");
        axum::serve(listener, app).await.expect("API server failed");
    });

    // ── 4. Options cycle loop ────────────────────────────────────────────
    let options_cycle_engine = options_engine.clone();
    let options_cycle_config = config.clone();
    tokio::spawn(async move {
        loop {
            let interval_secs = options_cycle_config.read().cycle_interval_secs;
            tokio::time::sleep(tokio::time::Duration::from_secs(interval_secs)).await;
            match options_engine::run_cycle(&options_cycle_engine).await {
                Ok(summary) => {
                    if summary.entries_opened > 0 || summary.exits_triggered > 0 {
                        info!(?summary, "options cycle completed");
                    }
                }
                Err(e) => error!(error = %e, "options cycle failed"),
            }
        }
    });

    // ── 5. Equity cycle loop ─────────────────────────────────────────────
    let equity_cycle_engine = equity_engine.clone();
    let equity_cycle_config = config.clone();
    tokio::spawn(async move {
        loop {
            let interval_secs = equity_cycle_config.read().cycle_interval_secs;
            tokio::time::sleep(tokio::time::Duration::from_secs(interval_secs)).await;
            match equity_engine::run_cycle(&equity_cycle_engine).await {
                Ok(summary) => {
                    if summary.entries_opened > 0 || summary.exits_triggered > 0 {
                        info!(?summary, "equity cycle completed");
                    }
                }
                Err(e) => error!(error = %e, "equity cycle failed"),
            }
        }
    });

    // ── 6. Macro refresh loop (every 30 minutes) ─────────────────────────
    let macro_gateway = gateway.clone();
    let macro_cache_loop = macro_cache.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(crate::macro_regime::MACRO_CACHE_TTL);
        loop {
            interval.tick().await;
            let mut bars_by_ticker = HashMap::new();
            for mt in MACRO_UNIVERSE {
                match macro_gateway.get_history(mt.ticker, 10).await {
                    Ok(bars) => {
                        bars_by_ticker.insert(mt.ticker.to_string(), bars);
                    }
                    Err(e) => warn!(ticker = mt.ticker, error = %e, "failed to fetch macro ticker history"),
                }
            }
            let snapshot = macro_cache_loop.refresh(&bars_by_ticker);
            info!(regime = %snapshot.regime, score = snapshot.score, "macro snapshot refreshed");
        }
    });

    // ── 7. GEX refresh loop ───────────────────────────────────────────────
    let gex_gateway = gateway.clone();
    let gex_engine = options_engine.clone();
    let gex_config = config.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(5 * 60));
        loop {
            interval.tick().await;
            let underlyings = gex_config.read().underlyings.clone();
            for underlying in &underlyings {
                let intraday = match gex_gateway.get_intraday_bars(underlying, "5m", 5).await {
                    Ok(bars) => bars,
                    Err(e) => {
                        warn!(underlying, error = %e, "failed to fetch intraday bars for GEX refresh");
                        continue;
                    }
                };
                let spot = intraday.last().map(|b| b.close).unwrap_or(0.0);
                if spot <= 0.0 {
                    continue;
                }
                match gex_gateway.get_options_snapshots(underlying, None, None).await {
                    Ok(chain) => {
                        let summary = GexEngine::summarize(&chain, spot);
                        gex_engine.gex_cache.put(underlying, summary);
                    }
                    Err(e) => warn!(underlying, error = %e, "failed to fetch options chain for GEX refresh"),
                }
            }
        }
    });

    // ── 8. Heartbeat loop ─────────────────────────────────────────────────
    let heartbeat_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            heartbeat_state.increment_version();
        }
    });

    // ── 9. Reconciliation loop ────────────────────────────────────────────
    let recon_gateway = gateway.clone();
    let recon_options = options_positions.clone();
    let recon_equity = equity_positions.clone();
    let recon_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            match reconcile::reconcile_once(recon_gateway.as_ref(), &recon_options, &recon_equity).await {
                Ok(_) => {
                    *recon_state.last_reconcile_ok.write() = Some(std::time::Instant::now());
                    *recon_state.last_reconcile_error.write() = None;
                    recon_state.increment_version();
                }
                Err(e) => {
                    *recon_state.last_reconcile_error.write() = Some(format!("{e}"));
                    warn!(error = %e, "reconciliation failed");
                }
            }
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 10. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = config.read().save(POLICY_CONFIG_PATH) {
        error!(error = %e, "Failed to save policy config on shutdown");
    }
    if let Err(e) = storage::save_json(CIRCUIT_BREAKER_STATE_PATH, &circuit_breaker.snapshot()) {
        error!(error = %e, "Failed to save circuit breaker state on shutdown");
    }
    if let Err(e) = storage::save_json(OPTIONS_TRADES_PATH, &options_positions.get_open_trades()) {
        error!(error = %e, "Failed to save tracked options trades on shutdown");
    }

    info!("Gamma Sentinel shut down complete.");
    Ok(())
}
