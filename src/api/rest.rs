// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Public endpoints (health) require no
// authentication. All other endpoints require a valid Bearer token checked via
// the `AuthBearer` extractor.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::audit_log::AuditRecord;
use crate::types::{AccountMode, TradingMode};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/positions", get(positions))
        .route("/api/v1/gex", get(gex))
        .route("/api/v1/macro", get(macro_snapshot))
        .route("/api/v1/decisions", get(decisions))
        .route("/api/v1/alerts", post(ingest_alert))
        .route("/api/v1/control/pause", post(control_pause))
        .route("/api/v1/control/resume", post(control_resume))
        .route("/api/v1/control/kill", post(control_kill))
        .route("/api/v1/control/account-mode", post(control_account_mode))
        .route("/api/v1/heartbeat", post(heartbeat))
        .route("/api/v1/trade-journal", get(trade_journal))
        .route("/api/v1/trade-journal/stats", get(trade_journal_stats))
        // ── WebSocket (handled separately in ws module but mounted here) ─
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Full state snapshot (authenticated)
// =============================================================================

async fn full_state(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.build_snapshot();
    Json(snapshot)
}

// =============================================================================
// Positions (authenticated)
// =============================================================================

#[derive(Serialize)]
struct PositionsResponse {
    options: Vec<crate::position_engine::TrackedTrade>,
    equity: Vec<crate::equity_engine::position::EquityTrade>,
}

async fn positions(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(PositionsResponse {
        options: state.options_positions.get_open_trades(),
        equity: state.equity_positions.get_open_trades(),
    })
}

// =============================================================================
// GEX (authenticated)
// =============================================================================

async fn gex(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let underlyings = state.config.read().underlyings.clone();
    let mut by_underlying = serde_json::Map::new();
    for underlying in underlyings {
        if let Some(summary) = state.options_engine.gex_cache.get(&underlying) {
            by_underlying.insert(underlying, serde_json::to_value(summary).unwrap_or_default());
        }
    }
    Json(serde_json::Value::Object(by_underlying))
}

// =============================================================================
// Macro regime (authenticated)
// =============================================================================

async fn macro_snapshot(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.macro_cache.get_if_fresh() {
        Some(snapshot) => Json(serde_json::to_value(snapshot).unwrap_or_default()).into_response(),
        None => {
            let body = serde_json::json!({ "regime": null, "message": "No macro snapshot available yet" });
            Json(body).into_response()
        }
    }
}

// =============================================================================
// Decisions (authenticated)
// =============================================================================

async fn decisions(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let decisions: Vec<AuditRecord> = state.audit.recent(100);
    Json(decisions)
}

// =============================================================================
// Alert ingestion (authenticated)
// =============================================================================
//
// Accepts webhook-style external alerts (e.g. a TradingView or custom scanner
// hook). Alerts are recorded to the audit trail as informational entries;
// they never directly trigger an order — the next engine cycle still applies
// the full policy gate.

#[derive(Deserialize)]
struct AlertRequest {
    source: String,
    underlying: String,
    message: String,
}

async fn ingest_alert(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AlertRequest>,
) -> impl IntoResponse {
    info!(source = %req.source, underlying = %req.underlying, message = %req.message, "external alert received");
    let record = AuditRecord::new(&req.underlying, crate::audit_log::AuditOutcome::ExternalAlert)
        .with_reason(format!("from {}: {}", req.source, req.message));
    state.audit.record(record);
    state.increment_version();

    Json(serde_json::json!({ "status": "accepted" }))
}

// =============================================================================
// Control endpoints (authenticated)
// =============================================================================

#[derive(Serialize)]
struct ControlResponse {
    trading_mode: String,
    message: String,
}

async fn control_pause(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    {
        let mut config = state.config.write();
        config.trading_mode = TradingMode::Paused;
    }
    state.increment_version();
    info!("Trading PAUSED via API");

    Json(ControlResponse {
        trading_mode: "Paused".to_string(),
        message: "Trading paused".to_string(),
    })
}

async fn control_resume(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    {
        let mut config = state.config.write();
        config.trading_mode = TradingMode::Live;
    }
    state.increment_version();
    info!("Trading RESUMED via API");

    Json(ControlResponse {
        trading_mode: "Live".to_string(),
        message: "Trading resumed".to_string(),
    })
}

async fn control_kill(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    {
        let mut config = state.config.write();
        config.trading_mode = TradingMode::Killed;
    }
    state.increment_version();
    warn!("Trading KILLED via API");

    Json(ControlResponse {
        trading_mode: "Killed".to_string(),
        message: "Trading killed — manual restart required".to_string(),
    })
}

#[derive(Deserialize)]
struct AccountModeRequest {
    account_mode: String,
    #[serde(default)]
    confirm_live: bool,
}

#[derive(Serialize)]
struct AccountModeResponse {
    account_mode: String,
}

async fn control_account_mode(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AccountModeRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let mode = match req.account_mode.to_lowercase().as_str() {
        "demo" => AccountMode::Demo,
        "live" => {
            if !req.confirm_live {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "error": "Switching to Live mode requires confirm_live: true",
                    })),
                ));
            }
            warn!("Switching to LIVE account mode via API");
            AccountMode::Live
        }
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!("Invalid account mode: '{}'. Use 'demo' or 'live'.", req.account_mode),
                })),
            ));
        }
    };

    {
        let mut config = state.config.write();
        config.account_mode = mode;
    }
    state.increment_version();
    info!(account_mode = %mode, "Account mode changed via API");

    Ok(Json(AccountModeResponse {
        account_mode: mode.to_string(),
    }))
}

// =============================================================================
// Heartbeat (authenticated)
// =============================================================================

async fn heartbeat(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    *state.last_ws_user_event.write() = std::time::Instant::now();
    state.increment_version();

    Json(serde_json::json!({
        "status": "ok",
        "server_time": chrono::Utc::now().timestamp_millis(),
    }))
}

// =============================================================================
// Trade Journal (authenticated)
// =============================================================================

async fn trade_journal(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let closed = state.options_positions.get_closed_trades(500);
    Json(closed)
}

async fn trade_journal_stats(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let closed = state.options_positions.get_closed_trades(500);
    let total_trades = closed.len();
    if total_trades == 0 {
        return Json(serde_json::json!({
            "total_trades": 0,
            "win_rate": 0.0,
            "total_net_pnl": 0.0,
            "profit_factor": 0.0,
        }));
    }
    let wins = closed.iter().filter(|p| p.realized_pnl > 0.0).count();
    let win_rate = wins as f64 / total_trades as f64;
    let total_net_pnl: f64 = closed.iter().map(|p| p.realized_pnl).sum();
    let gross_profit: f64 = closed.iter().filter(|p| p.realized_pnl > 0.0).map(|p| p.realized_pnl).sum();
    let gross_loss: f64 = closed.iter().filter(|p| p.realized_pnl < 0.0).map(|p| p.realized_pnl.abs()).sum();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    Json(serde_json::json!({
        "total_trades": total_trades,
        "win_rate": win_rate,
        "total_net_pnl": total_net_pnl,
        "profit_factor": profit_factor,
    }))
}
