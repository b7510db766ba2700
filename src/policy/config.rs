// =============================================================================
// PolicyConfig — versioned, hot-reloadable engine configuration
// =============================================================================
//
// Grounded directly on `runtime_config.rs`: every field carries a
// `#[serde(default = "...")]` so older files deserialize cleanly, and
// persistence uses the same atomic tmp-then-rename write. `config_version`
// plus `migrate()` is new: the original had no migration path because its
// defaults-everywhere strategy made one unnecessary for single-field
// additions, but a config-version bump lets us change a default's *meaning*
// (e.g. a units change) without silently reinterpreting old files.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{AccountMode, TradingMode};

pub const CURRENT_CONFIG_VERSION: u32 = 1;

fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}
fn default_true() -> bool {
    true
}
fn default_underlyings() -> Vec<String> {
    vec!["SPY".to_string(), "QQQ".to_string()]
}
fn default_max_concurrent_options_positions() -> u32 {
    2
}
fn default_max_daily_loss_pct() -> f64 {
    3.0
}
fn default_max_consecutive_bad_trades() -> u32 {
    3
}
fn default_max_consecutive_errors() -> u32 {
    5
}
fn default_max_trades_per_day() -> u32 {
    20
}
fn default_base_position_pct() -> f64 {
    2.0
}
fn default_trailing_stop_pct() -> f64 {
    0.25
}
fn default_scalp_take_profit_pct() -> f64 {
    0.25
}
fn default_scalp_stop_loss_pct() -> f64 {
    0.40
}
fn default_swing_take_profit_pct() -> f64 {
    0.60
}
fn default_swing_stop_loss_pct() -> f64 {
    0.50
}
fn default_max_spread_bps() -> f64 {
    15.0
}
fn default_max_spread_pct() -> f64 {
    0.10
}
fn default_min_open_interest() -> u64 {
    100
}
fn default_min_delta() -> f64 {
    0.30
}
fn default_max_delta() -> f64 {
    0.50
}
fn default_min_conviction() -> i32 {
    3
}
fn default_close_before_minutes() -> i64 {
    15
}
fn default_max_premium_per_trade() -> f64 {
    300.0
}
fn default_strike_window_pct() -> f64 {
    15.0
}
fn default_cooldown_secs() -> i64 {
    120
}
fn default_cycle_interval_secs() -> u64 {
    60
}
fn default_equity_stop_loss_pct() -> f64 {
    1.5
}
fn default_equity_take_profit_pct() -> f64 {
    2.5
}
fn default_equity_max_hold_minutes() -> i64 {
    240
}

/// Tunable parameters for the options engine (entry sizing, exits, chain
/// filters). Mirrors `runtime_config.rs`'s `StrategyParams` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsParams {
    #[serde(default = "default_base_position_pct")]
    pub base_position_pct: f64,
    #[serde(default = "default_max_premium_per_trade")]
    pub max_premium_per_trade: f64,
    #[serde(default = "default_scalp_take_profit_pct")]
    pub scalp_take_profit_pct: f64,
    #[serde(default = "default_scalp_stop_loss_pct")]
    pub scalp_stop_loss_pct: f64,
    #[serde(default = "default_swing_take_profit_pct")]
    pub swing_take_profit_pct: f64,
    #[serde(default = "default_swing_stop_loss_pct")]
    pub swing_stop_loss_pct: f64,
    #[serde(default = "default_trailing_stop_pct")]
    pub trailing_stop_pct: f64,
    #[serde(default = "default_close_before_minutes")]
    pub close_before_minutes: i64,
    #[serde(default = "default_max_spread_bps")]
    pub max_spread_bps: f64,
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: f64,
    #[serde(default = "default_min_open_interest")]
    pub min_open_interest: u64,
    #[serde(default = "default_min_delta")]
    pub min_delta: f64,
    #[serde(default = "default_max_delta")]
    pub max_delta: f64,
    #[serde(default = "default_min_conviction")]
    pub min_conviction: i32,
    #[serde(default = "default_strike_window_pct")]
    pub strike_window_pct: f64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,
}

impl Default for OptionsParams {
    fn default() -> Self {
        Self {
            base_position_pct: default_base_position_pct(),
            max_premium_per_trade: default_max_premium_per_trade(),
            scalp_take_profit_pct: default_scalp_take_profit_pct(),
            scalp_stop_loss_pct: default_scalp_stop_loss_pct(),
            swing_take_profit_pct: default_swing_take_profit_pct(),
            swing_stop_loss_pct: default_swing_stop_loss_pct(),
            trailing_stop_pct: default_trailing_stop_pct(),
            close_before_minutes: default_close_before_minutes(),
            max_spread_bps: default_max_spread_bps(),
            max_spread_pct: default_max_spread_pct(),
            min_open_interest: default_min_open_interest(),
            min_delta: default_min_delta(),
            max_delta: default_max_delta(),
            min_conviction: default_min_conviction(),
            strike_window_pct: default_strike_window_pct(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityParams {
    #[serde(default = "default_equity_stop_loss_pct")]
    pub stop_loss_pct: f64,
    #[serde(default = "default_equity_take_profit_pct")]
    pub take_profit_pct: f64,
    #[serde(default = "default_equity_max_hold_minutes")]
    pub max_hold_minutes: i64,
}

impl Default for EquityParams {
    fn default() -> Self {
        Self {
            stop_loss_pct: default_equity_stop_loss_pct(),
            take_profit_pct: default_equity_take_profit_pct(),
            max_hold_minutes: default_equity_max_hold_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    #[serde(default)]
    pub trading_mode: TradingMode,
    #[serde(default)]
    pub account_mode: AccountMode,

    #[serde(default = "default_underlyings")]
    pub underlyings: Vec<String>,
    #[serde(default = "default_max_concurrent_options_positions")]
    pub max_concurrent_options_positions: u32,
    #[serde(default = "default_max_daily_loss_pct")]
    pub max_daily_loss_pct: f64,
    #[serde(default = "default_max_consecutive_bad_trades")]
    pub max_consecutive_bad_trades: u32,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
    #[serde(default = "default_max_trades_per_day")]
    pub max_trades_per_day: u32,
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    #[serde(default = "default_true")]
    pub options_enabled: bool,
    #[serde(default = "default_true")]
    pub enable_ai_adjudicator: bool,
    #[serde(default = "default_true")]
    pub enable_macro_gate: bool,
    #[serde(default = "default_true")]
    pub enable_gex_gate: bool,
    #[serde(default = "default_true")]
    pub enable_equity_engine: bool,

    #[serde(default)]
    pub options: OptionsParams,
    #[serde(default)]
    pub equity: EquityParams,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION,
            trading_mode: TradingMode::default(),
            account_mode: AccountMode::default(),
            underlyings: default_underlyings(),
            max_concurrent_options_positions: default_max_concurrent_options_positions(),
            max_daily_loss_pct: default_max_daily_loss_pct(),
            max_consecutive_bad_trades: default_max_consecutive_bad_trades(),
            max_consecutive_errors: default_max_consecutive_errors(),
            max_trades_per_day: default_max_trades_per_day(),
            cycle_interval_secs: default_cycle_interval_secs(),
            options_enabled: true,
            enable_ai_adjudicator: true,
            enable_macro_gate: true,
            enable_gex_gate: true,
            enable_equity_engine: true,
            options: OptionsParams::default(),
            equity: EquityParams::default(),
        }
    }
}

impl PolicyConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read policy config from {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse policy config from {}", path.display()))?;
        config.migrate();
        info!(path = %path.display(), trading_mode = %config.trading_mode, "policy config loaded");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).context("failed to serialize policy config")?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;
        info!(path = %path.display(), "policy config saved (atomic)");
        Ok(())
    }

    /// Forward-migrate an older config file in place. Currently a no-op
    /// since `CURRENT_CONFIG_VERSION` is 1 and no schema changes have
    /// shipped yet; bump this when a future version needs to reinterpret a
    /// field rather than just default it.
    fn migrate(&mut self) {
        if self.config_version < CURRENT_CONFIG_VERSION {
            info!(from = self.config_version, to = CURRENT_CONFIG_VERSION, "migrating policy config");
            self.config_version = CURRENT_CONFIG_VERSION;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_starts_paused() {
        let config = PolicyConfig::default();
        assert_eq!(config.trading_mode, TradingMode::Paused);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("policy_config_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("policy.json");

        let mut config = PolicyConfig::default();
        config.max_trades_per_day = 7;
        config.save(&path).unwrap();

        let loaded = PolicyConfig::load(&path).unwrap();
        assert_eq!(loaded.max_trades_per_day, 7);
        assert_eq!(loaded.config_version, CURRENT_CONFIG_VERSION);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let json = r#"{"trading_mode": "Live"}"#;
        let config: PolicyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.trading_mode, TradingMode::Live);
        assert_eq!(config.max_trades_per_day, default_max_trades_per_day());
    }
}
