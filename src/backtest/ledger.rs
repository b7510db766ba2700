// =============================================================================
// BacktestTrade ledger and aggregated performance metrics
// =============================================================================
//
// Grounded on `goldspanlabs-optopsy-mcp`'s trade-log + summary-statistics
// split: every simulated round trip is appended as a flat row, then
// `compute_metrics` folds the ledger into win rate / profit factor / drawdown
// / Sharpe the same way that repo reduces its backtest output.

use serde::{Deserialize, Serialize};

use crate::types::{Direction, OptionSide};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub underlying: String,
    pub direction: Direction,
    pub option_side: OptionSide,
    pub strike: f64,
    pub entry_spot: f64,
    pub exit_spot: f64,
    pub entry_premium: f64,
    pub exit_premium: f64,
    pub entry_time: i64,
    pub exit_time: i64,
    pub reason: String,
    pub gross_pnl: f64,
    pub net_pnl: f64,
    pub pnl_pct: f64,
    pub hold_minutes: i64,
    pub slippage: f64,
    pub commission: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BacktestMetrics {
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub avg_hold_minutes: f64,
    pub total_slippage: f64,
    pub total_commission: f64,
    pub net_pnl: f64,
    pub by_direction: Vec<(String, usize, f64)>,
    pub by_exit_reason: Vec<(String, usize, f64)>,
}

/// Aggregate a day (or multi-day) trade ledger into summary metrics.
/// Trades must be sorted by `exit_time` ascending for the drawdown and
/// Sharpe calculations to be meaningful; an empty ledger yields all-zero
/// metrics rather than NaN.
pub fn compute_metrics(trades: &[BacktestTrade]) -> BacktestMetrics {
    if trades.is_empty() {
        return BacktestMetrics::default();
    }

    let total_trades = trades.len();
    let wins = trades.iter().filter(|t| t.net_pnl > 0.0).count();
    let win_rate = wins as f64 / total_trades as f64;

    let gross_profit: f64 = trades.iter().filter(|t| t.net_pnl > 0.0).map(|t| t.net_pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.net_pnl < 0.0).map(|t| t.net_pnl.abs()).sum();
    let profit_factor = if gross_loss > 0.0 { gross_profit / gross_loss } else { gross_profit.max(0.0) };

    let net_pnl: f64 = trades.iter().map(|t| t.net_pnl).sum();
    let total_slippage: f64 = trades.iter().map(|t| t.slippage).sum();
    let total_commission: f64 = trades.iter().map(|t| t.commission).sum();
    let avg_hold_minutes = trades.iter().map(|t| t.hold_minutes as f64).sum::<f64>() / total_trades as f64;

    let max_drawdown = max_drawdown_from_equity_curve(trades);
    let sharpe = daily_sharpe(trades);

    let by_direction = group_pnl_by(trades, |t| t.direction.to_string());
    let by_exit_reason = group_pnl_by(trades, |t| t.reason.clone());

    BacktestMetrics {
        total_trades,
        win_rate,
        profit_factor,
        max_drawdown,
        sharpe,
        avg_hold_minutes,
        total_slippage,
        total_commission,
        net_pnl,
        by_direction,
        by_exit_reason,
    }
}

fn group_pnl_by(trades: &[BacktestTrade], key: impl Fn(&BacktestTrade) -> String) -> Vec<(String, usize, f64)> {
    let mut groups: Vec<(String, usize, f64)> = Vec::new();
    for t in trades {
        let k = key(t);
        match groups.iter_mut().find(|(name, _, _)| *name == k) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 += t.net_pnl;
            }
            None => groups.push((k, 1, t.net_pnl)),
        }
    }
    groups
}

fn max_drawdown_from_equity_curve(trades: &[BacktestTrade]) -> f64 {
    let mut equity = 0.0;
    let mut peak = 0.0;
    let mut max_dd = 0.0;
    for t in trades {
        equity += t.net_pnl;
        if equity > peak {
            peak = equity;
        }
        let dd = peak - equity;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Sharpe over per-day net P&L, annualized by sqrt(252) per the spec's
/// metric definition. Trades are bucketed to a day by dividing `exit_time`
/// (epoch seconds) into 86_400s buckets.
fn daily_sharpe(trades: &[BacktestTrade]) -> f64 {
    let mut by_day: Vec<(i64, f64)> = Vec::new();
    for t in trades {
        let day = t.exit_time / 86_400;
        match by_day.iter_mut().find(|(d, _)| *d == day) {
            Some(entry) => entry.1 += t.net_pnl,
            None => by_day.push((day, t.net_pnl)),
        }
    }
    if by_day.len() < 2 {
        return 0.0;
    }
    let daily: Vec<f64> = by_day.iter().map(|(_, pnl)| *pnl).collect();
    let mean = daily.iter().sum::<f64>() / daily.len() as f64;
    let variance = daily.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / daily.len() as f64;
    let stdev = variance.sqrt();
    if stdev <= f64::EPSILON {
        return 0.0;
    }
    (mean / stdev) * (252.0_f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(net_pnl: f64, exit_time: i64, reason: &str) -> BacktestTrade {
        BacktestTrade {
            underlying: "SPY".to_string(),
            direction: Direction::Bullish,
            option_side: OptionSide::Call,
            strike: 500.0,
            entry_spot: 500.0,
            exit_spot: 501.0,
            entry_premium: 2.0,
            exit_premium: 2.2,
            entry_time: exit_time - 600,
            exit_time,
            reason: reason.to_string(),
            gross_pnl: net_pnl,
            net_pnl,
            pnl_pct: net_pnl / 200.0,
            hold_minutes: 10,
            slippage: 0.02,
            commission: 0.65,
        }
    }

    #[test]
    fn empty_ledger_yields_zeroed_metrics() {
        let metrics = compute_metrics(&[]);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
    }

    #[test]
    fn win_rate_and_profit_factor_from_mixed_trades() {
        let trades = vec![trade(100.0, 86_400, "profit_target"), trade(-50.0, 172_800, "premium_stop")];
        let metrics = compute_metrics(&trades);
        assert_eq!(metrics.total_trades, 2);
        assert!((metrics.win_rate - 0.5).abs() < 1e-9);
        assert!((metrics.profit_factor - 2.0).abs() < 1e-9);
    }

    #[test]
    fn all_losses_yields_zero_profit_factor() {
        let trades = vec![trade(-10.0, 86_400, "premium_stop")];
        let metrics = compute_metrics(&trades);
        assert_eq!(metrics.profit_factor, 0.0);
    }

    #[test]
    fn max_drawdown_tracks_peak_to_trough() {
        let trades = vec![
            trade(100.0, 86_400, "profit_target"),
            trade(-150.0, 172_800, "premium_stop"),
            trade(50.0, 259_200, "profit_target"),
        ];
        let metrics = compute_metrics(&trades);
        assert!((metrics.max_drawdown - 150.0).abs() < 1e-9);
    }

    #[test]
    fn by_exit_reason_groups_correctly() {
        let trades = vec![
            trade(100.0, 86_400, "profit_target"),
            trade(-50.0, 172_800, "profit_target"),
            trade(-20.0, 259_200, "premium_stop"),
        ];
        let metrics = compute_metrics(&trades);
        let profit_target = metrics.by_exit_reason.iter().find(|(name, _, _)| name == "profit_target").unwrap();
        assert_eq!(profit_target.1, 2);
        assert!((profit_target.2 - 50.0).abs() < 1e-9);
    }
}
