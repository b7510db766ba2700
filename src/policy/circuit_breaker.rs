// =============================================================================
// CircuitBreaker — consecutive-loss/error counters with a pause TTL
// =============================================================================
//
// Grounded on `risk.rs`'s four-breaker design (daily loss, consecutive
// losses, drawdown, trade count) and its date-rollover reset, narrowed to the
// two counters the options engine's circuit breaker actually needs per the
// invariant table: consecutive bad trades and consecutive gateway/parse
// errors, each independently able to pause the engine for a fixed TTL.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{info, warn};

/// How long a trip pauses new entries for.
pub const PAUSE_TTL_SECS: i64 = 60 * 60;
const RING_CAPACITY: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub consecutive_bad_trades: u32,
    pub consecutive_errors: u32,
    pub paused_until: Option<i64>,
    pub last_exits: Vec<ExitRecord>,
    pub current_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRecord {
    pub symbol: String,
    pub pnl: f64,
    pub timestamp: i64,
}

struct Inner {
    consecutive_bad_trades: u32,
    consecutive_errors: u32,
    paused_until: Option<i64>,
    last_exits: VecDeque<ExitRecord>,
    current_date: String,
}

pub struct CircuitBreaker {
    state: RwLock<Inner>,
    max_consecutive_bad_trades: u32,
    max_consecutive_errors: u32,
}

impl CircuitBreaker {
    pub fn new(max_consecutive_bad_trades: u32, max_consecutive_errors: u32) -> Self {
        Self {
            state: RwLock::new(Inner {
                consecutive_bad_trades: 0,
                consecutive_errors: 0,
                paused_until: None,
                last_exits: VecDeque::with_capacity(RING_CAPACITY),
                current_date: Utc::now().format("%Y-%m-%d").to_string(),
            }),
            max_consecutive_bad_trades,
            max_consecutive_errors,
        }
    }

    /// Record a completed trade's exit. A losing trade (pnl < 0) increments
    /// the bad-trade streak; a winner resets it to zero.
    pub fn record_exit(&self, symbol: &str, pnl: f64) {
        self.maybe_reset_daily();
        let mut s = self.state.write();

        if pnl < 0.0 {
            s.consecutive_bad_trades += 1;
        } else {
            s.consecutive_bad_trades = 0;
        }

        if s.last_exits.len() == RING_CAPACITY {
            s.last_exits.pop_front();
        }
        s.last_exits.push_back(ExitRecord {
            symbol: symbol.to_string(),
            pnl,
            timestamp: Utc::now().timestamp(),
        });

        if s.consecutive_bad_trades >= self.max_consecutive_bad_trades {
            let until = Utc::now().timestamp() + PAUSE_TTL_SECS;
            s.paused_until = Some(until);
            warn!(
                consecutive_bad_trades = s.consecutive_bad_trades,
                until, "circuit breaker tripped on consecutive bad trades"
            );
        }
    }

    /// Record a gateway/parse error. Independent streak from bad trades.
    pub fn record_error(&self) {
        self.maybe_reset_daily();
        let mut s = self.state.write();
        s.consecutive_errors += 1;
        if s.consecutive_errors >= self.max_consecutive_errors {
            let until = Utc::now().timestamp() + PAUSE_TTL_SECS;
            s.paused_until = Some(until);
            warn!(
                consecutive_errors = s.consecutive_errors,
                until, "circuit breaker tripped on consecutive errors"
            );
        }
    }

    /// A successful gateway call resets the error streak; it does not affect
    /// the bad-trade streak.
    pub fn record_success(&self) {
        let mut s = self.state.write();
        s.consecutive_errors = 0;
    }

    /// Whether the breaker currently blocks new entries, and why.
    pub fn is_paused(&self) -> Option<String> {
        let s = self.state.read();
        let until = s.paused_until?;
        if Utc::now().timestamp() >= until {
            return None;
        }
        Some(format!("circuit breaker paused until epoch {until}"))
    }

    /// Manually clear a trip (e.g. admin override).
    pub fn reset(&self) {
        let mut s = self.state.write();
        s.consecutive_bad_trades = 0;
        s.consecutive_errors = 0;
        s.paused_until = None;
        info!("circuit breaker manually reset");
    }

    pub fn snapshot(&self) -> CircuitBreakerState {
        self.maybe_reset_daily();
        let s = self.state.read();
        CircuitBreakerState {
            consecutive_bad_trades: s.consecutive_bad_trades,
            consecutive_errors: s.consecutive_errors,
            paused_until: s.paused_until,
            last_exits: s.last_exits.iter().cloned().collect(),
            current_date: s.current_date.clone(),
        }
    }

    fn maybe_reset_daily(&self) {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        {
            let s = self.state.read();
            if s.current_date == today {
                return;
            }
        }
        let mut s = self.state.write();
        if s.current_date != today {
            s.consecutive_bad_trades = 0;
            s.consecutive_errors = 0;
            s.current_date = today;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unpaused() {
        let cb = CircuitBreaker::new(3, 3);
        assert!(cb.is_paused().is_none());
    }

    #[test]
    fn trips_after_n_consecutive_losses() {
        let cb = CircuitBreaker::new(3, 3);
        cb.record_exit("SPY", -10.0);
        cb.record_exit("SPY", -5.0);
        assert!(cb.is_paused().is_none());
        cb.record_exit("SPY", -1.0);
        assert!(cb.is_paused().is_some());
    }

    #[test]
    fn winning_trade_resets_streak() {
        let cb = CircuitBreaker::new(3, 3);
        cb.record_exit("SPY", -10.0);
        cb.record_exit("SPY", -5.0);
        cb.record_exit("SPY", 20.0);
        cb.record_exit("SPY", -1.0);
        cb.record_exit("SPY", -1.0);
        assert!(cb.is_paused().is_none());
    }

    #[test]
    fn trips_after_n_consecutive_errors() {
        let cb = CircuitBreaker::new(3, 2);
        cb.record_error();
        assert!(cb.is_paused().is_none());
        cb.record_error();
        assert!(cb.is_paused().is_some());
    }

    #[test]
    fn success_resets_error_streak() {
        let cb = CircuitBreaker::new(3, 2);
        cb.record_error();
        cb.record_success();
        cb.record_error();
        assert!(cb.is_paused().is_none());
    }

    #[test]
    fn manual_reset_clears_trip() {
        let cb = CircuitBreaker::new(1, 1);
        cb.record_error();
        assert!(cb.is_paused().is_some());
        cb.reset();
        assert!(cb.is_paused().is_none());
    }

    #[test]
    fn ring_buffer_caps_at_capacity() {
        let cb = CircuitBreaker::new(100, 100);
        for i in 0..30 {
            cb.record_exit("SPY", i as f64);
        }
        assert_eq!(cb.snapshot().last_exits.len(), RING_CAPACITY);
    }
}
