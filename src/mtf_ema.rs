// =============================================================================
// MTFEMA — multi-timeframe 9/20-EMA trend ladder
// =============================================================================
//
// Grounded directly on `htf_analysis.rs`'s two-timeframe EMA-stack alignment
// check, generalized from a fixed 15M/1H pair to the full seven-rung ladder
// {2m, 5m, 15m, 30m, 1h, 4h, 1D} and from a binary buy/sell gate to a
// confluence score across all seven.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::ema::calculate_ema;
use crate::types::Direction;

/// Timeframes evaluated, fastest to slowest.
pub const TIMEFRAMES: &[&str] = &["2m", "5m", "15m", "30m", "1h", "4h", "1D"];

const FAST_PERIOD: usize = 9;
const SLOW_PERIOD: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeframeTrend {
    Bullish,
    Bearish,
    Flat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeReading {
    pub timeframe: String,
    pub trend: TimeframeTrend,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub separation_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtfEmaResult {
    pub readings: Vec<TimeframeReading>,
    pub bullish_count: usize,
    pub bearish_count: usize,
    /// Fraction of evaluated timeframes agreeing with the majority direction.
    pub confluence: f64,
    pub consensus: Option<Direction>,
    /// Additive boost applied to DirectionAssessor conviction (same integer
    /// scale as conviction itself): +2 at strong confluence, +1 at moderate
    /// confluence, -1 when the ladder is both thin and scattered.
    pub conviction_boost: i32,
}

/// Classify a single timeframe's EMA stack from its closing prices. Returns
/// `None` when there is insufficient data for the slow EMA.
fn classify_timeframe(timeframe: &str, closes: &[f64]) -> Option<TimeframeReading> {
    if closes.len() < SLOW_PERIOD {
        debug!(timeframe, len = closes.len(), "insufficient closes for MTFEMA");
        return None;
    }
    let fast = calculate_ema(closes, FAST_PERIOD);
    let slow = calculate_ema(closes, SLOW_PERIOD);
    let ema_fast = *fast.last()?;
    let ema_slow = *slow.last()?;

    let separation_pct = if ema_slow.abs() > f64::EPSILON {
        ((ema_fast - ema_slow) / ema_slow) * 100.0
    } else {
        0.0
    };

    let trend = if separation_pct.abs() < 0.01 {
        TimeframeTrend::Flat
    } else if ema_fast > ema_slow {
        TimeframeTrend::Bullish
    } else {
        TimeframeTrend::Bearish
    };

    Some(TimeframeReading {
        timeframe: timeframe.to_string(),
        trend,
        ema_fast,
        ema_slow,
        separation_pct,
    })
}

/// Evaluate the full ladder given a map of timeframe -> closes. Timeframes
/// missing from the map, or with insufficient data, are simply omitted from
/// `readings` rather than failing the whole computation.
pub fn evaluate(closes_by_timeframe: &std::collections::HashMap<String, Vec<f64>>) -> MtfEmaResult {
    let mut readings = Vec::new();
    for tf in TIMEFRAMES {
        if let Some(closes) = closes_by_timeframe.get(*tf) {
            if let Some(reading) = classify_timeframe(tf, closes) {
                readings.push(reading);
            }
        }
    }

    let bullish_count = readings.iter().filter(|r| r.trend == TimeframeTrend::Bullish).count();
    let bearish_count = readings.iter().filter(|r| r.trend == TimeframeTrend::Bearish).count();
    let evaluated = readings.len();

    let (consensus, confluence) = if evaluated == 0 {
        (None, 0.0)
    } else if bullish_count > bearish_count {
        (Some(Direction::Bullish), bullish_count as f64 / evaluated as f64)
    } else if bearish_count > bullish_count {
        (Some(Direction::Bearish), bearish_count as f64 / evaluated as f64)
    } else {
        (None, 0.5)
    };

    let agreeing = bullish_count.max(bearish_count);
    let conviction_boost = if evaluated >= 7 && agreeing >= 6 {
        2
    } else if evaluated > 0 && agreeing as f64 / evaluated as f64 >= 0.8 {
        1
    } else if evaluated >= 4 && agreeing as f64 / evaluated as f64 < 0.6 {
        -1
    } else {
        0
    };

    MtfEmaResult {
        readings,
        bullish_count,
        bearish_count,
        confluence,
        consensus,
        conviction_boost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uptrend(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    fn downtrend(len: usize) -> Vec<f64> {
        (0..len).map(|i| 200.0 - i as f64 * 0.5).collect()
    }

    #[test]
    fn insufficient_data_omits_timeframe() {
        let mut map = std::collections::HashMap::new();
        map.insert("2m".to_string(), vec![1.0, 2.0]);
        let result = evaluate(&map);
        assert!(result.readings.is_empty());
        assert!(result.consensus.is_none());
    }

    #[test]
    fn all_bullish_ladder_yields_bullish_consensus_and_boost() {
        let mut map = std::collections::HashMap::new();
        for tf in TIMEFRAMES {
            map.insert(tf.to_string(), uptrend(40));
        }
        let result = evaluate(&map);
        assert_eq!(result.consensus, Some(Direction::Bullish));
        assert_eq!(result.bullish_count, 7);
        assert!((result.confluence - 1.0).abs() < 1e-9);
        assert_eq!(result.conviction_boost, 2);
    }

    #[test]
    fn all_bearish_ladder_yields_bearish_consensus() {
        let mut map = std::collections::HashMap::new();
        for tf in TIMEFRAMES {
            map.insert(tf.to_string(), downtrend(40));
        }
        let result = evaluate(&map);
        assert_eq!(result.consensus, Some(Direction::Bearish));
        assert_eq!(result.bearish_count, 7);
    }

    #[test]
    fn split_ladder_has_no_strong_boost() {
        let mut map = std::collections::HashMap::new();
        for (i, tf) in TIMEFRAMES.iter().enumerate() {
            let closes = if i % 2 == 0 { uptrend(40) } else { downtrend(40) };
            map.insert(tf.to_string(), closes);
        }
        let result = evaluate(&map);
        assert!(result.conviction_boost <= 0);
    }

    #[test]
    fn empty_map_has_zero_confluence() {
        let map = std::collections::HashMap::new();
        let result = evaluate(&map);
        assert_eq!(result.confluence, 0.0);
        assert_eq!(result.conviction_boost, 0);
    }
}
