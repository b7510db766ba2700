// =============================================================================
// Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the core technical indicators used
// by the trading engine. Most return `Option<T>`/empty `Vec` so callers are
// forced to handle insufficient-data and numerical edge cases; none panic.

pub mod atr;
pub mod bollinger;
pub mod choppiness;
pub mod ema;
pub mod levels;
pub mod macd;
pub mod rsi;
pub mod vwap;

pub use atr::{calculate_atr, current_atr_pct};
pub use bollinger::{band_touch, calculate_bollinger, BollingerBands};
pub use choppiness::{calculate_choppiness, is_choppy};
pub use ema::{calculate_ema, current_ema};
pub use levels::nearest_support_resistance;
pub use macd::{calculate_macd, MacdResult};
pub use rsi::{calculate_rsi, current_rsi};
pub use vwap::{calculate_vwap, price_above_vwap};
