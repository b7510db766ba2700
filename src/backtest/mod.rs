// =============================================================================
// BacktestHarness — bar replay + option-pricing simulator + trade ledger
// =============================================================================
//
// Self-contained: builds its own synthetic option chain and never touches a
// live `MarketDataGateway`. Reuses `DirectionAssessor`, the indicators, and
// Black-Scholes pricing the same way the live `OptionsEngine` cycle does, so
// a strategy change made to one is automatically exercised by the other.

pub mod harness;
pub mod ledger;
pub mod simulator;
pub mod stress;

pub use harness::{run_backtest, BacktestConfig};
pub use ledger::{compute_metrics, BacktestMetrics, BacktestTrade};
pub use simulator::{synthesize_chain, SyntheticChainConfig};
pub use stress::{apply_stress, StressMode};
