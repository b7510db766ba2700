// =============================================================================
// GEX Module — dealer gamma exposure engine and heatmap
// =============================================================================

pub mod engine;
pub mod heatmap;

pub use engine::{GexEngine, GexRegime, GexStrikeRow, GexSummary, Wall};
pub use heatmap::GammaHeatmap;
