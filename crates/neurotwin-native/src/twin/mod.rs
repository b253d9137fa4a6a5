//! Digital twin construction, intervention simulation and trend analysis

pub mod builder;
pub mod intervention;
pub mod longitudinal;

pub use builder::{build_twin, DigitalTwin};
pub use intervention::{simulate, Intervention, InterventionTable, SimulationResult};
pub use longitudinal::{analyze_trend, HistoryEntry, TrendReport, TrendSummary};
