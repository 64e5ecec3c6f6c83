// Library crate - exports the breakout pipeline and its collaborators

pub mod config;
pub mod error;
pub mod signal_core;
pub mod scan;
pub mod bars_csv;

// Re-export commonly used types
pub use config::{AnalysisConfig, CrossingMode};
pub use error::{AnalysisError, ConfigError};
pub use scan::{analyze, analyze_batch, evaluate_levels, Analysis};
pub use signal_core::{Bar, BarSeries, Classification, Signal, SignalQuery};
