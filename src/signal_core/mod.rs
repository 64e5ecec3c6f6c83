//! Signal Core - level breakout and fakeout detection
//!
//! This module contains the stages of one analysis pass, leaf to root:
//! - Bar series validation
//! - Pivot detection
//! - Level building (seeded k-means over pivot prices)
//! - Crossing detection
//! - Pre-cross stability, volume, candle-body and swing-trend confirmers
//! - Signal classification state machine
//! - Post-breakout hold check and level proximity

pub mod bars;
pub mod pivots;
pub mod kmeans;
pub mod levels;
pub mod crossing;
pub mod stability;
pub mod volume;
pub mod candle_body;
pub mod swing_trend;
pub mod classifier;
pub mod retest;
pub mod proximity;

// Re-export commonly used types
pub use bars::{Bar, BarSeries};
pub use pivots::{detect_pivots, pivots, PivotKind, PivotPoint};
pub use levels::{build_levels, Level, LevelKind};
pub use crossing::{detect_crossings, CrossingEvent, Direction};
pub use volume::VolumeTier;
pub use swing_trend::TrendCheck;
pub use classifier::{Classification, Classifier, ConfirmationResult, Signal, SignalQuery, SignalState};
pub use retest::{hold_status, HoldStatus};
pub use proximity::{levels_near_price, recent_level_breaks, NearLevel};
