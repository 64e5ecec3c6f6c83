//! Configuration for the breakout pipeline

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, ConfigError};

/// Which prices of the crossing bar must straddle a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingMode {
    /// Open and close on opposite sides (body crossing)
    OpenClose,
    /// Bar range straddles the level and the close settles beyond it
    HighLow,
}

impl Default for CrossingMode {
    fn default() -> Self {
        Self::HighLow
    }
}

impl std::fmt::Display for CrossingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenClose => write!(f, "open/close"),
            Self::HighLow => write!(f, "high/low"),
        }
    }
}

/// Flat set of tunables for one analysis pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Bars on each side of a pivot candidate (default: 3)
    pub pivot_window: usize,

    /// Fixed number of clusters when `dynamic_cluster` is off (default: 5)
    pub cluster_count: usize,

    /// Select the cluster count by silhouette score instead
    pub dynamic_cluster: bool,

    /// Upper bound of the silhouette search (default: 10)
    pub max_clusters: usize,

    /// Seed for k-means++ initialization
    pub cluster_seed: u64,

    /// Independent k-means runs per cluster count, best inertia kept
    pub cluster_restarts: usize,

    /// Lloyd iteration cap per run
    pub cluster_max_iterations: usize,

    /// Bars before a crossing that must not straddle the level (default: 20)
    pub check_periods: usize,

    /// Bars in the trailing volume baseline (default: 10)
    pub lookback_volume: usize,

    /// Volume multiple of the baseline for a moderate confirmation
    pub volume_moderate_multiple: f64,

    /// Volume multiple of the baseline for a strong confirmation
    pub volume_strong_multiple: f64,

    /// Share of the candle body that must lie beyond the level (0..=1)
    pub body_threshold: f64,

    /// Rounding granularity for level prices
    pub tick_size: f64,

    /// Intrabar crossing predicate
    pub crossing_mode: CrossingMode,

    /// Trailing bars searched by the "within last N bars" query
    pub signal_window: usize,

    /// Bars after a breakout inspected by the hold check
    pub retest_periods: usize,

    /// Relative distance for a level to count as "near" a price
    pub proximity_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pivot_window: 3,
            cluster_count: 5,
            dynamic_cluster: false,
            max_clusters: 10,
            cluster_seed: 42,
            cluster_restarts: 10,
            cluster_max_iterations: 100,
            check_periods: 20,
            lookback_volume: 10,
            volume_moderate_multiple: 1.5,
            volume_strong_multiple: 2.5,
            body_threshold: 0.7,
            tick_size: 0.01,
            crossing_mode: CrossingMode::HighLow,
            signal_window: 5,
            retest_periods: 4,
            proximity_threshold: 0.02,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AnalysisConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds and windows outside their valid ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |msg: String| Err(AnalysisError::InvalidConfiguration(msg));

        if self.pivot_window == 0 {
            return invalid("pivot_window must be at least 1".to_string());
        }
        if !self.dynamic_cluster && self.cluster_count == 0 {
            return invalid("cluster_count must be at least 1".to_string());
        }
        if self.dynamic_cluster && self.max_clusters < 2 {
            return invalid(format!(
                "max_clusters must be at least 2 for dynamic clustering, got {}",
                self.max_clusters
            ));
        }
        if self.cluster_restarts == 0 || self.cluster_max_iterations == 0 {
            return invalid("cluster_restarts and cluster_max_iterations must be positive".to_string());
        }
        if self.check_periods == 0 {
            return invalid("check_periods must be at least 1".to_string());
        }
        if self.lookback_volume == 0 {
            return invalid("lookback_volume must be at least 1".to_string());
        }
        if !(self.volume_moderate_multiple.is_finite() && self.volume_moderate_multiple > 0.0) {
            return invalid(format!(
                "volume_moderate_multiple must be positive, got {}",
                self.volume_moderate_multiple
            ));
        }
        if !(self.volume_strong_multiple.is_finite()
            && self.volume_strong_multiple > self.volume_moderate_multiple)
        {
            return invalid(format!(
                "volume_strong_multiple ({}) must exceed volume_moderate_multiple ({})",
                self.volume_strong_multiple, self.volume_moderate_multiple
            ));
        }
        if !(0.0..=1.0).contains(&self.body_threshold) {
            return invalid(format!(
                "body_threshold must be within [0, 1], got {}",
                self.body_threshold
            ));
        }
        if !(self.tick_size.is_finite() && self.tick_size > 0.0) {
            return invalid(format!("tick_size must be positive, got {}", self.tick_size));
        }
        if self.signal_window == 0 {
            return invalid("signal_window must be at least 1".to_string());
        }
        if self.retest_periods == 0 {
            return invalid("retest_periods must be at least 1".to_string());
        }
        if !(self.proximity_threshold.is_finite() && self.proximity_threshold >= 0.0) {
            return invalid(format!(
                "proximity_threshold must be non-negative, got {}",
                self.proximity_threshold
            ));
        }
        Ok(())
    }

    /// Minimum series length for a full pass: one complete pivot window and
    /// one bar beyond each trailing lookback
    pub fn min_bars(&self) -> usize {
        (2 * self.pivot_window + 1)
            .max(self.check_periods + 1)
            .max(self.lookback_volume + 1)
    }
}
