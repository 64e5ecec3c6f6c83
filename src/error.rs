//! Error types for one analysis pass.
//!
//! Every variant is local to a single symbol: callers running a batch decide
//! whether to skip the symbol or abort.

use thiserror::Error;

/// Errors produced while analyzing one bar series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Fewer bars than the pivot window or lookback periods require
    #[error("insufficient data: {required} bars required, {available} available")]
    InsufficientData { required: usize, available: usize },

    /// Fewer pivot points than the requested cluster count
    #[error("insufficient pivots: {required} required for clustering, {found} found")]
    InsufficientPivots { required: usize, found: usize },

    /// Zero-size candle body during the dominance check
    #[error("degenerate candle at bar {bar_index}: body size is zero")]
    DegenerateCandle { bar_index: usize },

    /// Threshold or window outside its valid range
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Timestamp not strictly greater than the previous bar's
    #[error("bar {index} is not strictly after bar {}", index.saturating_sub(1))]
    UnorderedBars { index: usize },

    /// Non-finite price, inverted range or negative volume
    #[error("malformed bar {index}: {reason}")]
    MalformedBar { index: usize, reason: String },
}

/// Errors loading an `AnalysisConfig` from disk.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] AnalysisError),
}
