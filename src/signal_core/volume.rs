//! Volume confirmation against a trailing baseline

use serde::{Deserialize, Serialize};

use super::bars::Bar;

/// Strength of the crossing bar's volume relative to its baseline.
/// Ordered, so `tier >= VolumeTier::Moderate` reads as "confirmed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VolumeTier {
    None,
    Moderate,
    Strong,
}

impl std::fmt::Display for VolumeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeTier::None => write!(f, "none"),
            VolumeTier::Moderate => write!(f, "moderate"),
            VolumeTier::Strong => write!(f, "strong"),
        }
    }
}

/// Mean volume of `[max(0, i - lookback), i)`, `None` for an empty window
pub fn baseline_volume(bars: &[Bar], i: usize, lookback: usize) -> Option<f64> {
    let end = i.min(bars.len());
    let window = &bars[end.saturating_sub(lookback)..end];
    if window.is_empty() {
        return None;
    }
    Some(window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64)
}

/// Classify bar `i`'s volume against the trailing baseline `a`:
/// below `moderate * a` is None, below `strong * a` Moderate, else Strong.
/// A missing or zero baseline never confirms.
pub fn volume_tier(bars: &[Bar], i: usize, lookback: usize, moderate: f64, strong: f64) -> VolumeTier {
    let Some(bar) = bars.get(i) else {
        return VolumeTier::None;
    };
    let baseline = match baseline_volume(bars, i, lookback) {
        Some(a) if a > 0.0 => a,
        _ => return VolumeTier::None,
    };

    if bar.volume >= strong * baseline {
        VolumeTier::Strong
    } else if bar.volume >= moderate * baseline {
        VolumeTier::Moderate
    } else {
        VolumeTier::None
    }
}
