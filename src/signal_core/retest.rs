//! Post-breakout hold check
//!
//! After a breakout the level is expected to hold: the following bars should
//! trade clear of it. A bar whose range touches the level again is a retest.

use serde::{Deserialize, Serialize};

use super::bars::Bar;
use super::crossing::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HoldStatus {
    /// No bar of the hold window touched the level. `new_level` is the
    /// extreme reached beyond it (highest high upward, lowest low downward).
    Held { new_level: f64 },
    /// First bar whose range touched the level again
    Retested { bar_index: usize },
    /// Series ended before the hold window completed
    Pending,
}

/// Inspect bars `(i, i + periods]` after a breakout of `level` at bar `i`
pub fn hold_status(bars: &[Bar], i: usize, level: f64, direction: Direction, periods: usize) -> HoldStatus {
    let Some(breakout) = bars.get(i) else {
        return HoldStatus::Pending;
    };
    let end = (i + periods).min(bars.len() - 1);
    let after = &bars[i + 1..=end];

    if let Some(offset) = after.iter().position(|b| b.low <= level && level <= b.high) {
        return HoldStatus::Retested {
            bar_index: i + 1 + offset,
        };
    }
    if after.len() < periods {
        return HoldStatus::Pending;
    }

    let held = std::iter::once(breakout).chain(after);
    let new_level = match direction {
        Direction::Upward => held.map(|b| b.high).fold(f64::NEG_INFINITY, f64::max),
        Direction::Downward => held.map(|b| b.low).fold(f64::INFINITY, f64::min),
    };
    HoldStatus::Held { new_level }
}
