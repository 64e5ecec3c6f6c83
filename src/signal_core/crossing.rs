//! Level crossing detection
//!
//! A bar crosses a level intrabar (per `CrossingMode`) or across the
//! overnight gap between the previous close and its own open. Levels are
//! tried in ascending price order and the first match is the bar's only
//! event, so a bar spanning two levels reports the lower one.

use serde::{Deserialize, Serialize};

use super::bars::Bar;
use super::levels::{Level, LevelKind};
use crate::config::CrossingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Upward,
    Downward,
}

impl Direction {
    /// Role of a level once crossed in this direction
    pub fn level_kind(self) -> LevelKind {
        match self {
            Direction::Upward => LevelKind::Resistance,
            Direction::Downward => LevelKind::Support,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Upward => write!(f, "UP"),
            Direction::Downward => write!(f, "DOWN"),
        }
    }
}

/// A bar crossing one level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub bar_index: usize,
    /// The crossed level, relabeled Resistance (upward) or Support (downward)
    pub level: Level,
    pub direction: Direction,
    /// Crossed between the previous close and this open rather than intrabar
    pub is_overnight_gap: bool,
}

/// Intrabar crossing of `level` by `bar`.
///
/// The bar must approach from the side it leaves: under `HighLow` an upward
/// crossing needs the open or the previous close below the level, so a wick
/// dipping through a level the bar opened above is a bounce, not a crossing.
/// `prev_close` is `None` for the first bar.
pub fn intrabar_crossing(
    bar: &Bar,
    prev_close: Option<f64>,
    level: f64,
    mode: CrossingMode,
) -> Option<Direction> {
    match mode {
        CrossingMode::OpenClose => {
            if bar.open < level && level <= bar.close {
                Some(Direction::Upward)
            } else if bar.open > level && level >= bar.close {
                Some(Direction::Downward)
            } else {
                None
            }
        }
        CrossingMode::HighLow => {
            let from_below = bar.open < level || prev_close.map_or(false, |c| c < level);
            let from_above = bar.open > level || prev_close.map_or(false, |c| c > level);

            if from_below && bar.low < level && level <= bar.high && bar.close > level {
                Some(Direction::Upward)
            } else if from_above && bar.low <= level && level < bar.high && bar.close < level {
                Some(Direction::Downward)
            } else {
                None
            }
        }
    }
}

/// Crossing of `level` between `prev.close` and `bar.open`
pub fn gap_crossing(prev: &Bar, bar: &Bar, level: f64) -> Option<Direction> {
    if prev.close < level && level <= bar.open {
        Some(Direction::Upward)
    } else if prev.close > level && level >= bar.open {
        Some(Direction::Downward)
    } else {
        None
    }
}

/// Crossing event at bar `i`, if any. Bar 0 has no previous close and is
/// checked intrabar only.
pub fn crossing_at(bars: &[Bar], i: usize, levels: &[Level], mode: CrossingMode) -> Option<CrossingEvent> {
    let bar = bars.get(i)?;
    let prev = i.checked_sub(1).and_then(|p| bars.get(p));

    levels.iter().find_map(|level| {
        let prev_close = prev.map(|p| p.close);
        let (direction, is_overnight_gap) = match intrabar_crossing(bar, prev_close, level.price, mode) {
            Some(direction) => (direction, false),
            None => (gap_crossing(prev?, bar, level.price)?, true),
        };
        Some(CrossingEvent {
            bar_index: i,
            level: level.with_kind(direction.level_kind()),
            direction,
            is_overnight_gap,
        })
    })
}

/// Every crossing event of the series in bar order, at most one per bar.
/// `levels` must be sorted ascending.
pub fn detect_crossings(bars: &[Bar], levels: &[Level], mode: CrossingMode) -> Vec<CrossingEvent> {
    (1..bars.len())
        .filter_map(|i| crossing_at(bars, i, levels, mode))
        .collect()
}
