//! Pre-cross stability: price stayed on one side of a level before crossing it

use super::bars::Bar;
use crate::config::CrossingMode;

/// Whether `bar` itself straddles `level` (strictly on both sides)
pub fn straddles(bar: &Bar, level: f64, mode: CrossingMode) -> bool {
    match mode {
        CrossingMode::OpenClose => {
            (bar.open < level && bar.close > level) || (bar.open > level && bar.close < level)
        }
        CrossingMode::HighLow => bar.low < level && level < bar.high,
    }
}

/// Whether the gap from `prev.close` to `bar.open` jumps over `level`
pub fn gaps_across(prev: &Bar, bar: &Bar, level: f64) -> bool {
    (prev.close < level && bar.open > level) || (prev.close > level && bar.open < level)
}

/// Stability of a crossing at bar `i`.
///
/// Inspects `[max(0, i - check_periods), i)`: any bar straddling `level`, or
/// any consecutive pair inside the window gapping across it, makes the
/// crossing unstable. An empty window is stable.
pub fn is_stable(bars: &[Bar], i: usize, level: f64, check_periods: usize, mode: CrossingMode) -> bool {
    let end = i.min(bars.len());
    let start = end.saturating_sub(check_periods);
    let window = &bars[start..end];

    let straddled = window.iter().any(|b| straddles(b, level, mode))
        || window.windows(2).any(|pair| gaps_across(&pair[0], &pair[1], level));

    !straddled
}
