//! Candle-body dominance: how much of the crossing bar's body lies beyond the level

use super::bars::Bar;
use super::crossing::Direction;
use crate::error::AnalysisError;

/// Share of the body beyond `level` in `direction`, in `[0, 1]`.
///
/// Upward counts the part of the body above `max(open, level)`, downward the
/// part below `min(open, level)`. A zero-size body has no share and is an
/// error.
pub fn body_share(bar: &Bar, bar_index: usize, level: f64, direction: Direction) -> Result<f64, AnalysisError> {
    let body = bar.body_size();
    if body == 0.0 {
        return Err(AnalysisError::DegenerateCandle { bar_index });
    }

    let beyond = match direction {
        Direction::Upward => bar.close - bar.open.max(level),
        Direction::Downward => bar.open.min(level) - bar.close,
    };
    Ok((beyond / body).clamp(0.0, 1.0))
}

/// Whether at least `threshold` of the body lies beyond `level`
pub fn body_dominance(
    bar: &Bar,
    bar_index: usize,
    level: f64,
    direction: Direction,
    threshold: f64,
) -> Result<bool, AnalysisError> {
    Ok(body_share(bar, bar_index, level, direction)? >= threshold)
}
