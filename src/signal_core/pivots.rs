//! Pivot (swing high / swing low) detection over a symmetric window

use super::bars::Bar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    pub fn opposite(self) -> Self {
        match self {
            PivotKind::High => PivotKind::Low,
            PivotKind::Low => PivotKind::High,
        }
    }
}

/// A local extremum of the bar series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    pub bar_index: usize,
    pub price: f64,
    pub kind: PivotKind,
}

/// Lazily yield the pivots of `bars` in bar order.
///
/// Bar `i` (with `window <= i < n - window`) is a High pivot when its high is
/// the strict maximum of `[i - window, i + window]` and a Low pivot when its
/// low is the strict minimum. A bar meeting both yields two pivots, High
/// first. The first and last `window` bars never qualify.
pub fn pivots(bars: &[Bar], window: usize) -> impl Iterator<Item = PivotPoint> + '_ {
    let end = bars.len().saturating_sub(window);

    (window..end).flat_map(move |i| {
        let mut neighbours = (i - window..=i + window).filter(move |&j| j != i);

        let high = bars[i].high;
        let is_high = neighbours.clone().all(|j| bars[j].high < high);

        let low = bars[i].low;
        let is_low = neighbours.all(|j| bars[j].low > low);

        let high_pivot = is_high.then_some(PivotPoint {
            bar_index: i,
            price: high,
            kind: PivotKind::High,
        });
        let low_pivot = is_low.then_some(PivotPoint {
            bar_index: i,
            price: low,
            kind: PivotKind::Low,
        });

        high_pivot.into_iter().chain(low_pivot)
    })
}

/// Collect every pivot of the series
pub fn detect_pivots(bars: &[Bar], window: usize) -> Vec<PivotPoint> {
    pivots(bars, window).collect()
}
