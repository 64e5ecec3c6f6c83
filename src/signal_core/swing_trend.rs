//! Swing-trend confirmation and stop placement from prior pivots

use super::crossing::Direction;
use super::pivots::{PivotKind, PivotPoint};

/// Outcome of the swing-trend check at one crossing bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendCheck {
    pub supported: bool,
    /// Most recent opposite-kind pivot before the crossing bar, set only
    /// when the trend is supported
    pub stop_loss: Option<f64>,
}

impl TrendCheck {
    pub const UNSUPPORTED: TrendCheck = TrendCheck {
        supported: false,
        stop_loss: None,
    };
}

/// Check the swing structure formed before bar `i`.
///
/// Upward needs the last two High pivots strictly rising, downward the last
/// two Low pivots strictly falling. Only pivots with `bar_index < i` count.
pub fn confirm_trend(pivots: &[PivotPoint], i: usize, direction: Direction) -> TrendCheck {
    let (same, opposite) = match direction {
        Direction::Upward => (PivotKind::High, PivotKind::Low),
        Direction::Downward => (PivotKind::Low, PivotKind::High),
    };

    let mut prior = pivots.iter().rev().filter(|p| p.bar_index < i);
    let mut same_kind = prior.clone().filter(|p| p.kind == same).map(|p| p.price);

    let (Some(last), Some(before)) = (same_kind.next(), same_kind.next()) else {
        return TrendCheck::UNSUPPORTED;
    };

    let supported = match direction {
        Direction::Upward => last > before,
        Direction::Downward => last < before,
    };
    if !supported {
        return TrendCheck::UNSUPPORTED;
    }

    TrendCheck {
        supported,
        stop_loss: prior.find(|p| p.kind == opposite).map(|p| p.price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pivot(bar_index: usize, price: f64, kind: PivotKind) -> PivotPoint {
        PivotPoint { bar_index, price, kind }
    }

    fn swings() -> Vec<PivotPoint> {
        vec![
            pivot(3, 95.0, PivotKind::Low),
            pivot(8, 98.0, PivotKind::High),
            pivot(12, 96.0, PivotKind::Low),
            pivot(16, 99.0, PivotKind::High),
            pivot(20, 97.0, PivotKind::Low),
            pivot(26, 101.0, PivotKind::High),
        ]
    }

    #[test]
    fn test_rising_highs_support_upward() {
        let check = confirm_trend(&swings(), 25, Direction::Upward);
        assert!(check.supported);
        assert_eq!(check.stop_loss, Some(97.0));
    }

    #[test]
    fn test_future_pivots_ignored() {
        // At bar 17 the last highs are 98 then 99, latest low 96
        let check = confirm_trend(&swings(), 17, Direction::Upward);
        assert_eq!(check, TrendCheck { supported: true, stop_loss: Some(96.0) });

        // A pivot on the crossing bar itself is not "before" it
        let check = confirm_trend(&swings(), 16, Direction::Upward);
        assert!(!check.supported);
    }

    #[test]
    fn test_rising_lows_do_not_support_downward() {
        assert_eq!(confirm_trend(&swings(), 25, Direction::Downward), TrendCheck::UNSUPPORTED);
    }

    #[test]
    fn test_falling_lows_support_downward() {
        let pivots = vec![
            pivot(2, 105.0, PivotKind::Low),
            pivot(6, 108.0, PivotKind::High),
            pivot(10, 103.0, PivotKind::Low),
        ];
        let check = confirm_trend(&pivots, 12, Direction::Downward);
        assert!(check.supported);
        assert_eq!(check.stop_loss, Some(108.0));
    }

    #[test]
    fn test_no_opposite_pivot_means_no_stop() {
        let pivots = vec![pivot(2, 98.0, PivotKind::High), pivot(6, 99.0, PivotKind::High)];
        let check = confirm_trend(&pivots, 10, Direction::Upward);
        assert!(check.supported);
        assert_eq!(check.stop_loss, None);
    }

    #[test]
    fn test_too_few_pivots() {
        let pivots = vec![pivot(2, 98.0, PivotKind::High)];
        assert_eq!(confirm_trend(&pivots, 10, Direction::Upward), TrendCheck::UNSUPPORTED);
        assert_eq!(confirm_trend(&[], 10, Direction::Downward), TrendCheck::UNSUPPORTED);
    }
}
