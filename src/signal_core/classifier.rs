//! Signal classification state machine
//!
//! One crossing event walks `Crossed -> {Stable, Unstable}`, then
//! `Stable -> {Confirmed, Fakeout}` or `Unstable -> Fakeout`. Confirmers run
//! only for stable events; an unstable crossing is a fakeout regardless of
//! volume, body or trend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::bars::Bar;
use super::candle_body::body_dominance;
use super::crossing::{crossing_at, CrossingEvent, Direction};
use super::levels::Level;
use super::pivots::PivotPoint;
use super::stability::is_stable;
use super::swing_trend::confirm_trend;
use super::volume::{volume_tier, VolumeTier};
use crate::config::AnalysisConfig;

/// Final label of one bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    ConfirmedBreakout,
    Fakeout,
    NoSignal,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::ConfirmedBreakout => write!(f, "CONFIRMED"),
            Classification::Fakeout => write!(f, "FAKEOUT"),
            Classification::NoSignal => write!(f, "NONE"),
        }
    }
}

/// Classifier state for one bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    NoSignal,
    Crossed,
    Stable,
    Unstable,
    Confirmed,
    Fakeout,
}

impl std::fmt::Display for SignalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalState::NoSignal => write!(f, "NO_SIGNAL"),
            SignalState::Crossed => write!(f, "CROSSED"),
            SignalState::Stable => write!(f, "STABLE"),
            SignalState::Unstable => write!(f, "UNSTABLE"),
            SignalState::Confirmed => write!(f, "CONFIRMED"),
            SignalState::Fakeout => write!(f, "FAKEOUT"),
        }
    }
}

/// Every confirmer outcome for one crossing event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub stability: bool,
    pub volume_tier: VolumeTier,
    pub body_dominant: bool,
    pub trend_supported: bool,
    pub stop_loss: Option<f64>,
}

impl ConfirmationResult {
    /// Result of an event that never reached the confirmers
    pub const UNSTABLE: ConfirmationResult = ConfirmationResult {
        stability: false,
        volume_tier: VolumeTier::None,
        body_dominant: false,
        trend_supported: false,
        stop_loss: None,
    };

    pub fn is_confirmed(&self) -> bool {
        self.stability
            && self.volume_tier >= VolumeTier::Moderate
            && self.body_dominant
            && self.trend_supported
    }
}

/// A classified crossing bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub direction: Direction,
    pub classification: Classification,
    pub confirmation: ConfirmationResult,
    /// Set on confirmed breakouts with a prior opposite pivot
    pub stop_loss: Option<f64>,
    /// Measured-move target of a confirmed breakout
    pub take_profit_anchor: Option<f64>,
}

/// Which bars a caller wants signals for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalQuery {
    /// Only the last bar of the series
    LatestBar,
    /// The trailing `N` bars
    WithinLast(usize),
}

impl SignalQuery {
    /// Signals of `signals` (from a series of `bar_count` bars) matching the query
    pub fn select(&self, signals: &[Signal], bar_count: usize) -> Vec<Signal> {
        let first = match *self {
            SignalQuery::LatestBar => bar_count.saturating_sub(1),
            SignalQuery::WithinLast(0) => return Vec::new(),
            SignalQuery::WithinLast(n) => bar_count.saturating_sub(n),
        };
        signals
            .iter()
            .filter(|s| s.bar_index >= first && s.bar_index < bar_count)
            .copied()
            .collect()
    }
}

/// Runs the state machine over crossing events of one series
pub struct Classifier<'a> {
    bars: &'a [Bar],
    pivots: &'a [PivotPoint],
    config: &'a AnalysisConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(bars: &'a [Bar], pivots: &'a [PivotPoint], config: &'a AnalysisConfig) -> Self {
        Self { bars, pivots, config }
    }

    /// Evaluate one crossing event to its final classification
    pub fn evaluate(&self, event: &CrossingEvent) -> (ConfirmationResult, Classification) {
        let i = event.bar_index;
        let level = event.level.price;
        let mut result = ConfirmationResult::UNSTABLE;
        let mut state = SignalState::Crossed;

        let classification = loop {
            trace!("bar {} level {:.2}: {}", i, level, state);
            state = match state {
                SignalState::Crossed => {
                    result.stability =
                        is_stable(self.bars, i, level, self.config.check_periods, self.config.crossing_mode);
                    if result.stability {
                        SignalState::Stable
                    } else {
                        SignalState::Unstable
                    }
                }
                SignalState::Unstable => SignalState::Fakeout,
                SignalState::Stable => {
                    self.run_confirmers(event, &mut result);
                    if result.is_confirmed() {
                        SignalState::Confirmed
                    } else {
                        SignalState::Fakeout
                    }
                }
                SignalState::Confirmed => break Classification::ConfirmedBreakout,
                SignalState::Fakeout => break Classification::Fakeout,
                SignalState::NoSignal => break Classification::NoSignal,
            };
        };

        debug!(
            "bar {} {} {:.2}: {} (stable={}, volume={}, body={}, trend={})",
            i,
            event.direction,
            level,
            classification,
            result.stability,
            result.volume_tier,
            result.body_dominant,
            result.trend_supported
        );
        (result, classification)
    }

    fn run_confirmers(&self, event: &CrossingEvent, result: &mut ConfirmationResult) {
        let i = event.bar_index;
        let bar = &self.bars[i];
        let config = self.config;

        result.volume_tier = volume_tier(
            self.bars,
            i,
            config.lookback_volume,
            config.volume_moderate_multiple,
            config.volume_strong_multiple,
        );

        result.body_dominant =
            match body_dominance(bar, i, event.level.price, event.direction, config.body_threshold) {
                Ok(dominant) => dominant,
                Err(e) => {
                    debug!("{}", e);
                    false
                }
            };

        let trend = confirm_trend(self.pivots, i, event.direction);
        result.trend_supported = trend.supported;
        result.stop_loss = trend.stop_loss;
    }

    /// Measured move: the level plus (or minus) the price range of the
    /// stability window before the crossing
    pub fn take_profit_anchor(&self, event: &CrossingEvent) -> Option<f64> {
        let end = event.bar_index.min(self.bars.len());
        let window = &self.bars[end.saturating_sub(self.config.check_periods)..end];
        if window.is_empty() {
            return None;
        }

        let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let range = high - low;

        Some(match event.direction {
            Direction::Upward => event.level.price + range,
            Direction::Downward => event.level.price - range,
        })
    }

    /// Build the signal for an evaluated event, `None` for `NoSignal`
    pub fn signal(
        &self,
        event: &CrossingEvent,
        confirmation: ConfirmationResult,
        classification: Classification,
    ) -> Option<Signal> {
        let bar = self.bars.get(event.bar_index)?;
        let confirmed = match classification {
            Classification::NoSignal => return None,
            Classification::ConfirmedBreakout => true,
            Classification::Fakeout => false,
        };

        Some(Signal {
            bar_index: event.bar_index,
            timestamp: bar.timestamp,
            level: event.level,
            direction: event.direction,
            classification,
            confirmation,
            stop_loss: if confirmed { confirmation.stop_loss } else { None },
            take_profit_anchor: if confirmed { self.take_profit_anchor(event) } else { None },
        })
    }

    /// Classify bar `i` against `levels`, from crossing detection onwards
    pub fn classify_bar(&self, i: usize, levels: &[Level]) -> Classification {
        match crossing_at(self.bars, i, levels, self.config.crossing_mode) {
            Some(event) if i > 0 => self.evaluate(&event).1,
            _ => Classification::NoSignal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_core::bars::test_support::{bar, drift_bar};
    use crate::signal_core::levels::LevelKind;
    use crate::signal_core::pivots::PivotKind;

    fn event(bar_index: usize, price: f64, direction: Direction) -> CrossingEvent {
        CrossingEvent {
            bar_index,
            level: Level::new(price).with_kind(direction.level_kind()),
            direction,
            is_overnight_gap: false,
        }
    }

    /// 20 quiet bars under 100, then a strong bullish crossing at bar 20
    fn approach(volume: f64) -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..20).map(|i| drift_bar(i, 97.0 + 0.1 * i as f64, 1000.0)).collect();
        bars.push(bar(20, 99.5, 103.2, 99.4, 103.0, volume));
        bars
    }

    fn rising_swings() -> Vec<PivotPoint> {
        vec![
            PivotPoint { bar_index: 4, price: 97.6, kind: PivotKind::High },
            PivotPoint { bar_index: 8, price: 97.2, kind: PivotKind::Low },
            PivotPoint { bar_index: 14, price: 98.6, kind: PivotKind::High },
        ]
    }

    #[test]
    fn test_confirmed_breakout() {
        let bars = approach(3000.0);
        let pivots = rising_swings();
        let config = AnalysisConfig::default();
        let classifier = Classifier::new(&bars, &pivots, &config);

        let e = event(20, 100.0, Direction::Upward);
        let (result, classification) = classifier.evaluate(&e);
        assert_eq!(classification, Classification::ConfirmedBreakout);
        assert_eq!(result.volume_tier, VolumeTier::Strong);
        assert_eq!(result.stop_loss, Some(97.2));

        let signal = classifier.signal(&e, result, classification).unwrap();
        assert_eq!(signal.level.kind, LevelKind::Resistance);
        assert_eq!(signal.stop_loss, Some(97.2));
        // Window range: 98.9 + 0.2 - (97.0 - 0.3)
        assert!((signal.take_profit_anchor.unwrap() - 102.4).abs() < 1e-9);
    }

    #[test]
    fn test_low_volume_is_fakeout() {
        let bars = approach(1100.0);
        let pivots = rising_swings();
        let config = AnalysisConfig::default();
        let classifier = Classifier::new(&bars, &pivots, &config);

        let e = event(20, 100.0, Direction::Upward);
        let (result, classification) = classifier.evaluate(&e);
        assert_eq!(classification, Classification::Fakeout);
        assert!(result.stability);
        assert_eq!(result.volume_tier, VolumeTier::None);

        let signal = classifier.signal(&e, result, classification).unwrap();
        assert_eq!(signal.stop_loss, None);
        assert_eq!(signal.take_profit_anchor, None);
    }

    #[test]
    fn test_unstable_skips_confirmers() {
        let mut bars = approach(3000.0);
        bars[10] = bar(10, 98.0, 100.5, 97.9, 98.1, 1000.0);
        let pivots = rising_swings();
        let config = AnalysisConfig::default();
        let classifier = Classifier::new(&bars, &pivots, &config);

        let (result, classification) = classifier.evaluate(&event(20, 100.0, Direction::Upward));
        assert_eq!(classification, Classification::Fakeout);
        assert_eq!(result, ConfirmationResult::UNSTABLE);
    }

    #[test]
    fn test_doji_crossing_is_not_dominant() {
        let mut bars = approach(3000.0);
        bars[20] = bar(20, 100.0, 101.0, 99.0, 100.0, 3000.0);
        let pivots = rising_swings();
        let config = AnalysisConfig {
            crossing_mode: crate::config::CrossingMode::OpenClose,
            ..Default::default()
        };
        let classifier = Classifier::new(&bars, &pivots, &config);

        let (result, classification) = classifier.evaluate(&event(20, 100.0, Direction::Upward));
        assert!(!result.body_dominant);
        assert_eq!(classification, Classification::Fakeout);
    }

    #[test]
    fn test_classify_bar_without_crossing() {
        let bars = approach(3000.0);
        let config = AnalysisConfig::default();
        let classifier = Classifier::new(&bars, &[], &config);
        let levels = [Level::new(100.0)];

        assert_eq!(classifier.classify_bar(5, &levels), Classification::NoSignal);
        assert_eq!(classifier.classify_bar(0, &levels), Classification::NoSignal);
        // No pivots: crossing without trend support
        assert_eq!(classifier.classify_bar(20, &levels), Classification::Fakeout);
    }

    #[test]
    fn test_signal_query() {
        let bars = approach(3000.0);
        let pivots = rising_swings();
        let config = AnalysisConfig::default();
        let classifier = Classifier::new(&bars, &pivots, &config);
        let signals: Vec<Signal> = [15, 18, 20]
            .iter()
            .filter_map(|&i| {
                let e = event(i, 100.0, Direction::Upward);
                classifier.signal(&e, ConfirmationResult::UNSTABLE, Classification::Fakeout)
            })
            .collect();

        let latest = SignalQuery::LatestBar.select(&signals, bars.len());
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].bar_index, 20);

        let recent = SignalQuery::WithinLast(5).select(&signals, bars.len());
        assert_eq!(recent.iter().map(|s| s.bar_index).collect::<Vec<_>>(), vec![18, 20]);
        assert!(SignalQuery::WithinLast(0).select(&signals, bars.len()).is_empty());
        assert_eq!(SignalQuery::WithinLast(100).select(&signals, bars.len()).len(), 3);
    }
}
