//! One analysis pass per series, and the parallel batch over many symbols

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::signal_core::{
    build_levels, detect_crossings, detect_pivots, hold_status, BarSeries, Classification,
    Classifier, ConfirmationResult, CrossingEvent, HoldStatus, Level, PivotPoint, Signal,
    SignalQuery,
};

/// Full outcome of one pass over a series
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Length of the analyzed series
    pub bar_count: usize,
    pub pivots: Vec<PivotPoint>,
    pub levels: Vec<Level>,
    /// Every crossing event with its confirmer outcomes, in bar order
    pub evaluations: Vec<(CrossingEvent, ConfirmationResult)>,
    /// One signal per crossing event
    pub signals: Vec<Signal>,
}

impl Analysis {
    pub fn select(&self, query: SignalQuery) -> Vec<Signal> {
        query.select(&self.signals, self.bar_count)
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &Signal> {
        self.signals
            .iter()
            .filter(|s| s.classification == Classification::ConfirmedBreakout)
    }

    /// Hold check for every confirmed breakout
    pub fn holds(&self, series: &BarSeries, retest_periods: usize) -> Vec<(Signal, HoldStatus)> {
        self.confirmed()
            .map(|s| {
                let status = hold_status(series.bars(), s.bar_index, s.level.price, s.direction, retest_periods);
                (*s, status)
            })
            .collect()
    }
}

fn check_inputs(series: &BarSeries, config: &AnalysisConfig) -> Result<(), AnalysisError> {
    config.validate()?;
    let required = config.min_bars();
    if series.len() < required {
        return Err(AnalysisError::InsufficientData {
            required,
            available: series.len(),
        });
    }
    Ok(())
}

/// Run the whole pipeline: pivots, levels, crossings, classification
pub fn analyze(series: &BarSeries, config: &AnalysisConfig) -> Result<Analysis, AnalysisError> {
    check_inputs(series, config)?;

    let pivots = detect_pivots(series.bars(), config.pivot_window);
    debug!("{} pivots (window {})", pivots.len(), config.pivot_window);

    let levels = build_levels(&pivots, config)?;
    debug!(
        "{} levels: {:?}",
        levels.len(),
        levels.iter().map(|l| l.price).collect::<Vec<_>>()
    );

    evaluate_levels(series, pivots, &levels, config)
}

/// Run crossing detection and classification against caller-supplied levels,
/// skipping clustering. Levels are sorted and deduplicated first.
pub fn evaluate_levels(
    series: &BarSeries,
    pivots: Vec<PivotPoint>,
    levels: &[Level],
    config: &AnalysisConfig,
) -> Result<Analysis, AnalysisError> {
    check_inputs(series, config)?;

    let mut levels = levels.to_vec();
    levels.sort_by(|a, b| a.price.total_cmp(&b.price));
    levels.dedup_by(|a, b| a.price == b.price);

    let bars = series.bars();
    let classifier = Classifier::new(bars, &pivots, config);
    let events = detect_crossings(bars, &levels, config.crossing_mode);

    let mut evaluations = Vec::with_capacity(events.len());
    let mut signals = Vec::with_capacity(events.len());
    for event in events {
        let (confirmation, classification) = classifier.evaluate(&event);
        signals.extend(classifier.signal(&event, confirmation, classification));
        evaluations.push((event, confirmation));
    }

    let confirmed = signals
        .iter()
        .filter(|s| s.classification == Classification::ConfirmedBreakout)
        .count();
    info!(
        "Analyzed {} bars: {} levels, {} crossings, {} confirmed, {} fakeouts",
        bars.len(),
        levels.len(),
        evaluations.len(),
        confirmed,
        signals.len() - confirmed
    );

    Ok(Analysis {
        bar_count: bars.len(),
        pivots,
        levels,
        evaluations,
        signals,
    })
}

/// Analyze many symbols in parallel. Results keep input order; one symbol's
/// error never affects the others.
pub fn analyze_batch(
    series: &[(String, BarSeries)],
    config: &AnalysisConfig,
) -> Vec<(String, Result<Analysis, AnalysisError>)> {
    series
        .par_iter()
        .map(|(symbol, bars)| {
            let result = analyze(bars, config);
            if let Ok(ref analysis) = result {
                info!(
                    "Processed {}: {} bars, {} levels, {} signals",
                    symbol,
                    analysis.bar_count,
                    analysis.levels.len(),
                    analysis.signals.len()
                );
            }
            (symbol.clone(), result)
        })
        .collect()
}
