//! OHLCV bars and the validated series the pipeline runs on

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// One OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Absolute size of the candle body
    pub fn body_size(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Low and high of the candle body
    pub fn body_range(&self) -> (f64, f64) {
        (self.open.min(self.close), self.open.max(self.close))
    }

    fn check(&self, index: usize) -> Result<(), AnalysisError> {
        let malformed = |reason: &str| AnalysisError::MalformedBar {
            index,
            reason: reason.to_string(),
        };

        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(malformed("non-finite price"));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(malformed("volume must be finite and non-negative"));
        }

        let (body_low, body_high) = self.body_range();
        if self.low > body_low || self.high < body_high {
            return Err(malformed("open/close outside the high-low range"));
        }
        Ok(())
    }
}

/// Ordered, validated bars for one instrument.
///
/// Timestamps are strictly increasing. The series is immutable; appending
/// bars means building a new series and rerunning the whole pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, AnalysisError> {
        for (index, bar) in bars.iter().enumerate() {
            bar.check(index)?;
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(AnalysisError::UnorderedBars { index });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}

/// Bar builders shared by the unit tests of every stage
#[cfg(test)]
pub(crate) mod test_support {
    use super::{Bar, BarSeries};
    use chrono::{Duration, TimeZone, Utc};

    /// A daily bar `index` days after 2024-01-01
    pub fn bar(index: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Bar {
            timestamp: start + Duration::days(index as i64),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Small bullish candle around `close`: open 0.1 below, high 0.2 above,
    /// low 0.2 under the open
    pub fn drift_bar(index: usize, close: f64, volume: f64) -> Bar {
        bar(index, close - 0.1, close + 0.2, close - 0.3, close, volume)
    }

    pub fn series_from_closes(closes: &[f64], volume: f64) -> BarSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| drift_bar(i, c, volume))
            .collect();
        BarSeries::new(bars).unwrap()
    }
}
