//! Levels close to a reference price

use serde::{Deserialize, Serialize};

use super::bars::Bar;
use super::levels::{Level, LevelKind};

/// A level within the proximity threshold of a price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearLevel {
    /// Level relabeled Support (price at or above it) or Resistance (price below)
    pub level: Level,
    /// `|price - level| / level`
    pub distance_pct: f64,
}

/// Levels within `threshold` relative distance of `price`, nearest first.
/// Levels above `max_price` are ignored when it is set.
pub fn levels_near_price(
    levels: &[Level],
    price: f64,
    threshold: f64,
    max_price: Option<f64>,
) -> Vec<NearLevel> {
    let mut near: Vec<NearLevel> = levels
        .iter()
        .filter(|l| l.price > 0.0)
        .filter(|l| max_price.map_or(true, |max| l.price <= max))
        .filter_map(|l| {
            let distance_pct = (price - l.price).abs() / l.price;
            if distance_pct > threshold {
                return None;
            }
            let kind = if price >= l.price {
                LevelKind::Support
            } else {
                LevelKind::Resistance
            };
            Some(NearLevel {
                level: l.with_kind(kind),
                distance_pct,
            })
        })
        .collect();

    near.sort_by(|a, b| a.distance_pct.total_cmp(&b.distance_pct));
    near
}

/// Levels the closes of the last `sessions` bars have traded on both sides
/// of, in level order. A level is relabeled Support when the last close is
/// above it and Resistance otherwise. Levels above `max_price` are ignored
/// when it is set.
pub fn recent_level_breaks(
    bars: &[Bar],
    levels: &[Level],
    sessions: usize,
    max_price: Option<f64>,
) -> Vec<Level> {
    let recent = &bars[bars.len().saturating_sub(sessions)..];
    let Some(last) = recent.last() else {
        return Vec::new();
    };

    levels
        .iter()
        .filter(|l| max_price.map_or(true, |max| l.price <= max))
        .filter(|l| {
            recent.iter().any(|b| b.close > l.price) && recent.iter().any(|b| b.close < l.price)
        })
        .map(|l| {
            let kind = if last.close > l.price {
                LevelKind::Support
            } else {
                LevelKind::Resistance
            };
            l.with_kind(kind)
        })
        .collect()
}
