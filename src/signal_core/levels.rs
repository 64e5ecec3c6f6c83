//! Support/resistance levels built by clustering pivot prices

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::kmeans::{kmeans, silhouette_score, Clustering};
use super::pivots::PivotPoint;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Role a level plays for the bar that crosses it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelKind {
    Support,
    Resistance,
    /// Not yet crossed; every built level starts here
    Unclassified,
}

impl std::fmt::Display for LevelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelKind::Support => write!(f, "S"),
            LevelKind::Resistance => write!(f, "R"),
            LevelKind::Unclassified => write!(f, "-"),
        }
    }
}

/// A clustered price level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub kind: LevelKind,
    /// Pivots assigned to this level's cluster
    pub member_count: usize,
}

impl Level {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            kind: LevelKind::Unclassified,
            member_count: 0,
        }
    }

    pub fn with_kind(self, kind: LevelKind) -> Self {
        Self { kind, ..self }
    }
}

/// Minimum pivot count for a silhouette search (two clusters, one of them
/// holding at least two points)
const MIN_PIVOTS_FOR_SILHOUETTE: usize = 3;

/// Cluster pivot prices into a sorted, tick-rounded level set.
///
/// The cluster count is `config.cluster_count`, or the silhouette-optimal
/// count in `[2, config.max_clusters]` when `config.dynamic_cluster` is set.
/// Clustering is seeded from `config.cluster_seed`. An invalid config is
/// rejected before any clustering.
pub fn build_levels(
    pivots: &[PivotPoint],
    config: &AnalysisConfig,
) -> Result<Vec<Level>, AnalysisError> {
    config.validate()?;
    let prices: Vec<f64> = pivots.iter().map(|p| p.price).collect();
    let mut rng = StdRng::seed_from_u64(config.cluster_seed);

    let clustering = if config.dynamic_cluster {
        select_clustering(&prices, config, &mut rng)?
    } else {
        if prices.is_empty() || prices.len() < config.cluster_count {
            return Err(AnalysisError::InsufficientPivots {
                required: config.cluster_count,
                found: prices.len(),
            });
        }
        kmeans(
            &prices,
            config.cluster_count,
            config.cluster_restarts,
            config.cluster_max_iterations,
            &mut rng,
        )
    };

    Ok(round_levels(&clustering, config.tick_size))
}

/// Silhouette search over `k in [2, min(max_clusters, n - 1)]`; ties keep the
/// smaller `k`
fn select_clustering(
    prices: &[f64],
    config: &AnalysisConfig,
    rng: &mut StdRng,
) -> Result<Clustering, AnalysisError> {
    if prices.len() < MIN_PIVOTS_FOR_SILHOUETTE {
        return Err(AnalysisError::InsufficientPivots {
            required: MIN_PIVOTS_FOR_SILHOUETTE,
            found: prices.len(),
        });
    }

    let max_k = config.max_clusters.min(prices.len() - 1);
    let mut best: Option<(f64, Clustering)> = None;

    for k in 2..=max_k {
        let clustering = kmeans(
            prices,
            k,
            config.cluster_restarts,
            config.cluster_max_iterations,
            rng,
        );
        let Some(score) = silhouette_score(prices, &clustering.labels) else {
            continue;
        };
        debug!("k={} silhouette={:.4}", k, score);

        let better = match &best {
            Some((best_score, _)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((score, clustering));
        }
    }

    match best {
        Some((score, clustering)) => {
            debug!(
                "Selected {} clusters (silhouette {:.4})",
                clustering.centroids.len(),
                score
            );
            Ok(clustering)
        }
        // Every k collapsed to a single populated cluster: all pivots share one price
        None => Ok(kmeans(
            prices,
            1,
            1,
            config.cluster_max_iterations,
            rng,
        )),
    }
}

/// Round centroids to the tick grid, merge centroids landing on the same
/// tick and sort ascending. Unpopulated centroids are dropped.
fn round_levels(clustering: &Clustering, tick_size: f64) -> Vec<Level> {
    let counts = clustering.member_counts();

    let mut ticks: Vec<(i64, usize)> = clustering
        .centroids
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(c, count)| ((c / tick_size).round() as i64, count))
        .collect();
    ticks.sort_by_key(|(tick, _)| *tick);

    let mut levels: Vec<Level> = Vec::with_capacity(ticks.len());
    let mut last_tick = None;
    for (tick, count) in ticks {
        if last_tick == Some(tick) {
            if let Some(level) = levels.last_mut() {
                level.member_count += count;
            }
            continue;
        }
        last_tick = Some(tick);
        levels.push(Level {
            price: tick as f64 * tick_size,
            kind: LevelKind::Unclassified,
            member_count: count,
        });
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_core::pivots::PivotKind;
    use rand::Rng;

    fn pivot_prices(prices: &[f64]) -> Vec<PivotPoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PivotPoint {
                bar_index: i,
                price,
                kind: if i % 2 == 0 { PivotKind::High } else { PivotKind::Low },
            })
            .collect()
    }

    #[test]
    fn test_fixed_cluster_count() {
        let pivots = pivot_prices(&[20.1, 19.9, 20.0, 30.2, 29.8, 30.0, 40.0, 40.1]);
        let config = AnalysisConfig {
            cluster_count: 3,
            ..Default::default()
        };
        let levels = build_levels(&pivots, &config).unwrap();

        assert_eq!(levels.len(), 3);
        assert!((levels[0].price - 20.0).abs() < 1e-9);
        assert!((levels[1].price - 30.0).abs() < 1e-9);
        assert!((levels[2].price - 40.05).abs() < 1e-9);
        assert_eq!(levels.iter().map(|l| l.member_count).sum::<usize>(), 8);
        assert!(levels.iter().all(|l| l.kind == LevelKind::Unclassified));
    }

    #[test]
    fn test_insufficient_pivots() {
        let pivots = pivot_prices(&[10.0, 11.0]);
        let config = AnalysisConfig {
            cluster_count: 5,
            ..Default::default()
        };
        assert_eq!(
            build_levels(&pivots, &config),
            Err(AnalysisError::InsufficientPivots { required: 5, found: 2 })
        );

        let dynamic = AnalysisConfig {
            dynamic_cluster: true,
            ..Default::default()
        };
        assert!(matches!(
            build_levels(&pivots, &dynamic),
            Err(AnalysisError::InsufficientPivots { found: 2, .. })
        ));
        assert!(matches!(
            build_levels(&[], &config),
            Err(AnalysisError::InsufficientPivots { found: 0, .. })
        ));
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let config = AnalysisConfig {
            cluster_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            build_levels(&[], &config),
            Err(AnalysisError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            build_levels(&pivot_prices(&[10.0, 11.0, 12.0]), &config),
            Err(AnalysisError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_dynamic_cluster_finds_groups() {
        let pivots = pivot_prices(&[
            10.0, 10.1, 9.9, 10.05, 25.0, 25.2, 24.9, 25.1, 60.0, 60.3, 59.8, 60.1,
        ]);
        let config = AnalysisConfig {
            dynamic_cluster: true,
            max_clusters: 6,
            ..Default::default()
        };
        let levels = build_levels(&pivots, &config).unwrap();

        assert_eq!(levels.len(), 3);
        assert!((levels[0].price - 10.01).abs() < 1e-9);
        assert!((levels[1].price - 25.05).abs() < 1e-9);
        assert!((levels[2].price - 60.05).abs() < 1e-9);
    }

    #[test]
    fn test_rounding_merges_levels() {
        let clustering = Clustering {
            centroids: vec![100.24, 100.26, 99.0],
            labels: vec![0, 1, 1, 2],
            inertia: 0.0,
        };
        let levels = round_levels(&clustering, 0.5);
        let prices: Vec<f64> = levels.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![99.0, 100.0, 100.5]);
        assert_eq!(levels[2].member_count, 2);

        let levels = round_levels(&clustering, 1.0);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price, 99.0);
        assert_eq!(levels[0].member_count, 1);
        assert_eq!(levels[1].price, 100.0);
        assert_eq!(levels[1].member_count, 3);
    }

    #[test]
    fn test_levels_sorted_and_unique() {
        let mut rng = StdRng::seed_from_u64(11);
        for seed in 0..10u64 {
            let prices: Vec<f64> = (0..60).map(|_| rng.gen_range(50.0..150.0)).collect();
            let config = AnalysisConfig {
                cluster_seed: seed,
                cluster_count: 8,
                tick_size: 0.5,
                ..Default::default()
            };
            let levels = build_levels(&pivot_prices(&prices), &config).unwrap();

            assert!(levels.windows(2).all(|w| w[0].price < w[1].price));
            assert!(levels
                .iter()
                .all(|l| ((l.price / 0.5) - (l.price / 0.5).round()).abs() < 1e-9));
        }
    }

    #[test]
    fn test_seed_makes_levels_reproducible() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + ((i * 13) % 17) as f64).collect();
        let config = AnalysisConfig {
            dynamic_cluster: true,
            ..Default::default()
        };
        let a = build_levels(&pivot_prices(&prices), &config).unwrap();
        let b = build_levels(&pivot_prices(&prices), &config).unwrap();
        assert_eq!(a, b);
    }
}
