//! Seeded one-dimensional k-means and silhouette scoring
//!
//! Used by the level builder to cluster pivot prices. All randomness comes
//! from the caller's `StdRng`, so a fixed seed reproduces
//! the same centroids.

use rand::rngs::StdRng;
use rand::Rng;

/// Outcome of one clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// One centroid per cluster
    pub centroids: Vec<f64>,
    /// Cluster index for each input point
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
}

impl Clustering {
    pub fn member_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.centroids.len()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

/// Best-of-`restarts` k-means on a 1-D sample.
///
/// An empty sample or `k == 0` yields an empty clustering. When the sample
/// has fewer distinct values than `k`, initialization stops early and fewer
/// centroids are returned.
pub fn kmeans(
    points: &[f64],
    k: usize,
    restarts: usize,
    max_iterations: usize,
    rng: &mut StdRng,
) -> Clustering {
    if points.is_empty() || k == 0 {
        return Clustering {
            centroids: Vec::new(),
            labels: Vec::new(),
            inertia: 0.0,
        };
    }

    let mut best: Option<Clustering> = None;

    for _ in 0..restarts.max(1) {
        let run = lloyd(points, init_plus_plus(points, k, rng), max_iterations);
        let better = match &best {
            Some(current) => run.inertia < current.inertia,
            None => true,
        };
        if better {
            best = Some(run);
        }
    }

    // restarts.max(1) guarantees at least one run
    best.unwrap_or_else(|| lloyd(points, vec![points[0]], max_iterations))
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the chosen ones
fn init_plus_plus(points: &[f64], k: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut distances: Vec<f64> = points.iter().map(|p| (p - centroids[0]).powi(2)).collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();
        if total <= 0.0 {
            break;
        }

        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = points.len() - 1;
        for (i, d) in distances.iter().enumerate() {
            cumulative += d;
            if cumulative > target {
                chosen = i;
                break;
            }
        }

        let centroid = points[chosen];
        centroids.push(centroid);
        for (d, p) in distances.iter_mut().zip(points) {
            *d = d.min((p - centroid).powi(2));
        }
    }

    centroids
}

fn nearest(centroids: &[f64], point: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = (point - c).abs();
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

fn lloyd(points: &[f64], mut centroids: Vec<f64>, max_iterations: usize) -> Clustering {
    let mut labels: Vec<usize> = points.iter().map(|&p| nearest(&centroids, p)).collect();

    for _ in 0..max_iterations {
        let mut sums = vec![0.0; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (&p, &label) in points.iter().zip(&labels) {
            sums[label] += p;
            counts[label] += 1;
        }
        // Empty clusters keep their previous centroid
        for (c, (sum, count)) in centroids.iter_mut().zip(sums.iter().zip(&counts)) {
            if *count > 0 {
                *c = sum / *count as f64;
            }
        }

        let next: Vec<usize> = points.iter().map(|&p| nearest(&centroids, p)).collect();
        if next == labels {
            break;
        }
        labels = next;
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &l)| (p - centroids[l]).powi(2))
        .sum();

    Clustering {
        centroids,
        labels,
        inertia,
    }
}

/// Mean silhouette coefficient of a labelling.
///
/// Returns `None` when fewer than two clusters are populated. Singleton
/// clusters contribute 0.
pub fn silhouette_score(points: &[f64], labels: &[usize]) -> Option<f64> {
    let cluster_count = labels.iter().copied().max()? + 1;
    let mut sizes = vec![0usize; cluster_count];
    for &l in labels {
        sizes[l] += 1;
    }
    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return None;
    }

    let mut total = 0.0;
    for (i, &p) in points.iter().enumerate() {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }

        let mut distance_sums = vec![0.0; cluster_count];
        for (j, &q) in points.iter().enumerate() {
            if i != j {
                distance_sums[labels[j]] += (p - q).abs();
            }
        }

        let a = distance_sums[own] / (sizes[own] - 1) as f64;
        let b = (0..cluster_count)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| distance_sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let scale = a.max(b);
        if scale > 0.0 {
            total += (b - a) / scale;
        }
    }

    Some(total / points.len() as f64)
}
