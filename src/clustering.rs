//! K-means over projected coordinates, used for cluster colouring and for
//! picking a spread-out subset of points to label.

use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ClusterError;

/// Configuration for k-means clustering.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Maximum number of Lloyd iterations.
    pub max_iterations: usize,
    /// Stop once no center moves further than this.
    pub convergence_threshold: f64,
    /// Seed for k-means++ initialization.
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            convergence_threshold: 1e-6,
            seed: 0,
        }
    }
}

/// Result of [`KMeans::fit`].
#[derive(Debug, Clone)]
pub struct Clustering {
    /// Cluster index for every input point.
    pub assignments: Vec<usize>,
    /// One row per cluster.
    pub centers: Array2<f64>,
    pub iterations: usize,
}

impl Clustering {
    pub fn k(&self) -> usize {
        self.centers.nrows()
    }
}

/// K-means clustering with k-means++ initialization.
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    #[must_use]
    pub const fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    /// Cluster the rows of `points` into `k` groups.
    pub fn fit(&self, points: ArrayView2<'_, f64>, k: usize) -> Result<Clustering, ClusterError> {
        let n = points.nrows();
        if k == 0 || k > n {
            return Err(ClusterError::InvalidClusterCount { k, n });
        }

        let mut centers = self.init_plusplus(points, k);
        let mut assignments = vec![0usize; n];
        let mut iterations = 0;

        for _ in 0..self.config.max_iterations {
            iterations += 1;
            for (i, point) in points.rows().into_iter().enumerate() {
                assignments[i] = nearest(point, centers.view());
            }

            let updated = update_centers(points, &assignments, &centers);
            let max_movement = centers
                .rows()
                .into_iter()
                .zip(updated.rows())
                .map(|(old, new)| squared_distance(old, new).sqrt())
                .fold(0.0f64, f64::max);
            centers = updated;

            if max_movement < self.config.convergence_threshold {
                break;
            }
        }

        for (i, point) in points.rows().into_iter().enumerate() {
            assignments[i] = nearest(point, centers.view());
        }

        Ok(Clustering {
            assignments,
            centers,
            iterations,
        })
    }

    /// K-means++: each further center is drawn with probability
    /// proportional to its squared distance from the nearest chosen one.
    fn init_plusplus(&self, points: ArrayView2<'_, f64>, k: usize) -> Array2<f64> {
        let n = points.nrows();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut chosen = Vec::with_capacity(k);
        chosen.push(rng.gen_range(0..n));

        let mut dist = vec![f64::INFINITY; n];
        while chosen.len() < k {
            let last = points.row(chosen[chosen.len() - 1]);
            for (i, point) in points.rows().into_iter().enumerate() {
                dist[i] = dist[i].min(squared_distance(point, last));
            }

            let total: f64 = dist.iter().sum();
            let next = if total > 0.0 {
                let threshold = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                dist.iter()
                    .position(|&d| {
                        cumulative += d;
                        cumulative >= threshold && d > 0.0
                    })
                    .unwrap_or(n - 1)
            } else {
                // Every point coincides with a center; take the first unused.
                (0..n).find(|i| !chosen.contains(i)).unwrap_or(0)
            };
            chosen.push(next);
        }

        points.select(ndarray::Axis(0), &chosen)
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the row of `centers` closest to `point`.
pub fn nearest(point: ArrayView1<'_, f64>, centers: ArrayView2<'_, f64>) -> usize {
    centers
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0, |(i, _)| i)
}

/// Mean of each cluster; a cluster that lost all its points keeps its
/// previous center.
fn update_centers(
    points: ArrayView2<'_, f64>,
    assignments: &[usize],
    previous: &Array2<f64>,
) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(previous.raw_dim());
    let mut counts = vec![0usize; previous.nrows()];

    for (point, &cluster) in points.rows().into_iter().zip(assignments) {
        counts[cluster] += 1;
        let mut row = sums.row_mut(cluster);
        row += &point;
    }

    for (cluster, &count) in counts.iter().enumerate() {
        if count == 0 {
            sums.row_mut(cluster).assign(&previous.row(cluster));
        } else {
            sums.row_mut(cluster).mapv_inplace(|s| s / count as f64);
        }
    }
    sums
}

/// Pick up to `n` points spread across the plot: the point nearest each
/// k-means center. Returns every index when `n` covers all points.
pub fn select_sparse_labels(points: ArrayView2<'_, f64>, n: usize, seed: u64) -> Vec<usize> {
    let len = points.nrows();
    if n >= len {
        return (0..len).collect();
    }
    if n == 0 {
        return Vec::new();
    }

    let config = KMeansConfig {
        seed,
        ..KMeansConfig::default()
    };
    let Ok(clustering) = KMeans::new(config).fit(points, n) else {
        return Vec::new();
    };

    let mut indices: Vec<usize> = Vec::with_capacity(n);
    for center in clustering.centers.rows() {
        let idx = nearest(center, points);
        if !indices.contains(&idx) {
            indices.push(idx);
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ]
    }

    #[test]
    fn separates_two_blobs() {
        let pts = blobs();
        let c = KMeans::new(KMeansConfig::default()).fit(pts.view(), 2).unwrap();
        assert_eq!(c.k(), 2);
        assert_eq!(c.assignments[0], c.assignments[1]);
        assert_eq!(c.assignments[0], c.assignments[2]);
        assert_eq!(c.assignments[3], c.assignments[5]);
        assert_ne!(c.assignments[0], c.assignments[3]);
    }

    #[test]
    fn same_seed_same_clusters() {
        let pts = blobs();
        let km = KMeans::new(KMeansConfig::default());
        let a = km.fit(pts.view(), 3).unwrap();
        let b = km.fit(pts.view(), 3).unwrap();
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.centers, b.centers);
    }

    #[test]
    fn rejects_bad_cluster_counts() {
        let pts = blobs();
        let km = KMeans::new(KMeansConfig::default());
        assert!(km.fit(pts.view(), 0).is_err());
        assert!(km.fit(pts.view(), 7).is_err());
    }

    #[test]
    fn duplicate_points_still_get_k_centers() {
        let pts = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let c = KMeans::new(KMeansConfig::default()).fit(pts.view(), 2).unwrap();
        assert_eq!(c.k(), 2);
    }

    #[test]
    fn sparse_labels_pick_one_per_blob() {
        let pts = blobs();
        let idx = select_sparse_labels(pts.view(), 2, 0);
        assert_eq!(idx.len(), 2);
        assert!(idx.iter().any(|&i| i < 3));
        assert!(idx.iter().any(|&i| i >= 3));
        assert_eq!(select_sparse_labels(pts.view(), 10, 0), vec![0, 1, 2, 3, 4, 5]);
        assert!(select_sparse_labels(pts.view(), 0, 0).is_empty());
    }
}
