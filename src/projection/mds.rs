use ndarray::{Array2, Axis};

use super::eigen::top_eigenpairs;

/// Classical (Torgerson) multidimensional scaling: double-centre the
/// squared distance matrix and embed with its top eigenvectors.
///
/// Only Euclidean distances guarantee a positive semidefinite centred
/// matrix; pass `euclidean = false` for anything else.
pub fn fit(distances: &Array2<f64>, dims: usize, euclidean: bool, seed: u64) -> Array2<f64> {
    let n = distances.nrows();
    let squared = distances.mapv(|d| d * d);

    let row_means = squared.mean_axis(Axis(1)).unwrap_or_default();
    let grand_mean = row_means.mean().unwrap_or(0.0);

    let mut b = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            b[[i, j]] = -0.5 * (squared[[i, j]] - row_means[i] - row_means[j] + grand_mean);
        }
    }

    let mut coords = Array2::<f64>::zeros((n, dims));
    for (k, (lambda, v)) in top_eigenpairs(&b, dims, seed, euclidean).into_iter().enumerate() {
        coords.column_mut(k).assign(&(v * lambda.max(0.0).sqrt()));
    }
    coords
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::similarity::{pairwise, DistanceMetric};

    #[test]
    fn recovers_planar_distances() {
        let x = array![[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 4.0, 0.0]];
        let coords = fit(&pairwise(x.view(), DistanceMetric::Euclidean), 2, true, 0);
        let dist = |i: usize, j: usize| {
            ((coords[[i, 0]] - coords[[j, 0]]).powi(2) + (coords[[i, 1]] - coords[[j, 1]]).powi(2))
                .sqrt()
        };
        assert!((dist(0, 1) - 3.0).abs() < 1e-6);
        assert!((dist(0, 2) - 4.0).abs() < 1e-6);
        assert!((dist(1, 2) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn works_with_non_euclidean_metrics() {
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 0.5]];
        let coords = fit(&pairwise(x.view(), DistanceMetric::Cosine), 2, false, 0);
        assert_eq!(coords.dim(), (4, 2));
        assert!(coords.iter().all(|v| v.is_finite()));
    }
}
