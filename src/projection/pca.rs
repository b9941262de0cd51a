use ndarray::{Array2, Axis};

use super::eigen::top_eigenpairs;

/// Principal component scores of the rows of `x` and the fraction of total
/// variance each component explains.
///
/// With fewer rows than columns the `n × n` Gram matrix is decomposed
/// instead of the `d × d` covariance; both give the same scores up to sign.
pub fn fit(x: &Array2<f64>, dims: usize, seed: u64) -> (Array2<f64>, Vec<f64>) {
    let (n, d) = x.dim();
    let Some(mean) = x.mean_axis(Axis(0)) else {
        return (Array2::zeros((0, dims)), vec![0.0; dims]);
    };
    let centered = x - &mean;
    let denom = (n.max(2) - 1) as f64;
    let total_variance = centered.iter().map(|v| v * v).sum::<f64>() / denom;

    let mut coords = Array2::<f64>::zeros((n, dims));
    let mut variances = Vec::with_capacity(dims);

    if n <= d {
        let gram = centered.dot(&centered.t());
        for (k, (lambda, u)) in top_eigenpairs(&gram, dims, seed, true)
            .into_iter()
            .enumerate()
        {
            let lambda = lambda.max(0.0);
            coords.column_mut(k).assign(&(u * lambda.sqrt()));
            variances.push(lambda / denom);
        }
    } else {
        let cov = centered.t().dot(&centered) / denom;
        for (k, (lambda, v)) in top_eigenpairs(&cov, dims, seed, true)
            .into_iter()
            .enumerate()
        {
            coords.column_mut(k).assign(&centered.dot(&v));
            variances.push(lambda.max(0.0));
        }
    }
    variances.resize(dims, 0.0);

    let ratios = variances
        .iter()
        .map(|v| if total_variance > 0.0 { v / total_variance } else { 0.0 })
        .collect();
    (coords, ratios)
}
