use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::similarity::DistanceMetric;

const EARLY_EXAGGERATION: f64 = 12.0;
const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const BINARY_SEARCH_STEPS: usize = 100;
const MIN_GAIN: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct TsneParams {
    pub perplexity: f64,
    pub iterations: usize,
    /// `None` picks `max(n / 12 / 4, 50)`.
    pub learning_rate: Option<f64>,
    pub metric: DistanceMetric,
    pub seed: u64,
}

/// Exact t-SNE over a pairwise distance matrix (O(n²) memory and time per
/// iteration).
///
/// Euclidean distances are squared before computing affinities, other
/// metrics are used as they are.
pub fn fit(distances: &Array2<f64>, dims: usize, params: &TsneParams) -> Array2<f64> {
    let n = distances.nrows();
    let mut distances = distances.clone();
    if params.metric == DistanceMetric::Euclidean {
        distances.mapv_inplace(|d| d * d);
    }

    // Perplexity has to stay below the neighbour count.
    let perplexity = params.perplexity.min((n - 1) as f64 / 3.0).max(1.0);
    let p = joint_probabilities(&distances, perplexity);

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut y = Array2::<f64>::from_shape_fn((n, dims), |_| {
        1e-4 * rng.sample::<f64, _>(StandardNormal)
    });

    let learning_rate = params
        .learning_rate
        .unwrap_or_else(|| (n as f64 / EARLY_EXAGGERATION / 4.0).max(50.0));
    let exaggeration_iters = (params.iterations / 4).min(250);

    let mut update = Array2::<f64>::zeros((n, dims));
    let mut gains = Array2::<f64>::ones((n, dims));
    let mut num = Array2::<f64>::zeros((n, n));

    for iter in 0..params.iterations {
        let (exaggeration, momentum) = if iter < exaggeration_iters {
            (EARLY_EXAGGERATION, 0.5)
        } else {
            (1.0, 0.8)
        };

        // Student-t kernel in the embedding.
        let mut sum_num = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let d2: f64 = (0..dims).map(|k| (y[[i, k]] - y[[j, k]]).powi(2)).sum();
                let q = 1.0 / (1.0 + d2);
                num[[i, j]] = q;
                num[[j, i]] = q;
                sum_num += 2.0 * q;
            }
        }
        let sum_num = sum_num.max(f64::MIN_POSITIVE);

        for i in 0..n {
            for k in 0..dims {
                let mut grad = 0.0;
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let q = (num[[i, j]] / sum_num).max(1e-12);
                    grad += (exaggeration * p[[i, j]] - q) * num[[i, j]] * (y[[i, k]] - y[[j, k]]);
                }
                grad *= 4.0;

                let same_sign = (grad > 0.0) == (update[[i, k]] > 0.0);
                gains[[i, k]] = if same_sign {
                    (gains[[i, k]] * 0.8).max(MIN_GAIN)
                } else {
                    gains[[i, k]] + 0.2
                };
                update[[i, k]] = momentum * update[[i, k]] - learning_rate * gains[[i, k]] * grad;
            }
        }

        y += &update;
        if let Some(mean) = y.mean_axis(Axis(0)) {
            y -= &mean;
        }
    }

    y
}

/// Symmetric joint probabilities `P = (P_cond + P_condᵀ) / 2n`, with each
/// row's Gaussian bandwidth tuned to the target perplexity.
fn joint_probabilities(distances: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n = distances.nrows();
    let target_entropy = perplexity.ln();
    let mut conditional = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        let mut beta = 1.0;
        let (mut lo, mut hi) = (f64::NEG_INFINITY, f64::INFINITY);
        let mut row = vec![0.0; n];

        for _ in 0..BINARY_SEARCH_STEPS {
            let mut sum = 0.0;
            for j in 0..n {
                row[j] = if i == j { 0.0 } else { (-distances[[i, j]] * beta).exp() };
                sum += row[j];
            }
            let sum = sum.max(f64::MIN_POSITIVE);

            let mut entropy = 0.0;
            for j in 0..n {
                row[j] /= sum;
                if row[j] > 1e-300 {
                    entropy -= row[j] * row[j].ln();
                }
            }

            let diff = entropy - target_entropy;
            if diff.abs() < PERPLEXITY_TOLERANCE {
                break;
            }
            if diff > 0.0 {
                lo = beta;
                beta = if hi.is_infinite() { beta * 2.0 } else { (beta + hi) / 2.0 };
            } else {
                hi = beta;
                beta = if lo.is_infinite() { beta / 2.0 } else { (beta + lo) / 2.0 };
            }
        }

        for j in 0..n {
            conditional[[i, j]] = row[j];
        }
    }

    let mut joint = &conditional + &conditional.t();
    joint.mapv_inplace(|v| (v / (2.0 * n as f64)).max(1e-12));
    joint.diag_mut().fill(0.0);
    joint
}
