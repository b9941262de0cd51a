use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_ITERATIONS: usize = 10_000;
const TOLERANCE: f64 = 1e-13;

/// The `k` algebraically largest eigenpairs of a symmetric matrix, largest
/// first, by power iteration with deflation.
///
/// Unless `positive_semidefinite`, the matrix is shifted by its Gershgorin
/// bound so every eigenvalue is non-negative while iterating; the returned
/// eigenvalues are unshifted either way.
pub fn top_eigenpairs(
    matrix: &Array2<f64>,
    k: usize,
    seed: u64,
    positive_semidefinite: bool,
) -> Vec<(f64, Array1<f64>)> {
    let n = matrix.nrows();
    let shift = if positive_semidefinite {
        0.0
    } else {
        matrix
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0f64, f64::max)
    };

    // Below this the remaining spectrum is numerically zero.
    let floor = f64::EPSILON * n as f64 * matrix.iter().fold(0.0f64, |m, v| m.max(v.abs()));

    let mut a = matrix.clone();
    a.diag_mut().mapv_inplace(|v| v + shift);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairs: Vec<(f64, Array1<f64>)> = Vec::with_capacity(k);

    for _ in 0..k.min(n) {
        let mut v: Array1<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        orthogonalize(&mut v, &pairs);
        normalize(&mut v);

        let mut lambda = 0.0;
        for _ in 0..MAX_ITERATIONS {
            let mut next = a.dot(&v);
            orthogonalize(&mut next, &pairs);
            let norm = next.dot(&next).sqrt();
            if norm <= floor {
                lambda = 0.0;
                break;
            }
            next /= norm;
            lambda = norm;
            let converged = 1.0 - next.dot(&v).abs() < TOLERANCE;
            v = next;
            if converged {
                break;
            }
        }

        // Deflate so the next pass converges to the following eigenvector.
        let outer = v
            .view()
            .insert_axis(Axis(1))
            .dot(&v.view().insert_axis(Axis(0)));
        a.scaled_add(-lambda, &outer);
        pairs.push((lambda - shift, v));
    }

    pairs
}

fn orthogonalize(v: &mut Array1<f64>, basis: &[(f64, Array1<f64>)]) {
    for (_, b) in basis {
        let proj = v.dot(b);
        v.scaled_add(-proj, b);
    }
}

fn normalize(v: &mut Array1<f64>) {
    let norm = v.dot(v).sqrt();
    if norm > 0.0 {
        *v /= norm;
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn diagonal_matrix_eigenvalues_in_order() {
        let m = array![[1.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 3.0]];
        let pairs = top_eigenpairs(&m, 2, 1, true);
        assert!((pairs[0].0 - 5.0).abs() < 1e-8);
        assert!((pairs[1].0 - 3.0).abs() < 1e-8);
        assert!((pairs[0].1[1].abs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn handles_negative_eigenvalues() {
        // Eigenvalues 3 and -1.
        let m = array![[1.0, 2.0], [2.0, 1.0]];
        let pairs = top_eigenpairs(&m, 2, 7, false);
        assert!((pairs[0].0 - 3.0).abs() < 1e-8);
        assert!((pairs[1].0 + 1.0).abs() < 1e-8);
    }

    #[test]
    fn zero_matrix_yields_zero_eigenvalues() {
        let m = Array2::<f64>::zeros((3, 3));
        let pairs = top_eigenpairs(&m, 2, 0, true);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|(l, _)| l.abs() < 1e-12));
    }
}
