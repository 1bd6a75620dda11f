//! Dense symmetric positive-definite solves
//!
//! Newton steps for both logistic models solve against an information
//! matrix, which is symmetric and (up to rank deficiency) positive definite,
//! so a Cholesky factorisation is all that is needed.

use attrprobe_core::{Error, Result};
use ndarray::{Array1, Array2};

/// Relative pivot below which a matrix is treated as singular
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Jitter escalation attempts for rank-deficient systems
const MAX_JITTER_ATTEMPTS: usize = 8;

/// Lower-triangular Cholesky factor `L` with `A = L Lᵀ`, or `None` if `A` is
/// not numerically positive definite
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return None;
    }

    let scale = a
        .diag()
        .iter()
        .fold(0.0f64, |acc, v| acc.max(v.abs()))
        .max(1.0);

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !diag.is_finite() || diag <= PIVOT_TOLERANCE * scale {
            return None;
        }
        let ljj = diag.sqrt();
        l[[j, j]] = ljj;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / ljj;
        }
    }

    Some(l)
}

/// Solve `L Lᵀ x = b` given the Cholesky factor `L`
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // forward: L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }

    // backward: Lᵀ x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    x
}

/// Solve `A x = b` for symmetric positive-definite `A`
pub fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    cholesky(a).map(|l| cholesky_solve(&l, b))
}

/// Solve `A x = b`, adding escalating diagonal jitter when `A` is only
/// positive semi-definite (e.g. an all-zero feature column)
pub fn solve_spd_regularized(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    if let Some(x) = solve_spd(a, b) {
        return Ok(x);
    }

    let n = a.nrows();
    let trace_scale = (a.diag().sum() / n.max(1) as f64).abs().max(1.0);
    let mut jitter = 1e-10 * trace_scale;

    for _ in 0..MAX_JITTER_ATTEMPTS {
        let mut regularized = a.clone();
        regularized.diag_mut().mapv_inplace(|v| v + jitter);
        if let Some(x) = solve_spd(&regularized, b) {
            return Ok(x);
        }
        jitter *= 100.0;
    }

    Err(Error::estimator(format!(
        "linear system of size {} is not positive definite",
        n
    )))
}

/// Inverse of a symmetric positive-definite matrix, or `None` if singular
pub fn invert_spd(a: &Array2<f64>) -> Option<Array2<f64>> {
    let l = cholesky(a)?;
    let n = a.nrows();
    let mut inverse = Array2::<f64>::zeros((n, n));
    let mut unit = Array1::<f64>::zeros(n);

    for col in 0..n {
        unit[col] = 1.0;
        let solved = cholesky_solve(&l, &unit);
        inverse.column_mut(col).assign(&solved);
        unit[col] = 0.0;
    }

    Some(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cholesky_reconstructs() {
        let a = array![[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        let l = cholesky(&a).unwrap();
        let rebuilt = l.dot(&l.t());
        for (x, y) in rebuilt.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_solve_spd() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![3.0, 5.0];
        let x = solve_spd(&a, &b).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_singular_matrix() {
        let a = array![[1.0, 0.0], [0.0, 0.0]];
        assert!(cholesky(&a).is_none());
        assert!(invert_spd(&a).is_none());

        // jitter makes the zero direction solvable with a zero right-hand side
        let x = solve_spd_regularized(&a, &array![2.0, 0.0]).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-6);
        assert!(x[1].abs() < 1e-6);
    }

    #[test]
    fn test_invert_spd() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let inv = invert_spd(&a).unwrap();
        let identity = a.dot(&inv);
        assert!((identity[[0, 0]] - 1.0).abs() < 1e-12);
        assert!(identity[[0, 1]].abs() < 1e-12);
        assert!((identity[[1, 1]] - 1.0).abs() < 1e-12);
    }
}
