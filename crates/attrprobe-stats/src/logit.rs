//! Baseline-category logistic regression fitted by Newton-Raphson
//!
//! The last class (`K-1`) is the baseline; coefficients are reported for
//! classes `0..K-2` relative to it. With `K = 2` this is ordinary binary
//! logistic regression for class 0 against class 1.

use crate::linalg::{invert_spd, solve_spd_regularized};
use attrprobe_core::{Error, Result};
use ndarray::{s, Array1, Array2, Axis};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, warn};

/// Newton iteration budget
///
/// Newton converges quadratically on identified problems, typically within
/// 10 steps, so this is far below what a first-order solver such as L-BFGS
/// needs (2000) for the same fit.
pub const MAX_ITERATIONS: usize = 100;

/// Convergence threshold on the largest parameter update
pub const STEP_TOLERANCE: f64 = 1e-6;

/// Step halvings attempted before accepting a non-improving step
const MAX_HALVINGS: usize = 30;

/// Observed-class probability above which every row counts as perfectly fitted
const SEPARATION_THRESHOLD: f64 = 1.0 - 1e-8;

/// Binary or multinomial parameterisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogitKind {
    Binary,
    Multinomial,
}

impl LogitKind {
    /// Kind for a number of classes (at least 2)
    pub fn for_classes(n_classes: usize) -> Self {
        if n_classes == 2 {
            Self::Binary
        } else {
            Self::Multinomial
        }
    }
}

/// Prepend an all-ones intercept column
pub fn add_constant(x: &Array2<f64>) -> Array2<f64> {
    let mut design = Array2::<f64>::ones((x.nrows(), x.ncols() + 1));
    design.slice_mut(s![.., 1..]).assign(x);
    design
}

/// Fitted model: `coefficients[[j, c]]` is the effect of design column `j`
/// on the log-odds of class `c` against the baseline
#[derive(Debug, Clone)]
pub struct LogitFit {
    pub kind: LogitKind,
    pub coefficients: Array2<f64>,
    /// NaN everywhere when the information matrix is singular
    pub standard_errors: Array2<f64>,
    pub log_likelihood: f64,
    pub iterations: usize,
    /// Every row was fitted with near certainty; the estimates are the last
    /// finite iterate rather than a maximum
    pub separated: bool,
}

impl LogitFit {
    /// Two-sided Wald p-values
    pub fn p_values(&self) -> Array2<f64> {
        let normal = match Normal::new(0.0, 1.0) {
            Ok(n) => n,
            Err(_) => return Array2::from_elem(self.coefficients.raw_dim(), f64::NAN),
        };

        let mut p = Array2::<f64>::zeros(self.coefficients.raw_dim());
        ndarray::Zip::from(&mut p)
            .and(&self.coefficients)
            .and(&self.standard_errors)
            .for_each(|p, &coef, &se| {
                *p = if se.is_finite() && se > 0.0 {
                    2.0 * normal.cdf(-(coef / se).abs())
                } else {
                    f64::NAN
                };
            });
        p
    }
}

/// Newton-Raphson fitter with a fixed iteration budget
#[derive(Debug, Clone, Copy)]
pub struct BaselineLogit {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for BaselineLogit {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            tolerance: STEP_TOLERANCE,
        }
    }
}

impl BaselineLogit {
    /// Fit on a design matrix (intercept included by the caller) and class
    /// indices in `0..n_classes`
    pub fn fit(&self, design: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<LogitFit> {
        let (n, p) = design.dim();
        if n != y.len() {
            return Err(Error::data(format!(
                "design has {} rows but {} labels",
                n,
                y.len()
            )));
        }
        if n_classes < 2 {
            return Err(Error::data("logistic regression needs at least two classes"));
        }
        if let Some(bad) = y.iter().find(|c| **c >= n_classes) {
            return Err(Error::data(format!(
                "class index {} out of range for {} classes",
                bad, n_classes
            )));
        }

        let kind = LogitKind::for_classes(n_classes);
        let m = n_classes - 1;
        let indicators = indicator_matrix(y, m);

        let mut beta = Array2::<f64>::zeros((p, m));
        let mut ll = log_likelihood(design, &beta, y, m);

        for iteration in 1..=self.max_iterations {
            let probs = probabilities(design, &beta);
            let gradient = design.t().dot(&(&indicators - &probs));
            let information = information_matrix(design, &probs);

            let step = solve_spd_regularized(&information, &flatten(&gradient))?;
            let step = unflatten(&step, p, m);

            let mut scale = 1.0;
            let mut candidate = &beta + &step;
            let mut candidate_ll = log_likelihood(design, &candidate, y, m);
            let mut halvings = 0;
            while !(candidate_ll.is_finite() && candidate_ll >= ll - 1e-12)
                && halvings < MAX_HALVINGS
            {
                scale *= 0.5;
                candidate = &beta + &(&step * scale);
                candidate_ll = log_likelihood(design, &candidate, y, m);
                halvings += 1;
            }

            let max_update = (&step * scale)
                .iter()
                .fold(0.0f64, |acc, v| acc.max(v.abs()));

            if !candidate.iter().all(|v| v.is_finite()) {
                warn!(iteration, "logit parameters diverged");
                return Err(Error::NonConvergence { iterations: iteration });
            }

            beta = candidate;
            ll = candidate_ll;

            let separated = perfectly_separated(design, &beta, y, m);
            if separated {
                warn!(
                    iteration,
                    log_likelihood = ll,
                    "perfect separation in logit fit; reporting the last finite iterate"
                );
            } else if max_update < self.tolerance {
                debug!(?kind, iteration, log_likelihood = ll, "logit converged");
            }

            if separated || max_update < self.tolerance {
                let standard_errors = standard_errors(design, &beta, p, m);
                return Ok(LogitFit {
                    kind,
                    coefficients: beta,
                    standard_errors,
                    log_likelihood: ll,
                    iterations: iteration,
                    separated,
                });
            }
        }

        warn!(
            ?kind,
            iterations = self.max_iterations,
            "logit did not converge"
        );
        Err(Error::NonConvergence {
            iterations: self.max_iterations,
        })
    }
}

/// One-hot columns for the non-baseline classes
fn indicator_matrix(y: &[usize], m: usize) -> Array2<f64> {
    let mut indicators = Array2::<f64>::zeros((y.len(), m));
    for (i, &class) in y.iter().enumerate() {
        if class < m {
            indicators[[i, class]] = 1.0;
        }
    }
    indicators
}

/// Non-baseline class probabilities (n x m)
fn probabilities(design: &Array2<f64>, beta: &Array2<f64>) -> Array2<f64> {
    let mut eta = design.dot(beta);
    for mut row in eta.axis_iter_mut(Axis(0)) {
        let shift = row.iter().fold(0.0f64, |acc, v| acc.max(*v));
        let denom = (-shift).exp() + row.iter().map(|v| (v - shift).exp()).sum::<f64>();
        row.mapv_inplace(|v| (v - shift).exp() / denom);
    }
    eta
}

fn log_likelihood(design: &Array2<f64>, beta: &Array2<f64>, y: &[usize], m: usize) -> f64 {
    let eta = design.dot(beta);
    eta.axis_iter(Axis(0))
        .zip(y)
        .map(|(row, &class)| {
            let shift = row.iter().fold(0.0f64, |acc, v| acc.max(*v));
            let log_denom =
                shift + ((-shift).exp() + row.iter().map(|v| (v - shift).exp()).sum::<f64>()).ln();
            let numerator = if class < m { row[class] } else { 0.0 };
            numerator - log_denom
        })
        .sum()
}

/// Whether every row's observed class is predicted with near certainty
fn perfectly_separated(design: &Array2<f64>, beta: &Array2<f64>, y: &[usize], m: usize) -> bool {
    let probs = probabilities(design, beta);
    probs.axis_iter(Axis(0)).zip(y).all(|(row, &class)| {
        let observed = if class < m {
            row[class]
        } else {
            1.0 - row.sum()
        };
        observed > SEPARATION_THRESHOLD
    })
}

/// Negative Hessian of the log-likelihood in class-major parameter order
fn information_matrix(design: &Array2<f64>, probs: &Array2<f64>) -> Array2<f64> {
    let p = design.ncols();
    let m = probs.ncols();
    let mut info = Array2::<f64>::zeros((p * m, p * m));

    for c in 0..m {
        for d in c..m {
            let pc = probs.column(c);
            let pd = probs.column(d);
            let weights: Array1<f64> = if c == d {
                pc.mapv(|v| v * (1.0 - v))
            } else {
                -(&pc * &pd)
            };

            let weighted = design * &weights.insert_axis(Axis(1));
            let block = design.t().dot(&weighted);

            info.slice_mut(s![c * p..(c + 1) * p, d * p..(d + 1) * p])
                .assign(&block);
            if c != d {
                info.slice_mut(s![d * p..(d + 1) * p, c * p..(c + 1) * p])
                    .assign(&block.t());
            }
        }
    }

    info
}

fn standard_errors(design: &Array2<f64>, beta: &Array2<f64>, p: usize, m: usize) -> Array2<f64> {
    let probs = probabilities(design, beta);
    let info = information_matrix(design, &probs);
    match invert_spd(&info) {
        Some(cov) => unflatten(&cov.diag().mapv(|v| v.max(0.0).sqrt()), p, m),
        None => {
            debug!("information matrix is singular; standard errors undefined");
            Array2::from_elem((p, m), f64::NAN)
        }
    }
}

/// Class-major flattening: index `c * p + j`
fn flatten(params: &Array2<f64>) -> Array1<f64> {
    params.t().iter().copied().collect()
}

fn unflatten(flat: &Array1<f64>, p: usize, m: usize) -> Array2<f64> {
    let mut params = Array2::<f64>::zeros((p, m));
    for c in 0..m {
        for j in 0..p {
            params[[j, c]] = flat[c * p + j];
        }
    }
    params
}
