//! L2-penalised logistic regression
//!
//! Each binary subproblem minimises
//! `0.5 * |w|^2 + C * sum_i log(1 + exp(-y_i * w . x_i))` with `y_i` in
//! `{-1, +1}` and the bias folded into `w` (so it is penalised too), using
//! damped Newton steps. Multiclass targets are fitted one-vs-rest.

use crate::classifier::{
    check_prediction_input, check_training_input, not_fitted, Classifier, ClassifierKind,
};
use crate::config::LogisticConfig;
use crate::weights::RawWeights;
use attrprobe_core::Result;
use attrprobe_stats::linalg::solve_spd_regularized;
use ndarray::{s, Array1, Array2, Axis};
use tracing::{debug, warn};

/// Armijo sufficient-decrease constant
const ARMIJO: f64 = 0.01;

/// Smallest step length tried by the line search
const MIN_STEP: f64 = 1e-10;

#[derive(Debug, Clone)]
struct FittedLogistic {
    /// One row per binary subproblem, bias last when fitted
    coefficients: Array2<f64>,
    n_features: usize,
    n_classes: usize,
}

/// One-vs-rest logistic regression
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    config: LogisticConfig,
    fitted: Option<FittedLogistic>,
}

impl LogisticClassifier {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Coefficient rows (bias column last), if fitted
    pub fn coefficients(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.coefficients)
    }

    fn design(&self, x: &Array2<f64>) -> Array2<f64> {
        if !self.config.fit_intercept {
            return x.clone();
        }
        let mut design = Array2::<f64>::ones((x.nrows(), x.ncols() + 1));
        design.slice_mut(s![.., ..x.ncols()]).assign(x);
        design
    }

    /// Newton iterations for one `{-1, +1}` subproblem
    fn fit_binary(&self, design: &Array2<f64>, signs: &Array1<f64>) -> Result<Array1<f64>> {
        let c = self.config.c;
        let dim = design.ncols();
        let mut w = Array1::<f64>::zeros(dim);
        let mut initial_norm = None;

        for iteration in 0..self.config.max_iter {
            let margins = design.dot(&w) * signs;
            let sigma = margins.mapv(sigmoid);

            let residual = (&sigma - 1.0) * signs * c;
            let gradient = &w + &design.t().dot(&residual);
            let norm = gradient.dot(&gradient).sqrt();

            let reference = *initial_norm.get_or_insert(norm);
            if norm <= self.config.tol * reference || norm == 0.0 {
                debug!(iterations = iteration, "logistic subproblem converged");
                return Ok(w);
            }

            let curvature = sigma.mapv(|s| c * s * (1.0 - s));
            let weighted = design * &curvature.view().insert_axis(Axis(1));
            let mut hessian = design.t().dot(&weighted);
            hessian.diag_mut().mapv_inplace(|v| v + 1.0);

            let step = solve_spd_regularized(&hessian, &gradient.mapv(|g| -g))?;
            let slope = gradient.dot(&step);
            let current = objective(design, signs, &w, c);

            let mut t = 1.0;
            loop {
                let candidate = &w + &(&step * t);
                if objective(design, signs, &candidate, c) <= current + ARMIJO * t * slope
                    || t < MIN_STEP
                {
                    w = candidate;
                    break;
                }
                t *= 0.5;
            }
        }

        warn!(
            max_iter = self.config.max_iter,
            "logistic regression did not converge"
        );
        Ok(w)
    }
}

impl Default for LogisticClassifier {
    fn default() -> Self {
        Self::new(LogisticConfig::default())
    }
}

impl Classifier for LogisticClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Logistic
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(x, y, n_classes)?;
        let design = self.design(x);

        // binary targets fit a single model for the second class
        let positives: Vec<usize> = if n_classes == 2 {
            vec![1]
        } else {
            (0..n_classes).collect()
        };

        let mut coefficients = Array2::<f64>::zeros((positives.len(), design.ncols()));
        for (row, &positive) in positives.iter().enumerate() {
            let signs: Array1<f64> = y
                .iter()
                .map(|&c| if c == positive { 1.0 } else { -1.0 })
                .collect();
            let w = self.fit_binary(&design, &signs)?;
            coefficients.row_mut(row).assign(&w);
        }

        self.fitted = Some(FittedLogistic {
            coefficients,
            n_features: x.ncols(),
            n_classes,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.kind()))?;
        check_prediction_input(x, fitted.n_features)?;

        let scores = self.design(x).dot(&fitted.coefficients.t());
        let predictions = scores
            .axis_iter(Axis(0))
            .map(|row| {
                if fitted.n_classes == 2 {
                    usize::from(row[0] > 0.0)
                } else {
                    argmax(row.iter().copied())
                }
            })
            .collect();
        Ok(predictions)
    }

    fn raw_weights(&self) -> Result<RawWeights> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.kind()))?;
        let first = fitted.coefficients.row(0);
        Ok(RawWeights::Dense(
            first.iter().take(fitted.n_features).copied().collect(),
        ))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(-z))` without overflow
fn log_loss(z: f64) -> f64 {
    if z > 0.0 {
        (-z).exp().ln_1p()
    } else {
        -z + z.exp().ln_1p()
    }
}

fn objective(design: &Array2<f64>, signs: &Array1<f64>, w: &Array1<f64>, c: f64) -> f64 {
    let margins = design.dot(w) * signs;
    0.5 * w.dot(w) + c * margins.iter().map(|m| log_loss(*m)).sum::<f64>()
}

/// Index of the largest value; ties resolve to the lowest index
pub(crate) fn argmax<I: IntoIterator<Item = f64>>(values: I) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.into_iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 1.0],
            [0.2, 0.9],
            [0.1, 1.2],
            [1.0, 0.0],
            [0.9, 0.2],
            [1.2, 0.1]
        ];
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_binary_fit_predicts_training_data() {
        let (x, y) = separable();
        let mut model = LogisticClassifier::default();
        model.fit(&x, &y, 2).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);

        // the single coefficient row describes the second class
        match model.raw_weights().unwrap() {
            RawWeights::Dense(w) => {
                assert_eq!(w.len(), 2);
                assert!(w[0] > 0.0);
                assert!(w[1] < 0.0);
            }
            other => panic!("unexpected weights {:?}", other),
        }
    }

    #[test]
    fn test_gradient_vanishes_at_optimum() {
        let (x, y) = separable();
        let model = LogisticClassifier::default();
        let design = model.design(&x);
        let signs: Array1<f64> = y.iter().map(|&c| if c == 1 { 1.0 } else { -1.0 }).collect();
        let w = model.fit_binary(&design, &signs).unwrap();

        let sigma = (design.dot(&w) * &signs).mapv(sigmoid);
        let gradient = &w + &design.t().dot(&((&sigma - 1.0) * &signs));
        assert!(gradient.iter().all(|g| g.abs() < 1e-3));
    }

    #[test]
    fn test_multiclass_one_vs_rest() {
        let x = array![
            [1.0, 0.0, 0.0],
            [0.9, 0.1, 0.0],
            [0.0, 1.0, 0.0],
            [0.1, 0.9, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.1, 0.9]
        ];
        let y = vec![0, 0, 1, 1, 2, 2];
        let mut model = LogisticClassifier::default();
        model.fit(&x, &y, 3).unwrap();

        assert_eq!(model.coefficients().unwrap().nrows(), 3);
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_single_class_training_set() {
        let x = array![[1.0], [2.0]];
        let mut model = LogisticClassifier::default();
        model.fit(&x, &[0, 0], 2).unwrap();
        assert_eq!(model.predict(&x).unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_unfitted_model_errors() {
        let model = LogisticClassifier::default();
        assert!(model.predict(&array![[1.0]]).is_err());
        assert!(model.raw_weights().is_err());
    }

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(argmax([1.0, 3.0, 3.0]), 1);
    }
}
