//! Classifier trait and common types

use crate::weights::RawWeights;
use attrprobe_core::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trait for all probe classifiers
///
/// A classifier is constructed fresh for every fold, fitted once, then used
/// for prediction and weight extraction.
pub trait Classifier: Send {
    /// Family this classifier belongs to
    fn kind(&self) -> ClassifierKind;

    /// Fit on a feature matrix and internal class indices in `0..n_classes`
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()>;

    /// Predict internal class indices
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>>;

    /// Family-specific feature weights of the fitted model
    fn raw_weights(&self) -> Result<RawWeights>;
}

/// Classifier family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// L2-penalised one-vs-rest logistic regression
    Logistic,
    /// Two-hidden-layer perceptron
    Mlp,
    /// Gradient-boosted decision trees
    Xgboost,
}

impl ClassifierKind {
    /// Every family in reporting order
    pub const ALL: [ClassifierKind; 3] = [Self::Logistic, Self::Mlp, Self::Xgboost];

    /// Result key for this family
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logistic => "logistic",
            Self::Mlp => "mlp",
            Self::Xgboost => "xgboost",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "logistic" => Ok(Self::Logistic),
            "mlp" => Ok(Self::Mlp),
            "xgboost" => Ok(Self::Xgboost),
            other => Err(Error::config(format!("unknown classifier '{}'", other))),
        }
    }
}

/// Fraction of predictions equal to the truth (0 for empty input)
pub fn accuracy(predicted: &[usize], truth: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(truth)
        .filter(|(p, t)| p == t)
        .count();
    correct as f64 / truth.len() as f64
}

/// Shared input validation for `fit`
pub(crate) fn check_training_input(
    x: &Array2<f64>,
    y: &[usize],
    n_classes: usize,
) -> Result<()> {
    if x.nrows() == 0 {
        return Err(Error::classifier("cannot fit on zero rows"));
    }
    if x.nrows() != y.len() {
        return Err(Error::classifier(format!(
            "feature matrix has {} rows but {} labels were given",
            x.nrows(),
            y.len()
        )));
    }
    if n_classes < 2 {
        return Err(Error::classifier(format!(
            "at least two classes are required, got {}",
            n_classes
        )));
    }
    if let Some(bad) = y.iter().find(|c| **c >= n_classes) {
        return Err(Error::classifier(format!(
            "label {} out of range for {} classes",
            bad, n_classes
        )));
    }
    Ok(())
}

/// Shared input validation for `predict`
pub(crate) fn check_prediction_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(Error::classifier(format!(
            "model was fitted on {} features but got {}",
            n_features,
            x.ncols()
        )));
    }
    Ok(())
}

/// Error for use before `fit`
pub(crate) fn not_fitted(kind: ClassifierKind) -> Error {
    Error::classifier(format!("{} classifier used before fit", kind))
}
