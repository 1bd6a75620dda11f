//! Fixed hyperparameters for every classifier family
//!
//! Defaults are the probing protocol's constants; they are serde types so a
//! run can record exactly what it trained with.

use attrprobe_core::RANDOM_SEED;
use serde::{Deserialize, Serialize};

/// Configuration for all classifier families
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub logistic: LogisticConfig,

    #[serde(default)]
    pub mlp: MlpConfig,

    #[serde(default)]
    pub xgboost: BoostingConfig,
}

/// L2-penalised logistic regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    /// Inverse regularisation strength
    pub c: f64,

    /// Newton iteration cap
    pub max_iter: usize,

    /// Stop when the gradient norm falls below `tol` times its initial value
    pub tol: f64,

    /// Append a (penalised) bias column
    pub fit_intercept: bool,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
            fit_intercept: true,
        }
    }
}

/// Multi-layer perceptron trained with Adam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    pub hidden_layers: Vec<usize>,

    pub learning_rate: f64,

    /// L2 penalty on connection weights
    pub alpha: f64,

    /// Upper bound on minibatch size
    pub batch_size: usize,

    /// Epoch cap
    pub max_iter: usize,

    pub early_stopping: bool,

    /// Held-out fraction for early stopping
    pub validation_fraction: f64,

    /// Epochs without improvement before stopping
    pub n_iter_no_change: usize,

    pub tol: f64,

    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,

    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![128, 64],
            learning_rate: 1e-3,
            alpha: 1e-4,
            batch_size: 200,
            max_iter: 2000,
            early_stopping: true,
            validation_fraction: 0.1,
            n_iter_no_change: 10,
            tol: 1e-4,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            seed: RANDOM_SEED,
        }
    }
}

/// Gradient-boosted decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    /// Boosting rounds
    pub n_estimators: usize,

    /// Shrinkage applied to every leaf
    pub learning_rate: f64,

    pub max_depth: usize,

    /// Row sampling probability per tree
    pub subsample: f64,

    /// Column fraction sampled per tree
    pub colsample_bytree: f64,

    /// L1 penalty on leaf weights
    pub reg_alpha: f64,

    /// L2 penalty on leaf weights
    pub reg_lambda: f64,

    /// Minimum hessian sum per child
    pub min_child_weight: f64,

    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 4,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_alpha: 0.1,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            seed: RANDOM_SEED,
        }
    }
}
