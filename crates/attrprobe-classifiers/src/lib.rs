//! attrprobe Classifiers
//!
//! The three classifier families used by the probe, behind one
//! [`Classifier`] trait:
//! - `logistic`: L2-penalised one-vs-rest logistic regression (Newton)
//! - `mlp`: ReLU perceptron trained with Adam on candle
//! - `xgboost`: second-order gradient-boosted trees
//!
//! Each family exposes its own notion of feature importance as
//! [`RawWeights`]; [`extract_weights`] maps them onto feature names.

pub mod boosting;
pub mod classifier;
pub mod config;
pub mod logistic;
pub mod mlp;
pub mod registry;
pub mod weights;

pub use boosting::BoostingClassifier;
pub use classifier::{accuracy, Classifier, ClassifierKind};
pub use config::{BoostingConfig, ClassifierConfig, LogisticConfig, MlpConfig};
pub use logistic::LogisticClassifier;
pub use mlp::MlpClassifier;
pub use registry::ClassifierRegistry;
pub use weights::{extract_weights, FeatureWeight, RawWeights};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{accuracy, Classifier, ClassifierKind};
    pub use crate::registry::ClassifierRegistry;
    pub use crate::weights::{extract_weights, FeatureWeight, RawWeights};
}
