//! Result types for a single probing run

use attrprobe_classifiers::{ClassifierKind, FeatureWeight};
use attrprobe_core::{Attribute, Mode};
use attrprobe_stats::InferenceRecord;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved key for the inferential table
pub const INFERENCE_KEY: &str = "inference";

/// Key carrying the estimator failure message, present only on failure
pub const INFERENCE_ERROR_KEY: &str = "inference_error";

/// Cross-validated outcome of one classifier family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub mean_accuracy: f64,

    /// `[lower, upper]` t-interval of the fold accuracies
    pub confidence_interval: (f64, f64),

    /// Mean fold weights, descending
    pub feature_weights: Vec<FeatureWeight>,

    /// Per-fold accuracy in fold order
    pub fold_accuracies: Vec<f64>,
}

/// Everything produced for one (attribute, mode) pair
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub attribute: Attribute,
    pub mode: Mode,
    pub classifiers: BTreeMap<ClassifierKind, ClassifierResult>,

    /// Empty when the estimator failed
    pub inference: Vec<InferenceRecord>,

    pub inference_error: Option<String>,
}

impl RunResult {
    /// Result block of one classifier family
    pub fn classifier(&self, kind: ClassifierKind) -> Option<&ClassifierResult> {
        self.classifiers.get(&kind)
    }

    /// Whether the inferential table was produced
    pub fn has_inference(&self) -> bool {
        self.inference_error.is_none()
    }
}

/// Serialized as `{logistic, mlp, xgboost, inference[, inference_error]}`
impl Serialize for RunResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.inference_error.is_some());
        let mut map = serializer.serialize_map(Some(self.classifiers.len() + 1 + extra))?;
        for (kind, result) in &self.classifiers {
            map.serialize_entry(kind.as_str(), result)?;
        }
        map.serialize_entry(INFERENCE_KEY, &self.inference)?;
        if let Some(error) = &self.inference_error {
            map.serialize_entry(INFERENCE_ERROR_KEY, error)?;
        }
        map.end()
    }
}
