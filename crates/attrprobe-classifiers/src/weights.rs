//! Uniform feature weights from family-specific model internals

use attrprobe_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model-native importance before it is mapped to feature names
#[derive(Debug, Clone, PartialEq)]
pub enum RawWeights {
    /// One weight per feature column, in column order
    Dense(Vec<f64>),

    /// Split counts keyed by column index; unused columns are absent
    SplitCounts(BTreeMap<usize, u32>),
}

impl RawWeights {
    /// Number of features that carry a weight
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(w) => w.len(),
            Self::SplitCounts(c) => c.len(),
        }
    }

    /// Whether no feature carries a weight
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named feature weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub weight: f64,
}

impl FeatureWeight {
    pub fn new(feature: impl Into<String>, weight: f64) -> Self {
        Self {
            feature: feature.into(),
            weight,
        }
    }
}

/// Resolve raw weights against the column names of the fitted matrix
pub fn extract_weights(raw: &RawWeights, feature_names: &[String]) -> Result<Vec<FeatureWeight>> {
    match raw {
        RawWeights::Dense(weights) => {
            if weights.len() != feature_names.len() {
                return Err(Error::classifier(format!(
                    "{} dense weights for {} features",
                    weights.len(),
                    feature_names.len()
                )));
            }
            Ok(feature_names
                .iter()
                .zip(weights)
                .map(|(name, w)| FeatureWeight::new(name.clone(), *w))
                .collect())
        }
        RawWeights::SplitCounts(counts) => counts
            .iter()
            .map(|(&index, &count)| {
                feature_names
                    .get(index)
                    .map(|name| FeatureWeight::new(name.clone(), f64::from(count)))
                    .ok_or_else(|| {
                        Error::classifier(format!(
                            "split on feature index {} but only {} features exist",
                            index,
                            feature_names.len()
                        ))
                    })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()]
    }

    #[test]
    fn test_dense_weights_follow_columns() {
        let raw = RawWeights::Dense(vec![0.5, -1.0, 2.0]);
        let weights = extract_weights(&raw, &names()).unwrap();
        assert_eq!(weights[1], FeatureWeight::new("beta", -1.0));
        assert_eq!(weights.len(), 3);
    }

    #[test]
    fn test_split_counts_omit_unused_features() {
        let raw = RawWeights::SplitCounts(BTreeMap::from([(0, 4), (2, 1)]));
        let weights = extract_weights(&raw, &names()).unwrap();
        assert_eq!(
            weights,
            vec![FeatureWeight::new("alpha", 4.0), FeatureWeight::new("gamma", 1.0)]
        );
    }

    #[test]
    fn test_shape_errors() {
        assert!(extract_weights(&RawWeights::Dense(vec![1.0]), &names()).is_err());
        let raw = RawWeights::SplitCounts(BTreeMap::from([(7, 1)]));
        assert!(extract_weights(&raw, &names()).is_err());
    }
}
