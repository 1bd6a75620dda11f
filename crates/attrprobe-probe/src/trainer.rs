//! Cross-validated training of every classifier family

use crate::aggregate::mean_weights;
use crate::folds::Fold;
use crate::result::ClassifierResult;
use attrprobe_classifiers::{
    accuracy, extract_weights, ClassifierKind, ClassifierRegistry, FeatureWeight,
};
use attrprobe_core::{Error, Result};
use attrprobe_features::FeatureMatrix;
use attrprobe_stats::{mean_confidence_interval, DEFAULT_CONFIDENCE};
use ndarray::Axis;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-fold record of one classifier
#[derive(Debug, Clone, PartialEq)]
pub struct FoldOutcome {
    pub group: i64,
    pub accuracy: f64,
    pub weights: Vec<FeatureWeight>,
}

/// Runs fresh classifiers over every fold and summarises them
#[derive(Debug, Clone)]
pub struct CrossValidator {
    registry: ClassifierRegistry,
    confidence: f64,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(ClassifierRegistry::default())
    }
}

impl CrossValidator {
    pub fn new(registry: ClassifierRegistry) -> Self {
        Self {
            registry,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// Use a different confidence level for the accuracy interval
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Every family, in reporting order
    pub fn run_all(
        &self,
        features: &FeatureMatrix,
        y: &[usize],
        n_classes: usize,
        folds: &[Fold],
    ) -> Result<BTreeMap<ClassifierKind, ClassifierResult>> {
        let mut results = BTreeMap::new();
        for &kind in self.registry.kinds() {
            let result = self.evaluate(kind, features, y, n_classes, folds)?;
            info!(
                classifier = %kind,
                mean_accuracy = result.mean_accuracy,
                "cross-validation finished"
            );
            results.insert(kind, result);
        }
        Ok(results)
    }

    /// One family over every fold
    pub fn evaluate(
        &self,
        kind: ClassifierKind,
        features: &FeatureMatrix,
        y: &[usize],
        n_classes: usize,
        folds: &[Fold],
    ) -> Result<ClassifierResult> {
        if folds.is_empty() {
            return Err(Error::data("cross-validation needs at least one fold"));
        }
        if y.len() != features.n_documents() {
            return Err(Error::data(format!(
                "{} labels for {} documents",
                y.len(),
                features.n_documents()
            )));
        }

        let outcomes = folds
            .iter()
            .map(|fold| self.run_fold(kind, features, y, n_classes, fold))
            .collect::<Result<Vec<_>>>()?;

        let fold_accuracies: Vec<f64> = outcomes.iter().map(|o| o.accuracy).collect();
        let interval = mean_confidence_interval(&fold_accuracies, self.confidence)?;
        let feature_weights = mean_weights(outcomes.iter().map(|o| o.weights.as_slice()));

        Ok(ClassifierResult {
            mean_accuracy: interval.mean,
            confidence_interval: interval.bounds(),
            feature_weights,
            fold_accuracies,
        })
    }

    /// Fit a fresh model on the training rows and score the held-out group
    pub fn run_fold(
        &self,
        kind: ClassifierKind,
        features: &FeatureMatrix,
        y: &[usize],
        n_classes: usize,
        fold: &Fold,
    ) -> Result<FoldOutcome> {
        if fold.train.is_empty() {
            return Err(Error::data(format!(
                "fold for group {} has an empty training partition",
                fold.group
            )));
        }

        let x_train = features.values.select(Axis(0), &fold.train);
        let x_test = features.values.select(Axis(0), &fold.test);
        let y_train: Vec<usize> = fold.train.iter().map(|&i| y[i]).collect();
        let y_test: Vec<usize> = fold.test.iter().map(|&i| y[i]).collect();

        let seen: BTreeSet<usize> = y_train.iter().copied().collect();
        let unseen: BTreeSet<usize> = y_test
            .iter()
            .copied()
            .filter(|c| !seen.contains(c))
            .collect();
        if !unseen.is_empty() {
            warn!(
                classifier = %kind,
                group = fold.group,
                unseen = ?unseen,
                "test fold contains classes absent from training"
            );
        }

        let start = Instant::now();
        let mut model = self.registry.create(kind);
        model.fit(&x_train, &y_train, n_classes)?;
        let fit_elapsed = start.elapsed();

        let predicted = model.predict(&x_test)?;
        let fold_accuracy = accuracy(&predicted, &y_test);
        let weights = extract_weights(&model.raw_weights()?, features.feature_names())?;

        metrics::counter!("attrprobe_folds_total", "classifier" => kind.as_str()).increment(1);
        metrics::histogram!("attrprobe_fit_duration_us", "classifier" => kind.as_str())
            .record(fit_elapsed.as_micros() as f64);

        debug!(
            classifier = %kind,
            group = fold.group,
            train = fold.train.len(),
            test = fold.test.len(),
            accuracy = fold_accuracy,
            fit_ms = fit_elapsed.as_millis() as u64,
            "fold finished"
        );

        Ok(FoldOutcome {
            group: fold.group,
            accuracy: fold_accuracy,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folds::leave_one_group_out;
    use attrprobe_features::Vocabulary;
    use ndarray::Array2;

    fn features() -> FeatureMatrix {
        let mut values = Array2::<f64>::zeros((8, 2));
        for i in 0..8 {
            values[[i, i % 2]] = 1.0;
        }
        FeatureMatrix {
            values,
            vocabulary: Vocabulary::from_names(vec!["left".into(), "right".into()]),
        }
    }

    #[test]
    fn test_logistic_over_groups() {
        let features = features();
        let y: Vec<usize> = (0..8).map(|i| i % 2).collect();
        let groups = [1, 1, 2, 2, 3, 3, 4, 4];
        let folds = leave_one_group_out(&groups).unwrap();

        let result = CrossValidator::default()
            .evaluate(ClassifierKind::Logistic, &features, &y, 2, &folds)
            .unwrap();

        assert_eq!(result.fold_accuracies, vec![1.0; 4]);
        assert_eq!(result.mean_accuracy, 1.0);
        assert_eq!(result.confidence_interval, (1.0, 1.0));
        assert_eq!(result.feature_weights.len(), 2);
        // the second class is driven by the "right" column
        assert_eq!(result.feature_weights[0].feature, "right");
    }

    #[test]
    fn test_empty_training_partition_rejected() {
        let features = features();
        let y = vec![0; 8];
        let fold = Fold {
            group: 9,
            train: vec![],
            test: (0..8).collect(),
        };
        let err = CrossValidator::default()
            .run_fold(ClassifierKind::Logistic, &features, &y, 2, &fold)
            .unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_label_count_checked() {
        let features = features();
        let folds = leave_one_group_out(&[1, 1, 2, 2, 3, 3, 4, 4]).unwrap();
        assert!(CrossValidator::default()
            .evaluate(ClassifierKind::Logistic, &features, &[0, 1], 2, &folds)
            .is_err());
    }
}
