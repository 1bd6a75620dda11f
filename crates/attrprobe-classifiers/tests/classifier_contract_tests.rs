//! Classifier Contract Tests
//!
//! Every family must honour the same fit / predict / weights contract so the
//! cross-validated trainer can treat them uniformly.

use attrprobe_classifiers::{
    accuracy, extract_weights, ClassifierConfig, ClassifierKind, ClassifierRegistry, MlpConfig,
    RawWeights,
};
use ndarray::Array2;
use proptest::prelude::*;

/// Two informative columns and one noise column, three classes
fn three_class_data() -> (Array2<f64>, Vec<usize>) {
    let mut data = Vec::new();
    let mut y = Vec::new();
    for i in 0..36 {
        let class = i % 3;
        let step = (i / 3) as f64 * 0.02;
        let (a, b) = match class {
            0 => (1.0 + step, 0.0),
            1 => (0.0, 1.0 + step),
            _ => (-1.0 - step, -1.0),
        };
        data.extend([a, b, (i % 5) as f64 * 0.1]);
        y.push(class);
    }
    (Array2::from_shape_vec((36, 3), data).unwrap(), y)
}

/// Tiny training sets give one minibatch per epoch, too few steps for a
/// validation plateau to mean anything
fn registry() -> ClassifierRegistry {
    ClassifierRegistry::new(ClassifierConfig {
        mlp: MlpConfig {
            early_stopping: false,
            ..MlpConfig::default()
        },
        ..ClassifierConfig::default()
    })
}

fn names() -> Vec<String> {
    vec!["alpha".into(), "beta".into(), "noise".into()]
}

#[test]
fn test_every_family_fits_and_predicts() {
    let (x, y) = three_class_data();
    let registry = registry();

    for &kind in registry.kinds() {
        let mut model = registry.create(kind);
        model.fit(&x, &y, 3).unwrap();

        let predicted = model.predict(&x).unwrap();
        assert_eq!(predicted.len(), y.len());
        assert!(predicted.iter().all(|c| *c < 3));

        let acc = accuracy(&predicted, &y);
        assert!(acc >= 0.8, "{} training accuracy {}", kind, acc);
    }
}

#[test]
fn test_weights_resolve_to_feature_names() {
    let (x, y) = three_class_data();
    let registry = registry();

    for &kind in registry.kinds() {
        let mut model = registry.create(kind);
        model.fit(&x, &y, 3).unwrap();

        let raw = model.raw_weights().unwrap();
        let weights = extract_weights(&raw, &names()).unwrap();
        match (kind, raw) {
            (ClassifierKind::Xgboost, RawWeights::SplitCounts(_)) => {
                assert!(weights.iter().all(|w| w.weight >= 1.0));
            }
            (ClassifierKind::Logistic | ClassifierKind::Mlp, RawWeights::Dense(_)) => {
                assert_eq!(weights.len(), 3);
                assert_eq!(weights[2].feature, "noise");
            }
            (kind, raw) => panic!("{} produced unexpected weights {:?}", kind, raw),
        }
    }
}

#[test]
fn test_refit_is_reproducible() {
    let (x, y) = three_class_data();
    let registry = registry();

    for &kind in registry.kinds() {
        let mut first = registry.create(kind);
        let mut second = registry.create(kind);
        first.fit(&x, &y, 3).unwrap();
        second.fit(&x, &y, 3).unwrap();
        assert_eq!(
            first.raw_weights().unwrap(),
            second.raw_weights().unwrap(),
            "{} is not deterministic",
            kind
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_accuracy_is_a_fraction(
        pairs in prop::collection::vec((0usize..4, 0usize..4), 1..50)
    ) {
        let (predicted, truth): (Vec<usize>, Vec<usize>) = pairs.into_iter().unzip();
        let acc = accuracy(&predicted, &truth);
        prop_assert!((0.0..=1.0).contains(&acc));
    }
}
