//! End-to-end probe scenarios
//!
//! Each test drives a full run (encoding, cross-validation, inference) over a
//! small hand-written corpus.

use attrprobe_classifiers::ClassifierKind;
use attrprobe_core::{Attribute, Corpus, Document, Error, Mode};
use attrprobe_features::{FeatureBudget, StopwordSet};
use attrprobe_probe::{leave_one_group_out, run_probe, Probe, ProbeSettings};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Overlapping templates, each written with both labels across several seeds
fn sex_corpus() -> Corpus {
    let templates = [
        "apple",
        "apple river",
        "river stone cloud",
        "stone",
        "cloud apple stone",
    ];
    let mut documents = Vec::new();
    for group in 1..=5i64 {
        for (t, text) in templates.iter().enumerate() {
            let label = if (t as i64 + group) % 3 == 0 { "M" } else { "F" };
            documents.push(Document::new(*text, label, group));
        }
    }
    Corpus::new(documents).unwrap()
}

#[test]
fn test_two_document_scenario() {
    let corpus = Corpus::new(vec![
        Document::new("he left the room quickly", "M", 1),
        Document::new("she returned the book", "F", 2),
    ])
    .unwrap();

    let result = run_probe(
        &corpus,
        Attribute::Sex,
        Mode::Content,
        FeatureBudget::default(),
        &StopwordSet::english(),
    )
    .unwrap();

    assert_eq!(result.classifiers.len(), 3);
    for kind in ClassifierKind::ALL {
        let block = result.classifier(kind).unwrap();
        assert_eq!(block.fold_accuracies.len(), 2);
        assert!(block
            .fold_accuracies
            .iter()
            .all(|a| *a == 0.0 || *a == 1.0));
        let (lo, hi) = block.confidence_interval;
        assert!(lo <= block.mean_accuracy && block.mean_accuracy <= hi);
        assert!(block.feature_weights.iter().all(|w| w.feature != "the"));
    }
    assert!(result.inference.iter().all(|r| r.feature != "the"));
}

#[test]
fn test_missing_race_category_is_label_mismatch() {
    let labels = [
        "White",
        "Black or African American",
        "Asian or Pacific Islander",
        "American Indian or Alaska Native",
        "Two or More Races",
    ];
    let documents = labels
        .iter()
        .enumerate()
        .map(|(i, label)| Document::new("the patron asked about the archive", *label, i as i64))
        .collect();
    let corpus = Corpus::new(documents).unwrap();

    let err = run_probe(
        &corpus,
        Attribute::RaceEthnicity,
        Mode::FunctionWords,
        FeatureBudget::default(),
        &StopwordSet::english(),
    )
    .unwrap_err();

    match err {
        Error::LabelMismatch { attribute, observed } => {
            assert_eq!(attribute, "race_ethnicity");
            assert_eq!(observed.len(), 5);
        }
        other => panic!("expected a label mismatch, got {}", other),
    }
}

#[test]
fn test_binary_inference_reports_class_one() {
    let result = run_probe(
        &sex_corpus(),
        Attribute::Sex,
        Mode::Content,
        FeatureBudget::default(),
        &StopwordSet::english(),
    )
    .unwrap();

    assert!(result.has_inference(), "{:?}", result.inference_error);
    assert!(!result.inference.is_empty());
    for record in &result.inference {
        assert_eq!(record.class, "1");
        assert!((0.0..=1.0).contains(&record.p_value));
    }

    let magnitudes: Vec<f64> = result.inference.iter().map(|r| r.coefficient.abs()).collect();
    assert!(magnitudes.windows(2).all(|w| w[0] >= w[1]));
}

/// Every patron type written with every template, plus a few extra rows in
/// a fourth group so the class shares are uneven
fn patron_corpus() -> Corpus {
    let labels = [
        "Undergraduate student",
        "Graduate student",
        "Faculty",
        "Staff",
        "Alumni",
        "Outside user",
    ];
    let templates = [
        "archive",
        "ledger",
        "archive ledger",
        "archive archive ledger",
        "archive ledger ledger",
    ];
    let mut documents = Vec::new();
    for group in 1..=3i64 {
        for text in &templates {
            for label in &labels {
                documents.push(Document::new(*text, *label, group));
            }
        }
    }
    for (t, text) in templates.iter().enumerate() {
        for (l, label) in labels.iter().enumerate() {
            if (t + l) % 3 == 0 {
                documents.push(Document::new(*text, *label, 4));
            }
        }
    }
    Corpus::new(documents).unwrap()
}

#[test]
fn test_patron_type_inference_uses_domain_ordinals() {
    let probe = Probe::new(ProbeSettings::default()).unwrap();
    let result = probe
        .run(
            &patron_corpus(),
            Attribute::PatronType,
            Mode::Content,
            FeatureBudget::default(),
        )
        .unwrap();

    assert!(result.has_inference(), "{:?}", result.inference_error);
    assert_eq!(result.inference.len(), 2 * 5);
    let classes: BTreeSet<&str> = result.inference.iter().map(|r| r.class.as_str()).collect();
    assert_eq!(
        classes,
        ["1", "2", "3", "4", "5"].into_iter().collect::<BTreeSet<_>>()
    );

    let json = serde_json::to_value(&result).unwrap();
    let rows = json["inference"].as_array().unwrap();
    assert_eq!(rows.len(), 10);
    let mut previous = f64::INFINITY;
    for row in rows {
        let class = row["class"].as_str().unwrap();
        assert_ne!(class, "0");
        assert!(classes.contains(class));
        let p_value = row["p_value"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p_value));
        let magnitude = row["coef"].as_f64().unwrap().abs();
        assert!(magnitude <= previous);
        previous = magnitude;
    }
    assert!(json.get("inference_error").is_none());
}

#[test]
fn test_accuracies_and_intervals_are_valid() {
    let result = run_probe(
        &sex_corpus(),
        Attribute::Sex,
        Mode::Content,
        FeatureBudget::default(),
        &StopwordSet::english(),
    )
    .unwrap();

    for block in result.classifiers.values() {
        assert_eq!(block.fold_accuracies.len(), 5);
        assert!(block.fold_accuracies.iter().all(|a| (0.0..=1.0).contains(a)));
        let (lo, hi) = block.confidence_interval;
        assert!(lo <= block.mean_accuracy && block.mean_accuracy <= hi);
        assert!(block.feature_weights.len() <= 4);
    }
}

#[test]
fn test_identical_input_gives_identical_output() {
    let probe = Probe::new(ProbeSettings::default()).unwrap();
    let corpus = sex_corpus();

    let first = probe
        .run_for_model(&corpus, "meta-llama/Llama-3.1-8B", Attribute::Sex, Mode::Content)
        .unwrap();
    let second = probe
        .run_for_model(&corpus, "meta-llama/Llama-3.1-8B", Attribute::Sex, Mode::Content)
        .unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_reduced_budget_only_narrows_the_estimator() {
    let settings = ProbeSettings {
        max_features: 4,
        reduced_max_features: 2,
        ..ProbeSettings::default()
    };
    let probe = Probe::new(settings).unwrap();
    let result = probe
        .run_for_model(&sex_corpus(), "google/gemma-2-9b-it", Attribute::Sex, Mode::Content)
        .unwrap();

    let inferred: BTreeSet<&str> = result.inference.iter().map(|r| r.feature.as_str()).collect();
    assert!(inferred.len() <= 2);

    let logistic = result.classifier(ClassifierKind::Logistic).unwrap();
    assert_eq!(logistic.feature_weights.len(), 4);
}

#[test]
fn test_single_group_is_rejected() {
    let corpus = Corpus::new(vec![
        Document::new("she read the map", "F", 3),
        Document::new("he read the map", "M", 3),
    ])
    .unwrap();
    let err = run_probe(
        &corpus,
        Attribute::Sex,
        Mode::Content,
        FeatureBudget::default(),
        &StopwordSet::english(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Data(_)));
}

proptest! {
    #[test]
    fn prop_folds_partition_documents(groups in prop::collection::vec(0i64..6, 2..40)) {
        let distinct: BTreeSet<i64> = groups.iter().copied().collect();
        prop_assume!(distinct.len() >= 2);

        let folds = leave_one_group_out(&groups).unwrap();
        prop_assert_eq!(folds.len(), distinct.len());

        let mut seen = vec![0usize; groups.len()];
        for fold in &folds {
            prop_assert_eq!(fold.train.len() + fold.test.len(), groups.len());
            for &i in &fold.test {
                seen[i] += 1;
                prop_assert_eq!(groups[i], fold.group);
            }
            for &i in &fold.train {
                prop_assert_ne!(groups[i], fold.group);
            }
        }
        prop_assert!(seen.iter().all(|&count| count == 1));
    }
}
