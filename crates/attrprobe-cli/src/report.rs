//! Console tables and the JSON result file

use crate::grid::GridResults;
use anyhow::Context;
use attrprobe_probe::RunResult;
use attrprobe_stats::InferenceRecord;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default number of rows per table
pub const DEFAULT_TOP_N: usize = 10;

/// Top features of every classifier and the inferential table
pub struct TopFeatures<'a> {
    result: &'a RunResult,
    top_n: usize,
}

impl<'a> TopFeatures<'a> {
    pub fn new(result: &'a RunResult, top_n: usize) -> Self {
        Self { result, top_n }
    }
}

impl fmt::Display for TopFeatures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, block) in &self.result.classifiers {
            writeln!(
                f,
                "\n=== Top {} features for {} ===",
                self.top_n,
                kind.as_str().to_uppercase()
            )?;
            writeln!(f, "{:<24} {:>12}", "feature", "weight")?;
            for weight in block.feature_weights.iter().take(self.top_n) {
                writeln!(f, "{:<24} {:>12.6}", weight.feature, weight.weight)?;
            }
        }

        writeln!(
            f,
            "\n=== Top {} features by baseline-category logit (with p-values) ===",
            self.top_n
        )?;
        match &self.result.inference_error {
            Some(error) => writeln!(f, "unavailable: {}", error),
            None => {
                let rows = &self.result.inference[..self.top_n.min(self.result.inference.len())];
                write!(f, "{}", InferenceTable(rows))
            }
        }
    }
}

/// Every row of an inferential table
pub struct InferenceTable<'a>(pub &'a [InferenceRecord]);

impl fmt::Display for InferenceTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<24} {:>6} {:>12} {:>12}",
            "feature", "class", "coef", "p_value"
        )?;
        for record in self.0 {
            writeln!(
                f,
                "{:<24} {:>6} {:>12.6} {:>12.6}",
                record.feature, record.class, record.coefficient, record.p_value
            )?;
        }
        Ok(())
    }
}

/// Write the nested results as pretty JSON
pub fn write_results(path: &Path, results: &GridResults) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results)
        .with_context(|| format!("Failed to serialize results to {}", path.display()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrprobe_classifiers::{ClassifierKind, FeatureWeight};
    use attrprobe_core::{Attribute, Mode};
    use attrprobe_probe::ClassifierResult;
    use std::collections::BTreeMap;

    fn result(inference_error: Option<String>) -> RunResult {
        let mut classifiers = BTreeMap::new();
        classifiers.insert(
            ClassifierKind::Logistic,
            ClassifierResult {
                mean_accuracy: 0.75,
                confidence_interval: (0.5, 1.0),
                feature_weights: vec![
                    FeatureWeight::new("library", 0.9),
                    FeatureWeight::new("thesis", 0.4),
                    FeatureWeight::new("course", -0.2),
                ],
                fold_accuracies: vec![0.5, 1.0],
            },
        );
        let inference = if inference_error.is_some() {
            Vec::new()
        } else {
            vec![
                InferenceRecord {
                    feature: "thesis".to_string(),
                    class: "1".to_string(),
                    coefficient: 1.5,
                    p_value: 0.01,
                },
                InferenceRecord {
                    feature: "course".to_string(),
                    class: "1".to_string(),
                    coefficient: -0.5,
                    p_value: 0.2,
                },
            ]
        };
        RunResult {
            attribute: Attribute::Sex,
            mode: Mode::Content,
            classifiers,
            inference,
            inference_error,
        }
    }

    #[test]
    fn test_top_features_truncates() {
        let text = TopFeatures::new(&result(None), 2).to_string();
        assert!(text.contains("=== Top 2 features for LOGISTIC ==="));
        assert!(text.contains("library"));
        assert!(text.contains("thesis"));
        assert!(!text.contains("course"));
    }

    #[test]
    fn test_inference_failure_reported() {
        let text = TopFeatures::new(&result(Some("singular".to_string())), 10).to_string();
        assert!(text.contains("unavailable: singular"));
    }

    #[test]
    fn test_inference_table_lists_every_row() {
        let run = result(None);
        let text = InferenceTable(&run.inference).to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(1).unwrap().starts_with("thesis"));
    }

    #[test]
    fn test_write_results_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/probe.json");
        write_results(&path, &GridResults::new(vec!["m".to_string()])).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "{}");
    }
}
