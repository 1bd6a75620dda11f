//! Probe settings

use attrprobe_core::{Error, Result};
use attrprobe_features::{
    FeatureBudget, StopwordSet, DEFAULT_HONORIFICS, DEFAULT_MAX_FEATURES,
    DEFAULT_REDUCED_MAX_FEATURES, ENGLISH_STOPWORDS,
};
use attrprobe_stats::DEFAULT_CONFIDENCE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings shared by every run of a probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Feature budget for classifiers and (usually) the estimator
    pub max_features: usize,

    /// Estimator budget in content mode for short-response models
    pub reduced_max_features: usize,

    /// Case-insensitive substrings marking short-response model names
    pub short_response_models: Vec<String>,

    /// Extra tokens dropped from content features
    pub honorifics: Vec<String>,

    /// Stopword list, one word per line; the embedded English list if unset
    pub stopwords_path: Option<PathBuf>,

    /// Confidence level of the accuracy interval
    pub confidence: f64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            reduced_max_features: DEFAULT_REDUCED_MAX_FEATURES,
            short_response_models: vec!["gemma".to_string(), "claude".to_string()],
            honorifics: DEFAULT_HONORIFICS.iter().map(|h| h.to_string()).collect(),
            stopwords_path: None,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl ProbeSettings {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Invalid probe settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Reject budgets and levels no run could use
    pub fn validate(&self) -> Result<()> {
        if self.max_features == 0 || self.reduced_max_features == 0 {
            return Err(Error::config("feature budgets must be positive"));
        }
        if !(0.0..1.0).contains(&self.confidence) {
            return Err(Error::config(format!(
                "confidence must lie in [0, 1), got {}",
                self.confidence
            )));
        }
        Ok(())
    }

    /// Whether `model_name` produces characteristically short responses
    pub fn is_short_response_model(&self, model_name: &str) -> bool {
        let name = model_name.to_lowercase();
        self.short_response_models
            .iter()
            .any(|pattern| name.contains(&pattern.to_lowercase()))
    }

    /// Feature budget for runs over `model_name`'s responses
    pub fn budget_for(&self, model_name: &str) -> FeatureBudget {
        let budget = FeatureBudget::new(self.max_features);
        if self.is_short_response_model(model_name) {
            debug!(
                model = model_name,
                reduced = self.reduced_max_features,
                "using reduced estimator budget"
            );
            budget.with_reduced(self.reduced_max_features)
        } else {
            budget
        }
    }

    /// Load the configured stopword set
    pub fn stopword_set(&self) -> Result<StopwordSet> {
        match &self.stopwords_path {
            Some(path) => StopwordSet::from_file(path, &self.honorifics),
            None => Ok(StopwordSet::new(ENGLISH_STOPWORDS.iter(), &self.honorifics)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrprobe_core::Mode;
    use std::io::Write;

    #[test]
    fn test_short_response_budget() {
        let settings = ProbeSettings::default();
        let gemma = settings.budget_for("google/gemma-2-9b-it");
        assert_eq!(gemma.max_features, 120);
        assert_eq!(gemma.estimator_override(Mode::Content), Some(60));

        let claude = settings.budget_for("anthropic/Claude-3-haiku");
        assert_eq!(claude.estimator_override(Mode::Content), Some(60));

        let llama = settings.budget_for("meta-llama/Llama-3.1-8B-Instruct");
        assert_eq!(llama.estimator_override(Mode::Content), None);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = ProbeSettings::from_yaml("max_features: 80\n").unwrap();
        assert_eq!(settings.max_features, 80);
        assert_eq!(settings.reduced_max_features, 60);
        assert_eq!(settings.honorifics, vec!["mr", "ms", "mrs", "miss"]);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(ProbeSettings::from_yaml("max_features: 0\n").is_err());
        assert!(ProbeSettings::from_yaml("confidence: 1.5\n").is_err());
        assert!(ProbeSettings::from_yaml("max_features: [1]\n").is_err());
    }

    #[test]
    fn test_stopwords_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# custom list\nthe\nand").unwrap();

        let settings = ProbeSettings {
            stopwords_path: Some(file.path().to_path_buf()),
            ..ProbeSettings::default()
        };
        let stopwords = settings.stopword_set().unwrap();
        assert_eq!(stopwords.len(), 2);
        assert!(stopwords.excludes_from_content("mr"));
    }

    #[test]
    fn test_missing_stopword_file() {
        let settings = ProbeSettings {
            stopwords_path: Some(PathBuf::from("/nonexistent/stopwords.txt")),
            ..ProbeSettings::default()
        };
        assert!(matches!(settings.stopword_set(), Err(Error::Config(_))));
    }
}
