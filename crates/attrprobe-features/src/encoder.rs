//! Mode-specific feature encoding of a corpus
//!
//! Content mode produces TF-IDF weights over topical tokens; function-word
//! mode produces stopword counts standardised over the whole fitted corpus.
//! Scaling statistics come from the whole corpus, before any fold split, so
//! held-out documents contribute to them.

use crate::stopwords::StopwordSet;
use crate::tokenizer::tokenize;
use crate::vectorizer::{StandardScaler, TfidfTransformer, Vocabulary};
use attrprobe_core::{Error, Mode, Result};
use ndarray::Array2;
use tracing::debug;

/// Default feature budget
pub const DEFAULT_MAX_FEATURES: usize = 120;

/// Default budget for short-response models in content mode
pub const DEFAULT_REDUCED_MAX_FEATURES: usize = 60;

/// Document x feature matrix with its column names
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Feature values, one row per document
    pub values: Array2<f64>,

    /// Column vocabulary
    pub vocabulary: Vocabulary,
}

impl FeatureMatrix {
    /// Number of documents
    pub fn n_documents(&self) -> usize {
        self.values.nrows()
    }

    /// Number of features (identical for every row)
    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// Feature names in column order
    pub fn feature_names(&self) -> &[String] {
        self.vocabulary.names()
    }
}

/// Encodes texts into a feature matrix for one mode and budget
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder {
    mode: Mode,
    max_features: usize,
}

impl FeatureEncoder {
    /// Create an encoder; the budget must be positive
    pub fn new(mode: Mode, max_features: usize) -> Result<Self> {
        if max_features == 0 {
            return Err(Error::config("feature budget must be positive"));
        }
        Ok(Self { mode, max_features })
    }

    /// Representation mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Configured feature budget
    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// Tokenize, select the vocabulary and weight every document
    pub fn fit_transform<S: AsRef<str>>(
        &self,
        texts: &[S],
        stopwords: &StopwordSet,
    ) -> Result<FeatureMatrix> {
        if texts.is_empty() {
            return Err(Error::data("cannot encode an empty corpus"));
        }

        let docs: Vec<Vec<String>> = texts
            .iter()
            .map(|t| tokenize(t.as_ref(), self.mode, stopwords))
            .collect();

        let vocabulary = Vocabulary::fit(&docs, self.max_features);
        if vocabulary.is_empty() {
            return Err(Error::data(format!(
                "no {} tokens found in {} documents",
                self.mode,
                texts.len()
            )));
        }

        let counts = vocabulary.count_matrix(&docs);
        let values = match self.mode {
            Mode::Content => TfidfTransformer::fit(&counts).transform(&counts),
            Mode::FunctionWords => StandardScaler::fit(&counts).transform(&counts),
        };

        debug!(
            mode = %self.mode,
            documents = values.nrows(),
            features = values.ncols(),
            budget = self.max_features,
            "encoded feature matrix"
        );

        Ok(FeatureMatrix { values, vocabulary })
    }
}

/// Feature budgets for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureBudget {
    /// Budget for the classifiers (and the estimator unless reduced)
    pub max_features: usize,

    /// Estimator budget in content mode for short-response models
    pub reduced_max_features: Option<usize>,
}

impl FeatureBudget {
    /// Budget without a reduced variant
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            reduced_max_features: None,
        }
    }

    /// Budget with a reduced variant for the estimator
    pub fn with_reduced(mut self, reduced: usize) -> Self {
        self.reduced_max_features = Some(reduced);
        self
    }

    /// The reduced budget the estimator must use in `mode`, if any
    pub fn estimator_override(&self, mode: Mode) -> Option<usize> {
        match mode {
            Mode::Content => self
                .reduced_max_features
                .filter(|reduced| *reduced != self.max_features),
            Mode::FunctionWords => None,
        }
    }
}

impl Default for FeatureBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FEATURES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_encoding_excludes_stopwords() {
        let stopwords = StopwordSet::english();
        let texts = ["he left the room quickly", "she returned the book"];
        let encoder = FeatureEncoder::new(Mode::Content, DEFAULT_MAX_FEATURES).unwrap();
        let features = encoder.fit_transform(&texts, &stopwords).unwrap();

        assert_eq!(features.n_documents(), 2);
        assert!(features.n_features() <= DEFAULT_MAX_FEATURES);
        assert!(!features.feature_names().iter().any(|f| f == "the"));
        assert!(features.feature_names().iter().any(|f| f == "book"));
    }

    #[test]
    fn test_width_is_capped_by_budget() {
        let stopwords = StopwordSet::english();
        let texts = ["alpha beta gamma delta", "alpha epsilon zeta", "beta eta theta"];
        let features = FeatureEncoder::new(Mode::Content, 3)
            .unwrap()
            .fit_transform(&texts, &stopwords)
            .unwrap();

        assert_eq!(features.n_features(), 3);
        for row in features.values.rows() {
            assert_eq!(row.len(), 3);
        }
    }

    #[test]
    fn test_function_word_columns_are_standardised() {
        let stopwords = StopwordSet::english();
        let texts = ["the cat and the dog", "a bird", "the end of it"];
        let features = FeatureEncoder::new(Mode::FunctionWords, DEFAULT_MAX_FEATURES)
            .unwrap()
            .fit_transform(&texts, &stopwords)
            .unwrap();

        for col in features.values.columns() {
            let mean: f64 = col.iter().sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_budget_rejected() {
        assert!(matches!(
            FeatureEncoder::new(Mode::Content, 0),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_estimator_override_only_in_content_mode() {
        let budget = FeatureBudget::new(120).with_reduced(60);
        assert_eq!(budget.estimator_override(Mode::Content), Some(60));
        assert_eq!(budget.estimator_override(Mode::FunctionWords), None);
        assert_eq!(FeatureBudget::new(120).estimator_override(Mode::Content), None);
    }
}
