//! A single probing run over one corpus, attribute and mode

use crate::config::ProbeSettings;
use crate::folds::leave_one_group_out;
use crate::result::RunResult;
use crate::trainer::CrossValidator;
use attrprobe_classifiers::ClassifierRegistry;
use attrprobe_core::{Attribute, Corpus, LabelEncoder, Mode, Result};
use attrprobe_features::{FeatureBudget, FeatureEncoder, FeatureMatrix, StopwordSet};
use attrprobe_stats::InferentialEstimator;
use tracing::{debug, info, warn};

/// Runs the full pipeline for (attribute, mode) pairs of a corpus
#[derive(Debug, Clone)]
pub struct Probe {
    settings: ProbeSettings,
    stopwords: StopwordSet,
    validator: CrossValidator,
    estimator: InferentialEstimator,
}

impl Probe {
    /// Validate settings and load the configured stopwords
    pub fn new(settings: ProbeSettings) -> Result<Self> {
        settings.validate()?;
        let stopwords = settings.stopword_set()?;
        Ok(Self::with_stopwords(settings, stopwords))
    }

    /// Use an already loaded stopword set
    pub fn with_stopwords(settings: ProbeSettings, stopwords: StopwordSet) -> Self {
        let validator =
            CrossValidator::new(ClassifierRegistry::default()).with_confidence(settings.confidence);
        Self {
            settings,
            stopwords,
            validator,
            estimator: InferentialEstimator::default(),
        }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    pub fn stopwords(&self) -> &StopwordSet {
        &self.stopwords
    }

    /// Run with the budget configured for `model_name`
    pub fn run_for_model(
        &self,
        corpus: &Corpus,
        model_name: &str,
        attribute: Attribute,
        mode: Mode,
    ) -> Result<RunResult> {
        self.run(corpus, attribute, mode, self.settings.budget_for(model_name))
    }

    /// Encode, cross-validate every classifier and fit the inferential table
    ///
    /// Label mismatches, empty vocabularies and degenerate folds fail the
    /// run. An estimator failure only empties the inferential table.
    pub fn run(
        &self,
        corpus: &Corpus,
        attribute: Attribute,
        mode: Mode,
        budget: FeatureBudget,
    ) -> Result<RunResult> {
        info!(
            attribute = %attribute,
            mode = %mode,
            documents = corpus.len(),
            max_features = budget.max_features,
            "starting probe run"
        );
        metrics::counter!("attrprobe_runs_total", "mode" => mode.as_str()).increment(1);

        let labels = corpus.labels();
        let encoder = LabelEncoder::fit(attribute, labels.iter().copied())?;
        let y = encoder.transform(labels.iter().copied())?;
        let texts = corpus.texts();

        let features = self.encode(&texts, mode, budget.max_features)?;
        let folds = leave_one_group_out(&corpus.group_ids())?;
        debug!(
            folds = folds.len(),
            features = features.n_features(),
            "features encoded"
        );

        let classifiers = self
            .validator
            .run_all(&features, &y, encoder.num_classes(), &folds)?;

        let reduced = match budget.estimator_override(mode) {
            Some(reduced_budget) => {
                debug!(budget = reduced_budget, "re-encoding for the estimator");
                Some(self.encode(&texts, mode, reduced_budget)?)
            }
            None => None,
        };
        let estimator_features = reduced.as_ref().unwrap_or(&features);

        let (inference, inference_error) = match self.estimator.estimate(
            &estimator_features.values,
            estimator_features.feature_names(),
            &y,
            &encoder,
        ) {
            Ok(records) => (records, None),
            Err(e) if e.is_inference_only() => {
                warn!(
                    attribute = %attribute,
                    mode = %mode,
                    error = %e,
                    "inferential estimator failed; reporting classifiers only"
                );
                metrics::counter!("attrprobe_inference_failures_total").increment(1);
                (Vec::new(), Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

        info!(
            attribute = %attribute,
            mode = %mode,
            inference_rows = inference.len(),
            "probe run finished"
        );

        Ok(RunResult {
            attribute,
            mode,
            classifiers,
            inference,
            inference_error,
        })
    }

    fn encode(&self, texts: &[&str], mode: Mode, max_features: usize) -> Result<FeatureMatrix> {
        FeatureEncoder::new(mode, max_features)?.fit_transform(texts, &self.stopwords)
    }
}

/// One-shot run with default classifiers and an explicit stopword set
pub fn run_probe(
    corpus: &Corpus,
    attribute: Attribute,
    mode: Mode,
    budget: FeatureBudget,
    stopwords: &StopwordSet,
) -> Result<RunResult> {
    Probe::with_stopwords(ProbeSettings::default(), stopwords.clone()).run(
        corpus, attribute, mode, budget,
    )
}
