//! Per-feature coefficient and significance table
//!
//! Fits a [`BaselineLogit`] over the full feature matrix and flattens the
//! non-reference coefficients into [`InferenceRecord`]s labelled with the
//! domain ordinal of their class.

use crate::logit::{add_constant, BaselineLogit, LogitKind};
use attrprobe_core::{Error, LabelEncoder, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// One coefficient of the inferential model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    pub feature: String,

    /// Domain ordinal of the non-reference class, as a string
    pub class: String,

    #[serde(rename = "coef")]
    pub coefficient: f64,

    pub p_value: f64,
}

/// Inferential estimator over an encoded feature matrix
#[derive(Debug, Clone, Copy, Default)]
pub struct InferentialEstimator {
    fitter: BaselineLogit,
}

impl InferentialEstimator {
    /// Estimator with a custom Newton fitter
    pub fn with_fitter(fitter: BaselineLogit) -> Self {
        Self { fitter }
    }

    /// Fit and build the coefficient table, ordered by descending |coef|
    pub fn estimate(
        &self,
        x: &Array2<f64>,
        feature_names: &[String],
        y: &[usize],
        encoder: &LabelEncoder,
    ) -> Result<Vec<InferenceRecord>> {
        if x.ncols() != feature_names.len() {
            return Err(Error::data(format!(
                "{} feature columns but {} feature names",
                x.ncols(),
                feature_names.len()
            )));
        }

        let n_classes = encoder.num_classes();
        let observed: BTreeSet<usize> = y.iter().copied().collect();
        if observed.len() != n_classes || observed.iter().any(|c| *c >= n_classes) {
            return Err(Error::label_mismatch(
                encoder.attribute().as_str(),
                observed
                    .iter()
                    .map(|c| encoder.decode(*c).unwrap_or("<unknown>")),
            ));
        }

        let kind = LogitKind::for_classes(n_classes);
        info!(
            attribute = %encoder.attribute(),
            ?kind,
            documents = x.nrows(),
            features = x.ncols(),
            "fitting inferential model"
        );

        let fit = self.fitter.fit(&add_constant(x), y, n_classes)?;
        let p_values = fit.p_values();

        let mut records = Vec::with_capacity(feature_names.len() * (n_classes - 1));
        for class in 0..n_classes - 1 {
            let ordinal = encoder.domain_ordinal(class).ok_or_else(|| {
                Error::internal(format!("class index {} has no domain ordinal", class))
            })?;

            // row 0 is the intercept
            for (j, feature) in feature_names.iter().enumerate() {
                let coefficient = fit.coefficients[[j + 1, class]];
                let p_value = p_values[[j + 1, class]];
                if !coefficient.is_finite() || !p_value.is_finite() {
                    continue;
                }
                records.push(InferenceRecord {
                    feature: feature.clone(),
                    class: ordinal.to_string(),
                    coefficient,
                    p_value,
                });
            }
        }

        records.sort_by(|a, b| {
            b.coefficient
                .abs()
                .partial_cmp(&a.coefficient.abs())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.feature.cmp(&b.feature))
                .then_with(|| a.class.cmp(&b.class))
        });

        debug!(
            records = records.len(),
            iterations = fit.iterations,
            log_likelihood = fit.log_likelihood,
            "inference table built"
        );
        Ok(records)
    }
}
