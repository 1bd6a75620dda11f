//! attrprobe Probe
//!
//! Measures how much demographic signal a body of generated text carries.
//!
//! For one corpus, attribute and representation mode a run:
//! - encodes the texts into a fixed-width feature matrix
//! - trains logistic, MLP and boosted-tree classifiers under
//!   leave-one-group-out cross-validation and averages their feature weights
//! - fits a baseline-category logit over the full matrix for per-feature
//!   coefficients and p-values against the attribute's reference category

pub mod aggregate;
pub mod config;
pub mod folds;
pub mod probe;
pub mod result;
pub mod trainer;

pub use aggregate::mean_weights;
pub use config::ProbeSettings;
pub use folds::{leave_one_group_out, Fold};
pub use probe::{run_probe, Probe};
pub use result::{ClassifierResult, RunResult, INFERENCE_ERROR_KEY, INFERENCE_KEY};
pub use trainer::{CrossValidator, FoldOutcome};

/// Register descriptions for the probe's metrics
pub fn describe_metrics() {
    metrics::describe_counter!("attrprobe_runs_total", "Probe runs started by mode");
    metrics::describe_counter!(
        "attrprobe_folds_total",
        "Cross-validation folds completed by classifier"
    );
    metrics::describe_histogram!(
        "attrprobe_fit_duration_us",
        metrics::Unit::Microseconds,
        "Classifier fit time per fold in microseconds"
    );
    metrics::describe_counter!(
        "attrprobe_inference_failures_total",
        "Runs whose inferential estimator failed"
    );
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::ProbeSettings;
    pub use crate::probe::{run_probe, Probe};
    pub use crate::result::{ClassifierResult, RunResult};
}
