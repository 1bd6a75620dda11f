//! attrprobe Stats
//!
//! Statistical building blocks for attrprobe:
//! - Cholesky-based solves for Newton iterations
//! - Student-t confidence intervals for mean accuracy
//! - Baseline-category logistic regression with Wald p-values
//! - The per-feature inference table

pub mod inference;
pub mod interval;
pub mod linalg;
pub mod logit;

pub use inference::{InferenceRecord, InferentialEstimator};
pub use interval::{mean_confidence_interval, MeanInterval, DEFAULT_CONFIDENCE};
pub use logit::{add_constant, BaselineLogit, LogitFit, LogitKind};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::inference::{InferenceRecord, InferentialEstimator};
    pub use crate::interval::{mean_confidence_interval, MeanInterval};
    pub use crate::logit::{BaselineLogit, LogitKind};
}
