//! Error types for attrprobe

/// Result type alias using attrprobe's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for attrprobe operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid mode, attribute, or settings
    #[error("configuration error: {0}")]
    Config(String),

    /// Observed label set does not equal a known attribute category set
    #[error("label mismatch for {attribute}: unexpected label set {observed:?}")]
    LabelMismatch {
        /// Attribute the labels were checked against (or "any attribute")
        attribute: String,
        /// Sorted distinct labels that were observed
        observed: Vec<String>,
    },

    /// Inferential fit did not converge within its iteration budget
    #[error("estimator did not converge within {iterations} iterations")]
    NonConvergence { iterations: usize },

    /// Classifier training or prediction errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Inferential estimator errors other than non-convergence
    #[error("estimator error: {0}")]
    Estimator(String),

    /// Malformed or degenerate input data
    #[error("data error: {0}")]
    Data(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new estimator error
    pub fn estimator(msg: impl Into<String>) -> Self {
        Self::Estimator(msg.into())
    }

    /// Create a new data error
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a label mismatch error from any iterator of observed labels
    pub fn label_mismatch<I, S>(attribute: impl Into<String>, observed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut observed: Vec<String> = observed.into_iter().map(Into::into).collect();
        observed.sort();
        observed.dedup();
        Self::LabelMismatch {
            attribute: attribute.into(),
            observed,
        }
    }

    /// Whether this error only invalidates the inferential table of a run
    pub fn is_inference_only(&self) -> bool {
        matches!(self, Self::NonConvergence { .. } | Self::Estimator(_))
    }
}
